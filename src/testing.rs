/// In-memory stand-ins for the browser and backend seams

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::browser::Browser;
use crate::save_record::{Article, SaveRecord, StoredSave, Tab};
use crate::supabase::{Backend, BackendError, SelectOptions, User};

#[derive(Default)]
pub struct FakeBrowser {
    pub active: Option<Tab>,
    /// Answers to successive `extractArticle` requests
    pub article_replies: RefCell<VecDeque<Result<Option<Article>, String>>>,
    pub scripting: bool,
    pub injection_error: Option<String>,
    pub injected: RefCell<Vec<i32>>,
    pub slept: RefCell<Vec<u32>>,
    pub toasts: RefCell<Vec<(i32, String, bool)>>,
}

impl FakeBrowser {
    pub fn with_replies(replies: Vec<Result<Option<Article>, String>>) -> FakeBrowser {
        FakeBrowser {
            article_replies: RefCell::new(replies.into()),
            scripting: true,
            ..FakeBrowser::default()
        }
    }

    pub fn last_toast(&self) -> Option<(String, bool)> {
        self.toasts
            .borrow()
            .last()
            .map(|(_, message, is_error)| (message.clone(), *is_error))
    }
}

impl Browser for FakeBrowser {
    async fn active_tab(&self) -> Result<Option<Tab>, String> {
        Ok(self.active.clone())
    }

    async fn request_article(&self, _tab_id: i32) -> Result<Option<Article>, String> {
        self.article_replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err("Could not establish connection".to_string()))
    }

    fn scripting_available(&self) -> bool {
        self.scripting
    }

    async fn inject_extractor(&self, tab_id: i32) -> Result<(), String> {
        self.injected.borrow_mut().push(tab_id);
        match &self.injection_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn sleep(&self, millis: u32) {
        self.slept.borrow_mut().push(millis);
    }

    fn show_toast(&self, tab_id: i32, message: &str, is_error: bool) {
        self.toasts
            .borrow_mut()
            .push((tab_id, message.to_string(), is_error));
    }
}

#[derive(Default)]
pub struct FakeBackend {
    /// When set, every call fails with this error
    pub failure: Option<BackendError>,
    pub inserted: RefCell<Vec<(String, SaveRecord)>>,
    pub rows: Vec<StoredSave>,
    pub selects: RefCell<Vec<SelectOptions>>,
    pub user: RefCell<Option<User>>,
}

impl FakeBackend {
    pub fn failing(message: &str) -> FakeBackend {
        FakeBackend {
            failure: Some(BackendError::Network(message.to_string())),
            ..FakeBackend::default()
        }
    }

    fn check(&self) -> Result<(), BackendError> {
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl Backend for FakeBackend {
    async fn insert(&self, table: &str, record: &SaveRecord) -> Result<(), BackendError> {
        self.check()?;
        self.inserted
            .borrow_mut()
            .push((table.to_string(), record.clone()));
        Ok(())
    }

    async fn select(
        &self,
        _table: &str,
        options: &SelectOptions,
    ) -> Result<Vec<StoredSave>, BackendError> {
        self.check()?;
        self.selects.borrow_mut().push(options.clone());
        Ok(self.rows.clone())
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<(), BackendError> {
        self.check()?;
        *self.user.borrow_mut() = Some(User {
            id: "6f1c2a9e-2d8b-4a43-9a0e-6c1f2b7d9e10".to_string(),
            email: Some(email.to_string()),
        });
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.check()?;
        *self.user.borrow_mut() = None;
        Ok(())
    }

    async fn get_user(&self) -> Result<Option<User>, BackendError> {
        self.check()?;
        Ok(self.user.borrow().clone())
    }
}
