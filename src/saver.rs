/// Save operations: highlight and full page

use crate::browser::Browser;
use crate::error::StashError;
use crate::save_record::{is_restricted_url, Article, SaveRecord, Tab, SAVES_TABLE};
use crate::supabase::Backend;

/// Delay after injecting the extractor before asking it again
pub const INJECTION_SETTLE_MS: u32 = 150;

/// Background coordinator: one browser, one backend, one configured user
pub struct Saver<B, K> {
    browser: B,
    backend: K,
    user_id: String,
}

impl<B: Browser, K: Backend> Saver<B, K> {
    pub fn new(browser: B, backend: K, user_id: &str) -> Saver<B, K> {
        Saver {
            browser,
            backend,
            user_id: user_id.to_string(),
        }
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn backend(&self) -> &K {
        &self.backend
    }

    /// Save the selected text of a tab.
    pub async fn save_highlight(&self, tab: &Tab, selection: &str) -> Result<(), StashError> {
        let Some(tab_id) = tab.id else {
            log::error!("Save highlight: no tab");
            return Err(StashError::NoTab);
        };

        let result = self.insert_highlight(tab, selection).await;
        match &result {
            Ok(()) => self.browser.show_toast(tab_id, "Highlight saved!", false),
            Err(e) => {
                log::error!("Save highlight failed: {}", e);
                self.browser
                    .show_toast(tab_id, &format!("Failed to save: {}", e), true);
            }
        }
        result
    }

    async fn insert_highlight(&self, tab: &Tab, selection: &str) -> Result<(), StashError> {
        let record = SaveRecord::highlight(
            &self.user_id,
            tab.url.as_deref().unwrap_or_default(),
            tab.title.as_deref().unwrap_or_default(),
            selection,
        )?;
        self.backend.insert(SAVES_TABLE, &record).await?;
        Ok(())
    }

    /// Extract the tab's article and save it.
    pub async fn save_page(&self, tab: &Tab) -> Result<(), StashError> {
        let Some(tab_id) = tab.id else {
            log::error!("Save page: no tab");
            return Err(StashError::NoTab);
        };

        let url = tab.url.as_deref().unwrap_or_default();
        if is_restricted_url(url) {
            log::error!("Save page: cannot save this page (restricted URL)");
            let err = StashError::RestrictedUrl;
            self.browser.show_toast(tab_id, &err.to_string(), true);
            return Err(err);
        }

        log::info!("savePage called for: {}", url);
        let result = self.insert_article(tab_id, url, tab).await;
        match &result {
            Ok(()) => self.browser.show_toast(tab_id, "Page saved!", false),
            Err(e) => {
                log::error!("Save page failed: {}", e);
                self.browser.show_toast(tab_id, &e.to_string(), true);
            }
        }
        result
    }

    async fn insert_article(&self, tab_id: i32, url: &str, tab: &Tab) -> Result<(), StashError> {
        let article = self.extract_article(tab_id).await?;
        let record = SaveRecord::article(
            &self.user_id,
            url,
            tab.title.as_deref().unwrap_or_default(),
            article,
        )?;
        self.backend.insert(SAVES_TABLE, &record).await?;
        Ok(())
    }

    /// Ask the content script for the article, injecting it once if it is
    /// not loaded yet.
    async fn extract_article(&self, tab_id: i32) -> Result<Article, StashError> {
        let reply = match self.browser.request_article(tab_id).await {
            Ok(reply) => reply,
            Err(first) => {
                if !self.browser.scripting_available() {
                    return Err(StashError::ScriptingUnavailable);
                }

                log::info!("Content script not loaded ({}), injecting...", first);
                self.browser.inject_extractor(tab_id).await.map_err(|e| {
                    log::warn!("Injection failed: {}", e);
                    StashError::InjectionBlocked
                })?;

                self.browser.sleep(INJECTION_SETTLE_MS).await;
                self.browser.request_article(tab_id).await.map_err(|e| {
                    log::warn!("Extraction after injection failed: {}", e);
                    StashError::ExtractionFailed
                })?
            }
        };

        reply.ok_or(StashError::ExtractionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save_record::SaveBody;
    use crate::testing::{FakeBackend, FakeBrowser};
    use futures::executor::block_on;

    const USER: &str = "6f1c2a9e-2d8b-4a43-9a0e-6c1f2b7d9e10";

    fn article() -> Article {
        Article {
            title: Some("A Long Read".to_string()),
            content: Some("<p>body</p>".to_string()),
            excerpt: Some("body".to_string()),
            ..Article::default()
        }
    }

    fn saver(browser: FakeBrowser, backend: FakeBackend) -> Saver<FakeBrowser, FakeBackend> {
        Saver::new(browser, backend, USER)
    }

    fn tab() -> Tab {
        Tab::new(42, "https://www.example.com/story", "Example Story")
    }

    #[test]
    fn test_save_highlight_inserts_highlight_record() {
        let s = saver(FakeBrowser::default(), FakeBackend::default());

        block_on(s.save_highlight(&tab(), "selected words")).unwrap();

        let inserted = s.backend().inserted.borrow();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].0, "saves");
        assert_eq!(
            inserted[0].1.body,
            SaveBody::Highlight {
                highlight: "selected words".to_string()
            }
        );
        assert_eq!(inserted[0].1.title, "Example Story");
        assert_eq!(
            s.browser().last_toast(),
            Some(("Highlight saved!".to_string(), false))
        );
    }

    #[test]
    fn test_save_highlight_backend_failure_toasts_message() {
        let s = saver(FakeBrowser::default(), FakeBackend::failing("Failed to fetch"));

        let result = block_on(s.save_highlight(&tab(), "words"));

        assert!(result.is_err());
        assert_eq!(
            s.browser().last_toast(),
            Some(("Failed to save: Failed to fetch".to_string(), true))
        );
    }

    #[test]
    fn test_save_highlight_without_tab_does_nothing() {
        let s = saver(FakeBrowser::default(), FakeBackend::default());

        let result = block_on(s.save_highlight(&Tab::default(), "words"));

        assert_eq!(result, Err(StashError::NoTab));
        assert!(s.backend().inserted.borrow().is_empty());
        assert!(s.browser().toasts.borrow().is_empty());
    }

    #[test]
    fn test_restricted_url_short_circuits() {
        let browser = FakeBrowser::with_replies(vec![Ok(Some(article()))]);
        let s = saver(browser, FakeBackend::default());
        let tab = Tab::new(7, "chrome://settings", "Settings");

        let result = block_on(s.save_page(&tab));

        assert_eq!(result, Err(StashError::RestrictedUrl));
        assert!(s.backend().inserted.borrow().is_empty());
        assert_eq!(s.browser().article_replies.borrow().len(), 1);
        let (message, is_error) = s.browser().last_toast().unwrap();
        assert!(message.starts_with("Can't save this page"));
        assert!(is_error);
    }

    #[test]
    fn test_save_page_inserts_article_record() {
        let browser = FakeBrowser::with_replies(vec![Ok(Some(article()))]);
        let s = saver(browser, FakeBackend::default());

        block_on(s.save_page(&tab())).unwrap();

        let inserted = s.backend().inserted.borrow();
        assert_eq!(inserted.len(), 1);
        assert!(matches!(inserted[0].1.body, SaveBody::Article { .. }));
        assert_eq!(inserted[0].1.title, "A Long Read");
        assert!(s.browser().injected.borrow().is_empty());
        assert_eq!(s.browser().last_toast(), Some(("Page saved!".to_string(), false)));
    }

    #[test]
    fn test_save_page_injects_when_content_script_missing() {
        let browser = FakeBrowser::with_replies(vec![
            Err("Receiving end does not exist".to_string()),
            Ok(Some(article())),
        ]);
        let s = saver(browser, FakeBackend::default());

        block_on(s.save_page(&tab())).unwrap();

        assert_eq!(*s.browser().injected.borrow(), vec![42]);
        assert_eq!(*s.browser().slept.borrow(), vec![INJECTION_SETTLE_MS]);
        assert_eq!(s.backend().inserted.borrow().len(), 1);
    }

    #[test]
    fn test_null_article_fails_without_insert() {
        let browser = FakeBrowser::with_replies(vec![Ok(None)]);
        let s = saver(browser, FakeBackend::default());

        let result = block_on(s.save_page(&tab()));

        assert_eq!(result, Err(StashError::ExtractionFailed));
        assert!(s.backend().inserted.borrow().is_empty());
        assert_eq!(
            s.browser().last_toast(),
            Some(("Failed to extract article content".to_string(), true))
        );
    }

    #[test]
    fn test_scripting_unavailable() {
        let mut browser = FakeBrowser::with_replies(vec![Err("no receiver".to_string())]);
        browser.scripting = false;
        let s = saver(browser, FakeBackend::default());

        let result = block_on(s.save_page(&tab()));

        assert_eq!(result, Err(StashError::ScriptingUnavailable));
        assert!(s.browser().injected.borrow().is_empty());
    }

    #[test]
    fn test_injection_blocked() {
        let mut browser = FakeBrowser::with_replies(vec![Err("no receiver".to_string())]);
        browser.injection_error = Some("Cannot access contents of the page".to_string());
        let s = saver(browser, FakeBackend::default());

        let result = block_on(s.save_page(&tab()));

        assert_eq!(result, Err(StashError::InjectionBlocked));
        assert!(s.backend().inserted.borrow().is_empty());
        assert_eq!(
            s.browser().last_toast(),
            Some(("Can't run on this page. Try a different website.".to_string(), true))
        );
    }

    #[test]
    fn test_extraction_still_failing_after_injection() {
        let browser = FakeBrowser::with_replies(vec![
            Err("Receiving end does not exist".to_string()),
            Err("Receiving end does not exist".to_string()),
        ]);
        let s = saver(browser, FakeBackend::default());

        let result = block_on(s.save_page(&tab()));

        assert_eq!(result, Err(StashError::ExtractionFailed));
        assert_eq!(*s.browser().injected.borrow(), vec![42]);
        assert!(s.backend().inserted.borrow().is_empty());
        assert_eq!(
            s.browser().last_toast(),
            Some(("Failed to extract article content".to_string(), true))
        );
    }

    #[test]
    fn test_save_page_backend_error_is_verbatim() {
        let browser = FakeBrowser::with_replies(vec![Ok(Some(article()))]);
        let s = saver(browser, FakeBackend::failing("JWT expired"));

        let result = block_on(s.save_page(&tab()));

        assert!(result.is_err());
        assert_eq!(s.browser().last_toast(), Some(("JWT expired".to_string(), true)));
    }
}
