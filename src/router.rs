//! Message contract between the popup and the background coordinator.
//!
//! Every request is a JSON object tagged by `action`. Each one is handled on
//! its own and always answers its documented shape, including when the
//! backend fails.

use serde::{Deserialize, Serialize};

use crate::browser::Browser;
use crate::error::StashError;
use crate::save_record::{StoredSave, SAVES_TABLE};
use crate::saver::Saver;
use crate::supabase::{Backend, SelectOptions, User};

/// Number of rows the popup lists
pub const RECENT_SAVES_LIMIT: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    SavePage,
    GetUser,
    SignIn {
        #[serde(default)]
        email: String,
        #[serde(default)]
        password: String,
    },
    SignOut,
    GetRecentSaves,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Response {
    /// `{user}`; `null` when signed out
    User { user: Option<User> },
    /// `{success: true, user}`
    SignedIn { success: bool, user: Option<User> },
    /// `{success: true, saves}`
    Saves { success: bool, saves: Vec<StoredSave> },
    /// `{success}` or `{success: false, error}`
    Status {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl Response {
    pub fn ok() -> Response {
        Response::Status {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Response {
        Response::Status {
            success: false,
            error: Some(error.to_string()),
        }
    }

    /// Failure answer shaped for `request`, used when the coordinator itself
    /// could not be set up.
    pub fn failure_for(request: &Request, error: &StashError) -> Response {
        match request {
            Request::GetUser => Response::User { user: None },
            _ => Response::failed(error),
        }
    }
}

/// Any response as seen by the popup
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Reply {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub saves: Option<Vec<StoredSave>>,
}

impl Reply {
    /// `Err` with the reported message when the request failed
    pub fn into_result(self) -> Result<Reply, String> {
        match self.success {
            Some(false) => Err(self
                .error
                .clone()
                .unwrap_or_else(|| "Request failed".to_string())),
            _ => Ok(self),
        }
    }
}

pub async fn handle_request<B: Browser, K: Backend>(
    saver: &Saver<B, K>,
    request: Request,
) -> Response {
    match request {
        Request::SavePage => {
            let tab = match saver.browser().active_tab().await {
                Ok(Some(tab)) => tab,
                Ok(None) => return Response::failed(StashError::NoTab),
                Err(e) => return Response::failed(e),
            };
            match saver.save_page(&tab).await {
                Ok(()) => Response::ok(),
                Err(e) => Response::failed(e),
            }
        }
        Request::GetUser => match saver.backend().get_user().await {
            Ok(user) => Response::User { user },
            Err(e) => {
                log::error!("getUser failed: {}", e);
                Response::User { user: None }
            }
        },
        Request::SignIn { email, password } => {
            if email.trim().is_empty() || password.is_empty() {
                return Response::failed("Email and password are required");
            }
            let signed_in = async {
                saver.backend().sign_in(&email, &password).await?;
                saver.backend().get_user().await
            };
            match signed_in.await {
                Ok(user) => Response::SignedIn {
                    success: true,
                    user,
                },
                Err(e) => Response::failed(e),
            }
        }
        Request::SignOut => match saver.backend().sign_out().await {
            Ok(()) => Response::ok(),
            Err(e) => Response::failed(e),
        },
        Request::GetRecentSaves => {
            let options = SelectOptions::recent(RECENT_SAVES_LIMIT);
            match saver.backend().select(SAVES_TABLE, &options).await {
                Ok(saves) => Response::Saves {
                    success: true,
                    saves,
                },
                Err(e) => Response::failed(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save_record::{Article, Tab};
    use crate::testing::{FakeBackend, FakeBrowser};
    use futures::executor::block_on;
    use serde_json::json;

    const USER: &str = "6f1c2a9e-2d8b-4a43-9a0e-6c1f2b7d9e10";

    fn handle(saver: &Saver<FakeBrowser, FakeBackend>, request: serde_json::Value) -> serde_json::Value {
        let request: Request = serde_json::from_value(request).unwrap();
        serde_json::to_value(block_on(handle_request(saver, request))).unwrap()
    }

    fn saver(browser: FakeBrowser, backend: FakeBackend) -> Saver<FakeBrowser, FakeBackend> {
        Saver::new(browser, backend, USER)
    }

    #[test]
    fn test_request_parsing() {
        let request: Request =
            serde_json::from_value(json!({ "action": "signIn", "email": "a@b.c", "password": "pw" }))
                .unwrap();
        assert_eq!(
            request,
            Request::SignIn {
                email: "a@b.c".to_string(),
                password: "pw".to_string()
            }
        );
        assert!(serde_json::from_value::<Request>(json!({ "action": "showToast" })).is_err());
    }

    #[test]
    fn test_save_page_success() {
        let mut browser = FakeBrowser::with_replies(vec![Ok(Some(Article::default()))]);
        browser.active = Some(Tab::new(3, "https://example.com/a", "A"));
        let s = saver(browser, FakeBackend::default());

        assert_eq!(handle(&s, json!({ "action": "savePage" })), json!({ "success": true }));
        assert_eq!(s.backend().inserted.borrow().len(), 1);
    }

    #[test]
    fn test_save_page_without_active_tab() {
        let s = saver(FakeBrowser::default(), FakeBackend::default());

        assert_eq!(
            handle(&s, json!({ "action": "savePage" })),
            json!({ "success": false, "error": "No tab found" })
        );
    }

    #[test]
    fn test_save_page_backend_failure() {
        let mut browser = FakeBrowser::with_replies(vec![Ok(Some(Article::default()))]);
        browser.active = Some(Tab::new(3, "https://example.com/a", "A"));
        let s = saver(browser, FakeBackend::failing("Failed to fetch"));

        assert_eq!(
            handle(&s, json!({ "action": "savePage" })),
            json!({ "success": false, "error": "Failed to fetch" })
        );
    }

    #[test]
    fn test_get_user_signed_out_and_failing() {
        let s = saver(FakeBrowser::default(), FakeBackend::default());
        assert_eq!(handle(&s, json!({ "action": "getUser" })), json!({ "user": null }));

        let s = saver(FakeBrowser::default(), FakeBackend::failing("offline"));
        assert_eq!(handle(&s, json!({ "action": "getUser" })), json!({ "user": null }));
    }

    #[test]
    fn test_sign_in_then_get_user() {
        let s = saver(FakeBrowser::default(), FakeBackend::default());

        let response = handle(
            &s,
            json!({ "action": "signIn", "email": "reader@example.com", "password": "pw" }),
        );
        assert_eq!(response["success"], true);
        assert_eq!(response["user"]["email"], "reader@example.com");

        let response = handle(&s, json!({ "action": "getUser" }));
        assert_eq!(response["user"]["id"], USER);
    }

    #[test]
    fn test_sign_in_failure() {
        let s = saver(FakeBrowser::default(), FakeBackend::failing("Invalid login credentials"));

        assert_eq!(
            handle(&s, json!({ "action": "signIn", "email": "a@b.c", "password": "x" })),
            json!({ "success": false, "error": "Invalid login credentials" })
        );
    }

    #[test]
    fn test_sign_in_without_credentials_still_answers() {
        let s = saver(FakeBrowser::default(), FakeBackend::default());

        assert_eq!(
            handle(&s, json!({ "action": "signIn" })),
            json!({ "success": false, "error": "Email and password are required" })
        );
        assert_eq!(
            handle(&s, json!({ "action": "signIn", "email": "a@b.c" })),
            json!({ "success": false, "error": "Email and password are required" })
        );
        assert!(s.backend().user.borrow().is_none());
    }

    #[test]
    fn test_sign_out() {
        let s = saver(FakeBrowser::default(), FakeBackend::default());
        assert_eq!(handle(&s, json!({ "action": "signOut" })), json!({ "success": true }));

        let s = saver(FakeBrowser::default(), FakeBackend::failing("offline"));
        assert_eq!(
            handle(&s, json!({ "action": "signOut" })),
            json!({ "success": false, "error": "offline" })
        );
    }

    #[test]
    fn test_recent_saves() {
        let backend = FakeBackend {
            rows: vec![StoredSave {
                url: "https://example.com".to_string(),
                title: Some("Example".to_string()),
                ..StoredSave::default()
            }],
            ..FakeBackend::default()
        };
        let s = saver(FakeBrowser::default(), backend);

        let response = handle(&s, json!({ "action": "getRecentSaves" }));

        assert_eq!(response["success"], true);
        assert_eq!(response["saves"][0]["title"], "Example");
        assert_eq!(
            s.backend().selects.borrow()[0],
            SelectOptions::recent(RECENT_SAVES_LIMIT)
        );
    }

    #[test]
    fn test_recent_saves_failure() {
        let s = saver(FakeBrowser::default(), FakeBackend::failing("permission denied"));

        assert_eq!(
            handle(&s, json!({ "action": "getRecentSaves" })),
            json!({ "success": false, "error": "permission denied" })
        );
    }

    #[test]
    fn test_failure_for_keeps_shape() {
        let err = StashError::Config("SUPABASE_URL missing".to_string());

        let user = serde_json::to_value(Response::failure_for(&Request::GetUser, &err)).unwrap();
        assert_eq!(user, json!({ "user": null }));

        let saves = serde_json::to_value(Response::failure_for(&Request::GetRecentSaves, &err)).unwrap();
        assert_eq!(saves["success"], false);
        assert_eq!(saves["error"], "Configuration error: SUPABASE_URL missing");
    }

    #[test]
    fn test_reply_into_result() {
        let reply: Reply = serde_json::from_value(json!({ "success": false, "error": "nope" })).unwrap();
        assert_eq!(reply.into_result(), Err("nope".to_string()));

        let reply: Reply = serde_json::from_value(json!({ "user": null })).unwrap();
        assert!(reply.into_result().unwrap().user.is_none());
    }
}
