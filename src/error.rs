/// Error types surfaced to the user when a save fails

use std::fmt;

use crate::supabase::BackendError;

/// Everything that can end a save or popup request.
#[derive(Debug, Clone, PartialEq)]
pub enum StashError {
    /// The triggering event carried no usable tab.
    NoTab,
    /// The tab shows a browser-internal page that cannot be scripted.
    RestrictedUrl,
    /// `chrome.scripting` is missing from the runtime.
    ScriptingUnavailable,
    /// The browser refused to inject the extractor into the tab.
    InjectionBlocked,
    /// The extractor ran but produced no article.
    ExtractionFailed,
    /// A record could not be built from the tab data.
    InvalidRecord(String),
    /// The configuration is missing or malformed.
    Config(String),
    /// The Supabase call failed.
    Backend(BackendError),
}

impl fmt::Display for StashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StashError::NoTab => write!(f, "No tab found"),
            StashError::RestrictedUrl => {
                write!(f, "Can't save this page. Open a normal webpage and try again.")
            }
            StashError::ScriptingUnavailable => write!(
                f,
                "Extension scripting not available. Reload the extension and try again."
            ),
            StashError::InjectionBlocked => {
                write!(f, "Can't run on this page. Try a different website.")
            }
            StashError::ExtractionFailed => write!(f, "Failed to extract article content"),
            StashError::InvalidRecord(msg) => write!(f, "Invalid save: {}", msg),
            StashError::Config(msg) => write!(f, "Configuration error: {}", msg),
            StashError::Backend(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for StashError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StashError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackendError> for StashError {
    fn from(err: BackendError) -> Self {
        StashError::Backend(err)
    }
}
