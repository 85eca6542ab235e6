/// Save records and extracted article data for Stash
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::StashError;

/// Remote table every save lands in
pub const SAVES_TABLE: &str = "saves";

/// Constant `source` tag on records written by the extension
pub const SAVE_SOURCE: &str = "extension";

/// Schemes the browser never lets extensions script
const RESTRICTED_SCHEMES: [&str; 4] = ["chrome", "edge", "about", "chrome-extension"];

/// Browser tab as reported by `chrome.tabs`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Tab {
    #[serde(default)]
    pub id: Option<i32>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Tab {
    pub fn new(id: i32, url: &str, title: &str) -> Tab {
        Tab {
            id: Some(id),
            url: Some(url.to_string()),
            title: Some(title.to_string()),
        }
    }
}

/// Article fields answered by the content script
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
    pub author: Option<String>,
    pub published_time: Option<String>,
    pub image_url: Option<String>,
}

/// Raw result of `Readability.parse()`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadabilityResult {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub byline: Option<String>,
    pub site_name: Option<String>,
    pub published_time: Option<String>,
}

impl Article {
    /// Build the wire article from Readability output and the page's lead image.
    pub fn from_readability(parsed: ReadabilityResult, image_url: Option<String>) -> Article {
        Article {
            title: non_blank(parsed.title),
            content: non_blank(parsed.content),
            excerpt: non_blank(parsed.excerpt),
            site_name: non_blank(parsed.site_name),
            author: non_blank(parsed.byline),
            published_time: non_blank(parsed.published_time),
            image_url: non_blank(image_url),
        }
    }
}

/// Record body; exactly one shape is ever written
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SaveBody {
    Highlight {
        highlight: String,
    },
    Article {
        content: Option<String>,
        excerpt: Option<String>,
        site_name: Option<String>,
        author: Option<String>,
        published_at: Option<String>,
        image_url: Option<String>,
    },
}

/// One row inserted into the `saves` table
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SaveRecord {
    pub user_id: String,
    pub url: String,
    pub title: String,
    #[serde(flatten)]
    pub body: SaveBody,
    pub source: &'static str,
}

impl SaveRecord {
    /// Record for a captured text selection
    pub fn highlight(
        user_id: &str,
        url: &str,
        title: &str,
        selection: &str,
    ) -> Result<SaveRecord, StashError> {
        let url = absolute_url(url)?;
        if selection.trim().is_empty() {
            return Err(StashError::InvalidRecord("empty selection".to_string()));
        }

        Ok(SaveRecord {
            user_id: required("user_id", user_id)?,
            url,
            title: title.to_string(),
            body: SaveBody::Highlight {
                highlight: selection.to_string(),
            },
            source: SAVE_SOURCE,
        })
    }

    /// Record for an extracted article. Falls back to the tab title when
    /// Readability found none.
    pub fn article(
        user_id: &str,
        url: &str,
        tab_title: &str,
        article: Article,
    ) -> Result<SaveRecord, StashError> {
        let url = absolute_url(url)?;
        let title = article
            .title
            .clone()
            .unwrap_or_else(|| tab_title.to_string());

        Ok(SaveRecord {
            user_id: required("user_id", user_id)?,
            url,
            title,
            body: SaveBody::Article {
                content: article.content,
                excerpt: article.excerpt,
                site_name: article.site_name,
                author: article.author,
                published_at: article.published_time,
                image_url: article.image_url,
            },
            source: SAVE_SOURCE,
        })
    }
}

/// A row read back from the `saves` table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoredSave {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub highlight: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
}

impl StoredSave {
    pub fn is_highlight(&self) -> bool {
        self.highlight.is_some()
    }

    /// Label shown in lists: title, else the url's host, else the raw url
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| site_name(&self.url))
            .unwrap_or_else(|| self.url.clone())
    }
}

/// True for urls the extension cannot script: missing, unparsable, or
/// browser-internal schemes.
pub fn is_restricted_url(url: &str) -> bool {
    if url.is_empty() {
        return true;
    }

    match Url::parse(url) {
        Ok(parsed) => RESTRICTED_SCHEMES.contains(&parsed.scheme()),
        Err(_) => true,
    }
}

/// Hostname without a leading `www.`
pub fn site_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

fn absolute_url(url: &str) -> Result<String, StashError> {
    Url::parse(url)
        .map(|_| url.to_string())
        .map_err(|e| StashError::InvalidRecord(format!("bad url {:?}: {}", url, e)))
}

fn required(field: &str, value: &str) -> Result<String, StashError> {
    if value.trim().is_empty() {
        Err(StashError::InvalidRecord(format!("missing {}", field)))
    } else {
        Ok(value.to_string())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
