/// Runtime configuration (`CONFIG` global from config.js) and the build-time generator

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

pub const DEFAULT_SUPABASE_URL: &str = "https://your-project.supabase.co";

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(thread_local_v2, js_name = CONFIG)]
    static GLOBAL_CONFIG: JsValue;
}

/// Problems with the configuration values
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `CONFIG` is absent or not an object with the expected keys.
    Missing(String),
    /// A value is present but unusable.
    Invalid { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(msg) => write!(f, "config.js not loaded: {}", msg),
            ConfigError::Invalid { key, reason } => write!(f, "{} {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Values the extension reads from config.js
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtensionConfig {
    #[serde(rename = "SUPABASE_URL")]
    pub supabase_url: String,
    #[serde(rename = "SUPABASE_ANON_KEY")]
    pub supabase_anon_key: String,
    #[serde(rename = "WEB_APP_URL", default)]
    pub web_app_url: Option<String>,
    #[serde(rename = "USER_ID")]
    pub user_id: String,
}

impl ExtensionConfig {
    /// Read and validate the `CONFIG` global.
    pub fn load() -> Result<ExtensionConfig, ConfigError> {
        let value = GLOBAL_CONFIG.with(JsValue::clone);
        if value.is_null() || value.is_undefined() {
            return Err(ConfigError::Missing("CONFIG is undefined".to_string()));
        }
        let config = Self::from_js(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_js(value: JsValue) -> Result<ExtensionConfig, ConfigError> {
        serde_wasm_bindgen::from_value(value).map_err(|e| ConfigError::Missing(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<ExtensionConfig, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Missing(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_supabase_url(&self.supabase_url)?;

        if self.supabase_anon_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "SUPABASE_ANON_KEY",
                reason: "is empty".to_string(),
            });
        }

        Uuid::parse_str(&self.user_id).map_err(|e| ConfigError::Invalid {
            key: "USER_ID",
            reason: format!("is not a UUID: {}", e),
        })?;

        if let Some(web_app_url) = &self.web_app_url {
            Url::parse(web_app_url).map_err(|e| ConfigError::Invalid {
                key: "WEB_APP_URL",
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }
}

fn validate_supabase_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        key: "SUPABASE_URL",
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid {
            key: "SUPABASE_URL",
            reason: format!("has unsupported scheme {:?}", other),
        }),
    }
}

/// Values baked into the web app's config.js at build time
#[derive(Debug, Clone, PartialEq)]
pub struct WebConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub user_id: String,
}

impl WebConfig {
    /// Collect values through `lookup`, with the placeholder url and empty
    /// strings as defaults.
    pub fn from_lookup<F>(lookup: F) -> WebConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        WebConfig {
            supabase_url: lookup("SUPABASE_URL").unwrap_or_else(|| DEFAULT_SUPABASE_URL.to_string()),
            supabase_anon_key: lookup("SUPABASE_ANON_KEY").unwrap_or_default(),
            user_id: lookup("USER_ID").unwrap_or_default(),
        }
    }

    /// Contents of config.js
    pub fn render(&self) -> String {
        format!(
            "// Stash Web App Configuration (generated at build time)\n\
             const CONFIG = {{\n  \
             SUPABASE_URL: '{}',\n  \
             SUPABASE_ANON_KEY: '{}',\n  \
             USER_ID: '{}',\n\
             }};\n",
            js_string(&self.supabase_url),
            js_string(&self.supabase_anon_key),
            js_string(&self.user_id),
        )
    }
}

/// Escape for a single-quoted JS string literal
fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}
