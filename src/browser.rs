/// Bindings to the `chrome.*` extension APIs and the browser seam used by the saver

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::save_record::{Article, Tab};
use crate::supabase::{Session, SessionStore};

/// Files injected when the content script is not yet in the page
pub const EXTRACTOR_FILES: [&str; 2] = ["Readability.js", "content.js"];

/// chrome.storage.local key holding the auth session
pub const SESSION_KEY: &str = "stash_session";

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = query)]
    async fn tabs_query(query: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = sendMessage)]
    async fn tabs_send_message(tab_id: i32, message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "scripting"], js_name = executeScript)]
    async fn execute_script(injection: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    async fn storage_get(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    async fn storage_set(items: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = remove)]
    async fn storage_remove(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime"], js_name = sendMessage)]
    pub async fn runtime_send_message(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onInstalled"], js_name = addListener)]
    pub fn on_installed(callback: &Closure<dyn FnMut(JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onStartup"], js_name = addListener)]
    pub fn on_startup(callback: &Closure<dyn FnMut()>);

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onMessage"], js_name = addListener)]
    pub fn on_message(callback: &Closure<dyn FnMut(JsValue, JsValue, js_sys::Function) -> bool>);

    #[wasm_bindgen(js_namespace = ["chrome", "contextMenus"], js_name = removeAll)]
    pub fn remove_all_menus(callback: &Closure<dyn FnMut()>);

    #[wasm_bindgen(js_namespace = ["chrome", "contextMenus"], js_name = create)]
    pub fn create_menu(properties: JsValue);

    #[wasm_bindgen(js_namespace = ["chrome", "contextMenus", "onClicked"], js_name = addListener)]
    pub fn on_menu_clicked(callback: &Closure<dyn FnMut(JsValue, JsValue)>);
}

/// Message sent to the content script of a tab
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum TabMessage<'a> {
    ExtractArticle,
    #[serde(rename_all = "camelCase")]
    ShowToast { message: &'a str, is_error: bool },
}

/// Platform calls the save operations depend on.
#[allow(async_fn_in_trait)]
pub trait Browser {
    /// Active tab of the current window
    async fn active_tab(&self) -> Result<Option<Tab>, String>;

    /// Ask the tab's content script for the article. Fails when no content
    /// script is listening.
    async fn request_article(&self, tab_id: i32) -> Result<Option<Article>, String>;

    fn scripting_available(&self) -> bool;

    async fn inject_extractor(&self, tab_id: i32) -> Result<(), String>;

    async fn sleep(&self, millis: u32);

    /// Fire-and-forget toast in the tab; delivery failures are dropped.
    fn show_toast(&self, tab_id: i32, message: &str, is_error: bool);
}

/// [`Browser`] backed by the real `chrome.*` APIs
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeBrowser;

impl Browser for ChromeBrowser {
    async fn active_tab(&self) -> Result<Option<Tab>, String> {
        let query = serde_wasm_bindgen::to_value(&serde_json::json!({
            "active": true,
            "currentWindow": true,
        }))
        .map_err(|e| format!("Failed to serialize query: {:?}", e))?;

        let tabs_js = tabs_query(query)
            .await
            .map_err(|e| format!("Failed to query tabs: {:?}", e))?;
        let tabs: Vec<Tab> = serde_wasm_bindgen::from_value(tabs_js)
            .map_err(|e| format!("Failed to parse tabs: {:?}", e))?;

        Ok(tabs.into_iter().next())
    }

    async fn request_article(&self, tab_id: i32) -> Result<Option<Article>, String> {
        let response = tabs_send_message(tab_id, to_js(&TabMessage::ExtractArticle)?)
            .await
            .map_err(|e| format!("{:?}", e))?;

        if response.is_null() || response.is_undefined() {
            return Ok(None);
        }

        serde_wasm_bindgen::from_value(response)
            .map(Some)
            .map_err(|e| format!("Failed to parse article: {:?}", e))
    }

    fn scripting_available(&self) -> bool {
        chrome_member(&["scripting", "executeScript"]).is_some_and(|f| f.is_function())
    }

    async fn inject_extractor(&self, tab_id: i32) -> Result<(), String> {
        let injection = to_js(&serde_json::json!({
            "target": { "tabId": tab_id },
            "files": EXTRACTOR_FILES,
        }))?;

        execute_script(injection)
            .await
            .map(|_| ())
            .map_err(|e| format!("{:?}", e))
    }

    async fn sleep(&self, millis: u32) {
        gloo_timers::future::TimeoutFuture::new(millis).await;
    }

    fn show_toast(&self, tab_id: i32, message: &str, is_error: bool) {
        let message = match to_js(&TabMessage::ShowToast { message, is_error }) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("{}", e);
                return;
            }
        };

        spawn_local(async move {
            let _ = tabs_send_message(tab_id, message).await;
        });
    }
}

/// [`SessionStore`] in `chrome.storage.local`
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeSessionStore;

impl SessionStore for ChromeSessionStore {
    async fn load(&self) -> Result<Option<Session>, String> {
        let items = storage_get(SESSION_KEY)
            .await
            .map_err(|e| format!("Failed to get storage: {:?}", e))?;
        let value = js_sys::Reflect::get(&items, &JsValue::from_str(SESSION_KEY))
            .map_err(|e| format!("Failed to read storage: {:?}", e))?;

        if value.is_null() || value.is_undefined() {
            return Ok(None);
        }

        serde_wasm_bindgen::from_value(value)
            .map(Some)
            .map_err(|e| format!("Failed to parse session: {:?}", e))
    }

    async fn save(&self, session: Option<&Session>) -> Result<(), String> {
        match session {
            Some(session) => {
                let mut items = serde_json::Map::new();
                items.insert(
                    SESSION_KEY.to_string(),
                    serde_json::to_value(session)
                        .map_err(|e| format!("Failed to serialize session: {}", e))?,
                );
                let items = to_js(&items)?;
                storage_set(items)
                    .await
                    .map_err(|e| format!("Failed to save storage: {:?}", e))?;
            }
            None => {
                storage_remove(SESSION_KEY)
                    .await
                    .map_err(|e| format!("Failed to clear storage: {:?}", e))?;
            }
        }
        Ok(())
    }
}

/// Serialize to a plain JS object (`None` becomes `null`, maps become objects).
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, String> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| format!("Failed to serialize: {:?}", e))
}

/// Look up `chrome.<path>`, returning `None` when any segment is missing.
fn chrome_member(path: &[&str]) -> Option<JsValue> {
    let mut current = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("chrome")).ok()?;
    for key in path {
        if current.is_null() || current.is_undefined() {
            return None;
        }
        current = js_sys::Reflect::get(&current, &JsValue::from_str(key)).ok()?;
    }
    (!current.is_undefined()).then_some(current)
}
