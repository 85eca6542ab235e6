/// Content script: Readability extraction and in-page toasts

use gloo_timers::callback::Timeout;
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element};

use crate::browser::{on_message, to_js};
use crate::save_record::{Article, ReadabilityResult};

/// How long a toast stays on the page
pub const TOAST_MILLIS: u32 = 3_000;

/// Meta tags checked, in order, for the lead image
const IMAGE_META_SELECTORS: [&str; 3] = [
    "meta[property='og:image']",
    "meta[name='twitter:image']",
    "meta[property='twitter:image']",
];

const TOAST_STYLE: &str = "position: fixed; bottom: 24px; right: 24px; z-index: 2147483647; \
    padding: 12px 18px; border-radius: 6px; font: 14px/1.4 system-ui, sans-serif; \
    color: white; box-shadow: 0 4px 12px rgba(0, 0, 0, 0.25);";

#[wasm_bindgen]
extern "C" {
    type Readability;

    #[wasm_bindgen(constructor, catch)]
    fn new(document: &JsValue) -> Result<Readability, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn parse(this: &Readability) -> Result<JsValue, JsValue>;
}

/// Messages the background sends to a tab
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ContentRequest {
    ExtractArticle,
    #[serde(rename_all = "camelCase")]
    ShowToast {
        message: String,
        #[serde(default)]
        is_error: bool,
    },
}

pub fn register_listener() {
    let listener = Closure::<dyn FnMut(JsValue, JsValue, js_sys::Function) -> bool>::new(
        |request: JsValue, _sender: JsValue, send_response: js_sys::Function| {
            let Ok(request) = serde_wasm_bindgen::from_value::<ContentRequest>(request) else {
                return false;
            };

            match request {
                ContentRequest::ExtractArticle => {
                    let article = extract_article();
                    let value = match &article {
                        Some(article) => to_js(article).unwrap_or(JsValue::NULL),
                        None => JsValue::NULL,
                    };
                    let _ = send_response.call1(&JsValue::NULL, &value);
                }
                ContentRequest::ShowToast { message, is_error } => {
                    if let Err(e) = show_toast(&message, is_error) {
                        log::warn!("Toast failed: {:?}", e);
                    }
                }
            }
            false
        },
    );
    on_message(&listener);
    listener.forget();
}

fn document() -> Option<Document> {
    web_sys::window()?.document()
}

/// Run Readability on a clone of the document.
pub fn extract_article() -> Option<Article> {
    let document = document()?;
    let clone = document.clone_node_with_deep(true).ok()?;

    let parsed = match Readability::new(&clone).and_then(|readability| readability.parse()) {
        Ok(parsed) if !parsed.is_null() && !parsed.is_undefined() => parsed,
        Ok(_) => {
            log::warn!("Readability found no article");
            return None;
        }
        Err(e) => {
            log::error!("Readability failed: {:?}", e);
            return None;
        }
    };

    let parsed: ReadabilityResult = match serde_wasm_bindgen::from_value(parsed) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::error!("Unexpected Readability result: {:?}", e);
            return None;
        }
    };

    Some(Article::from_readability(parsed, lead_image(&document)))
}

fn lead_image(document: &Document) -> Option<String> {
    IMAGE_META_SELECTORS.iter().find_map(|selector| {
        document
            .query_selector(selector)
            .ok()
            .flatten()
            .and_then(|meta| meta.get_attribute("content"))
            .filter(|content| !content.trim().is_empty())
    })
}

fn show_toast(message: &str, is_error: bool) -> Result<(), JsValue> {
    let document = document().ok_or_else(|| JsValue::from_str("no document"))?;
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("no body"))?;

    let toast: Element = document.create_element("div")?;
    toast.set_text_content(Some(message));
    toast.set_attribute("role", "status")?;
    toast.set_attribute("style", &toast_style(is_error))?;
    body.append_child(&toast)?;

    Timeout::new(TOAST_MILLIS, move || toast.remove()).forget();
    Ok(())
}

fn toast_style(is_error: bool) -> String {
    let background = if is_error { "#c62828" } else { "#2e7d32" };
    format!("{} background-color: {};", TOAST_STYLE, background)
}
