/// Service worker entry: lazy coordinator, context menus and message listener

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::browser::{
    create_menu, on_installed, on_menu_clicked, on_message, on_startup, remove_all_menus, to_js,
    ChromeBrowser, ChromeSessionStore,
};
use crate::config::ExtensionConfig;
use crate::context_menu::{handle_click, ClickInfo, MENU_ENTRIES};
use crate::error::StashError;
use crate::router::{handle_request, Request, Response};
use crate::save_record::Tab;
use crate::saver::Saver;
use crate::supabase::SupabaseClient;

type ChromeSaver = Saver<ChromeBrowser, SupabaseClient<ChromeSessionStore>>;

thread_local! {
    static SAVER: RefCell<Option<Rc<ChromeSaver>>> = const { RefCell::new(None) };
}

/// The coordinator, built on first use. Two callers racing here may both
/// build one; the last stored wins.
async fn ensure_saver() -> Result<Rc<ChromeSaver>, StashError> {
    if let Some(saver) = SAVER.with(|s| s.borrow().clone()) {
        return Ok(saver);
    }

    let config = ExtensionConfig::load().map_err(|e| StashError::Config(e.to_string()))?;
    let client = SupabaseClient::new(
        &config.supabase_url,
        &config.supabase_anon_key,
        ChromeSessionStore,
    );
    client.init().await;

    let saver = Rc::new(Saver::new(ChromeBrowser, client, &config.user_id));
    SAVER.with(|s| *s.borrow_mut() = Some(saver.clone()));
    log::info!("Stash client initialized");
    Ok(saver)
}

async fn init_logged() {
    if let Err(e) = ensure_saver().await {
        log::error!("Init failed: {}", e);
    }
}

fn setup_context_menu() {
    let create_entries = Closure::once(move || {
        for entry in &MENU_ENTRIES {
            match to_js(entry) {
                Ok(properties) => create_menu(properties),
                Err(e) => log::error!("Menu {}: {}", entry.id, e),
            }
        }
    });
    remove_all_menus(&create_entries);
    create_entries.forget();
}

/// Register every background listener. Must run synchronously when the
/// service worker starts.
pub fn register_listeners() {
    let installed = Closure::<dyn FnMut(JsValue)>::new(|_details: JsValue| {
        spawn_local(init_logged());
        setup_context_menu();
    });
    on_installed(&installed);
    installed.forget();

    let startup = Closure::<dyn FnMut()>::new(|| spawn_local(init_logged()));
    on_startup(&startup);
    startup.forget();

    let clicked = Closure::<dyn FnMut(JsValue, JsValue)>::new(|info: JsValue, tab: JsValue| {
        let info: ClickInfo = match serde_wasm_bindgen::from_value(info) {
            Ok(info) => info,
            Err(e) => {
                log::error!("Unreadable menu click: {:?}", e);
                return;
            }
        };
        let tab: Tab = serde_wasm_bindgen::from_value(tab).unwrap_or_default();

        spawn_local(async move {
            match ensure_saver().await {
                Ok(saver) => {
                    // Failures are already toasted to the tab.
                    let _ = handle_click(&saver, &info, &tab).await;
                }
                Err(e) => log::error!("Menu click ignored: {}", e),
            }
        });
    });
    on_menu_clicked(&clicked);
    clicked.forget();

    let message = Closure::<dyn FnMut(JsValue, JsValue, js_sys::Function) -> bool>::new(
        |request: JsValue, _sender: JsValue, send_response: js_sys::Function| {
            let Ok(request) = serde_wasm_bindgen::from_value::<Request>(request) else {
                return false;
            };

            spawn_local(async move {
                let response = match ensure_saver().await {
                    Ok(saver) => handle_request(&saver, request).await,
                    Err(e) => {
                        log::error!("Request failed before dispatch: {}", e);
                        Response::failure_for(&request, &e)
                    }
                };
                reply(&send_response, &response);
            });

            // Keep the channel open for the async reply.
            true
        },
    );
    on_message(&message);
    message.forget();
}

fn reply(send_response: &js_sys::Function, response: &Response) {
    match to_js(response) {
        Ok(value) => {
            if let Err(e) = send_response.call1(&JsValue::NULL, &value) {
                log::warn!("sendResponse failed: {:?}", e);
            }
        }
        Err(e) => log::error!("{}", e),
    }
}
