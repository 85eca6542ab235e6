/// Stash - save pages and highlights to Supabase
/// Built with Rust + WASM + Yew

mod background;
mod browser;
mod content;
mod context_menu;
mod error;
mod router;
mod save_record;
mod saver;
mod supabase;
pub mod config;
pub mod ui;

#[cfg(test)]
mod testing;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export the url check for JavaScript access
#[wasm_bindgen]
pub fn is_restricted_url(url: &str) -> bool {
    save_record::is_restricted_url(url)
}

// Register the service worker listeners
#[wasm_bindgen]
pub fn start_background() {
    background::register_listeners();
}

// Register the content script listener
#[wasm_bindgen]
pub fn start_content_script() {
    content::register_listener();
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}
