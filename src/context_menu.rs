/// Context menu entries and click dispatch

use serde::{Deserialize, Serialize};

use crate::browser::Browser;
use crate::error::StashError;
use crate::save_record::Tab;
use crate::saver::Saver;
use crate::supabase::Backend;

/// Properties passed to `chrome.contextMenus.create`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MenuEntry {
    pub id: &'static str,
    pub title: &'static str,
    pub contexts: &'static [&'static str],
}

pub const SAVE_HIGHLIGHT_ID: &str = "save-highlight";
pub const SAVE_PAGE_ID: &str = "save-page";

pub const MENU_ENTRIES: [MenuEntry; 2] = [
    MenuEntry {
        id: SAVE_HIGHLIGHT_ID,
        title: "Save highlight to Stash",
        contexts: &["selection"],
    },
    MenuEntry {
        id: SAVE_PAGE_ID,
        title: "Save page to Stash",
        contexts: &["page"],
    },
];

/// The `info` argument of `contextMenus.onClicked`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClickInfo {
    pub menu_item_id: serde_json::Value,
    #[serde(default)]
    pub selection_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    SaveHighlight(String),
    SavePage,
}

impl MenuAction {
    /// Map a click to an action; unknown ids are ignored.
    pub fn from_click(info: &ClickInfo) -> Option<MenuAction> {
        match info.menu_item_id.as_str()? {
            SAVE_HIGHLIGHT_ID => Some(MenuAction::SaveHighlight(
                info.selection_text.clone().unwrap_or_default(),
            )),
            SAVE_PAGE_ID => Some(MenuAction::SavePage),
            _ => None,
        }
    }
}

pub async fn handle_click<B: Browser, K: Backend>(
    saver: &Saver<B, K>,
    info: &ClickInfo,
    tab: &Tab,
) -> Result<(), StashError> {
    match MenuAction::from_click(info) {
        Some(MenuAction::SaveHighlight(selection)) => saver.save_highlight(tab, &selection).await,
        Some(MenuAction::SavePage) => saver.save_page(tab).await,
        None => {
            log::debug!("Ignoring menu item {}", info.menu_item_id);
            Ok(())
        }
    }
}
