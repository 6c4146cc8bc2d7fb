//! Session state owned by the workflow controller.

use crate::llm::{ChatSession, Persona};
use crate::mint::{MintReceipt, StoragePointers};
use crate::storage::ImageSource;
use crate::workflow::log::BoundedLog;

/// Which description input is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputTab {
    #[default]
    Url,
    Text,
}

impl InputTab {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Text => "text",
        }
    }
}

impl std::str::FromStr for InputTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "url" => Ok(Self::Url),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown tab '{other}', expected 'url' or 'text'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Avatar {
    /// Display name (file name or URL).
    pub label: String,
    pub source: ImageSource,
}

#[derive(Debug, Default)]
pub struct WorkflowState {
    pub avatar: Option<Avatar>,
    pub tab: InputTab,
    pub url_input: String,
    pub text_input: String,
    pub persona: Option<Persona>,
    pub pointers: Option<StoragePointers>,
    pub last_mint: Option<MintReceipt>,
    pub draft_id: Option<String>,
    pub generating: bool,
    pub minting: bool,
    pub minted: bool,
    pub chat_open: bool,
    pub generated_once: bool,
    pub confirmation_open: bool,
    pub last_error: Option<String>,
    pub chat: ChatSession,
    pub log: BoundedLog,
}

impl WorkflowState {
    /// Text wins over the url field regardless of the active tab.
    pub fn source_text(&self) -> Option<&str> {
        [self.text_input.as_str(), self.url_input.as_str()]
            .into_iter()
            .find(|input| !input.trim().is_empty())
    }

    pub fn chat_loading(&self) -> bool {
        self.chat.is_loading()
    }
}
