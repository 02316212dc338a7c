//! UI-agnostic conversation types
//!
//! Shared by the TUI and the headless CLI, and persisted inside history entries.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;

/// A chat message in the ingredient conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, image: Option<PathBuf>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            image,
            analysis: None,
        }
    }

    pub fn assistant(content: impl Into<String>, analysis: Option<AnalysisResult>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            image: None,
            analysis,
        }
    }
}
