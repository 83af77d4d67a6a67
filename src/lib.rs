//! Chat front-end that talks to a hosted LLM persona.
//!
//! The transcript lives in [`conversation::ConversationLog`], owned by a
//! [`session::ChatSession`]; [`llm::CompletionClient`] turns it into one reply
//! per call. Errors stay typed until [`error::display_reply`] flattens them
//! for display.

pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod persona;
pub mod secrets;
pub mod session;
pub mod ui;

pub use config::Config;
pub use conversation::{ConversationLog, Message, Role};
pub use error::{CompletionError, display_reply};
pub use llm::{ChatBackend, CompletionClient};
pub use secrets::ApiKey;
pub use session::{ChatSession, Exchange};
