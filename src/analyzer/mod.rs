//! LLM analysis of file contents and project structures.
//!
//! This module provides the chat client seam and the analyzer built on it.

pub mod client;
pub mod code_analyzer;

pub use client::{ClientSettings, OpenAiClient};
pub use code_analyzer::{reply_or_sentinel, CodeAnalyzer};
