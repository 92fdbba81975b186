//! Search tools for sentiment-rs
//!
//! A [`Tool`] turns one query into one block of free text by making exactly one
//! external lookup. Two tools are provided:
//!
//! - [`NewsSearchTool`] (`tav_search`): recent financial news through a
//!   [`NewsSearchClient`], by default [`TavilyClient`]
//! - [`SocialSearchTool`] (`reddit_tool`): forum comments through a [`ForumClient`],
//!   by default [`RedditClient`]
//!
//! [`SingleUseTool`] wraps any tool for the duration of one agent run and refuses
//! every call after the first.

pub mod error;
pub mod guard;
pub mod news;
pub mod social;
pub mod tool;

pub use error::{Result, ToolError};
pub use guard::{SingleUseTool, ToolInvocation};
pub use news::{NewsSearchClient, NewsSearchTool, TavilyClient};
pub use social::{ForumClient, RedditClient, SocialSearchTool, Submission, TimeFilter};
pub use tool::Tool;
