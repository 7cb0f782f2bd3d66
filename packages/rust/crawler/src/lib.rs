//! HTTP collaborators for the team-member pipeline.
//!
//! This crate provides:
//! - [`Session`]: the paced HTTP session shared by a run
//! - [`PageResolver`] and [`DirectoryPageResolver`]: seed to team-page link
//! - [`TeamPageExtractor`] and [`LlmTeamExtractor`]: team page to people
//! - [`LlmClient`]: the chat-completion client behind the extractor

pub mod extractor;
pub mod llm;
pub mod resolver;
pub mod session;

pub use extractor::{LlmTeamExtractor, TeamPageExtractor, ensure_protocol};
pub use llm::LlmClient;
pub use resolver::{DirectoryPageResolver, PageResolver};
pub use session::{Fetched, Session};
