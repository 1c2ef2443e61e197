//! # Profile Summary
//!
//! Backend endpoint for the Avery's Inbox ethics simulation. It turns a student's recorded
//! decisions into a prompt and asks a Groq-hosted LLM for a short moral profile and an
//! explanation of the laws involved.
//!
//! ## Pipeline
//!
//! - **Validation**: [`request::SummaryRequest`] decodes the loose JSON payload with defaults
//! - **Aggregation**: [`aggregate::LawSummary`] counts decisions per law
//! - **Context**: [`scenarios`] adds short scenario subjects from `scenarios.json`
//! - **Prompt**: [`prompt::build_prompt`] renders the fixed template
//! - **Completion**: [`completion::CompletionClient`] calls the API and normalizes the reply

pub mod aggregate;
pub mod completion;
pub mod config;
pub mod error;
pub mod prompt;
pub mod request;
pub mod scenarios;
pub mod server;

pub use completion::ProfileSummary;
pub use config::Config;
pub use error::EndpointError;
pub use request::SummaryRequest;
pub use server::AppState;
