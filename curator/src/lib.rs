//! Curator memo gateway
//!
//! Accepts a batch of curated signals over HTTP, runs the external memo
//! pipeline against them in a throwaway workspace, and returns the Markdown
//! memo or a structured failure.

pub mod api;
pub mod artifact;
pub mod config;
pub mod error;
pub mod handler;
pub mod pipeline;
pub mod state;
pub mod validation;
pub mod workspace;

pub use state::AppState;
