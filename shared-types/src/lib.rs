//! Shared types between the memo gateway and its clients
//!
//! These types describe the JSON contract of `POST /api/generate`:
//! - the request body a client sends
//! - the success payload (`memo` + `log`)
//! - the failure payload (`errorKind` + `errorMessage` + captured streams)
//!
//! Serializable with serde; TypeScript bindings are generated with ts-rs.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Request
// ============================================================================

/// Body of a memo generation request.
///
/// The gateway validates the raw JSON itself so that malformed bodies can be
/// answered with a structured error; this type is the well-formed shape.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "generate.ts")]
pub struct GenerateRequest {
    /// Curated signal records. Their schema belongs to the pipeline.
    #[ts(type = "Array<Record<string, unknown>>")]
    pub signals: Vec<serde_json::Value>,

    /// ISO `YYYY-MM-DD` date the pipeline treats as "today".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub reference_date: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

/// Successful generation: the artifact plus the pipeline's stdout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "generate.ts")]
pub struct GenerateResponse {
    pub memo: String,
    pub log: String,
}

/// Machine-readable failure class.
///
/// `ValidationError` is the only caller-side kind; every other kind means the
/// pipeline or the host is broken.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "generate.ts")]
pub enum ErrorKind {
    ValidationError,
    WorkspaceError,
    SpawnError,
    ExecutionError,
    PipelineTimeout,
    ArtifactMissing,
    ArtifactUnreadable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::WorkspaceError => "workspace_error",
            ErrorKind::SpawnError => "spawn_error",
            ErrorKind::ExecutionError => "execution_error",
            ErrorKind::PipelineTimeout => "pipeline_timeout",
            ErrorKind::ArtifactMissing => "artifact_missing",
            ErrorKind::ArtifactUnreadable => "artifact_unreadable",
        }
    }

    /// True when the caller can fix the failure by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ErrorKind::ValidationError)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failed generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "generate.ts")]
pub struct GenerateErrorResponse {
    pub error_kind: ErrorKind,
    pub error_message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub exit_code: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub stdout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub stderr: Option<String>,
}

impl GenerateErrorResponse {
    pub fn new(error_kind: ErrorKind, error_message: impl Into<String>) -> Self {
        Self {
            error_kind,
            error_message: error_message.into(),
            exit_code: None,
            stdout: None,
            stderr: None,
        }
    }

    /// Attach captured pipeline streams.
    pub fn with_streams(mut self, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.stdout = Some(stdout.into());
        self.stderr = Some(stderr.into());
        self
    }

    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }
}
