//! Error taxonomy for one generation request.
//!
//! Every variant is terminal for the request that produced it. The HTTP layer
//! turns each one into a distinct `errorKind` so callers can tell "fix your
//! input" apart from "the pipeline is broken".

use std::path::PathBuf;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shared_types::{ErrorKind, GenerateErrorResponse};

/// Pipeline stdout/stderr captured up to the point of failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("{0}")]
    Validation(String),

    #[error("Could not prepare workspace ({context}): {source}")]
    Workspace {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not start memo pipeline `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Memo generation failed: {}", describe_exit(.exit_code))]
    Execution {
        exit_code: Option<i32>,
        diagnostics: Diagnostics,
    },

    #[error("Lost track of memo pipeline `{program}` while waiting for it to exit: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
        diagnostics: Diagnostics,
    },

    #[error("Memo generation timed out after {}s", .timeout.as_secs())]
    Timeout {
        timeout: Duration,
        diagnostics: Diagnostics,
    },

    #[error("Memo generation failed: pipeline produced no artifact at {}", .path.display())]
    ArtifactMissing {
        path: PathBuf,
        diagnostics: Diagnostics,
    },

    #[error("Memo generation failed: artifact at {} could not be read: {source}", .path.display())]
    ArtifactUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        diagnostics: Diagnostics,
    },
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("pipeline exited with code {code}"),
        None => "pipeline was terminated by a signal".to_string(),
    }
}

impl GenerationError {
    pub fn workspace(context: impl Into<String>, source: std::io::Error) -> Self {
        GenerationError::Workspace {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::Validation(_) => ErrorKind::ValidationError,
            GenerationError::Workspace { .. } => ErrorKind::WorkspaceError,
            GenerationError::Spawn { .. } => ErrorKind::SpawnError,
            GenerationError::Execution { .. } | GenerationError::Wait { .. } => {
                ErrorKind::ExecutionError
            }
            GenerationError::Timeout { .. } => ErrorKind::PipelineTimeout,
            GenerationError::ArtifactMissing { .. } => ErrorKind::ArtifactMissing,
            GenerationError::ArtifactUnreadable { .. } => ErrorKind::ArtifactUnreadable,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        if self.kind().is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Captured pipeline output, if the pipeline got far enough to produce any.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            GenerationError::Execution { diagnostics, .. }
            | GenerationError::Wait { diagnostics, .. }
            | GenerationError::Timeout { diagnostics, .. }
            | GenerationError::ArtifactMissing { diagnostics, .. }
            | GenerationError::ArtifactUnreadable { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }

    pub fn to_body(&self) -> GenerateErrorResponse {
        let mut body = GenerateErrorResponse::new(self.kind(), self.to_string());
        if let Some(diagnostics) = self.diagnostics() {
            body = body.with_streams(diagnostics.stdout.clone(), diagnostics.stderr.clone());
        }
        if let GenerationError::Execution { exit_code, .. } = self {
            body = body.with_exit_code(*exit_code);
        }
        body
    }
}

impl IntoResponse for GenerationError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_body())).into_response()
    }
}
