//! One generation request, start to finish.
//!
//! Stages run strictly in order: validating → staging → invoking → reading →
//! responding. Any stage may fail straight into responding. Once a workspace
//! exists, responding removes it exactly once, whichever way the request went.

use std::sync::Arc;

use serde_json::Value;
use shared_types::GenerateResponse;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::artifact::read_artifact;
use crate::error::GenerationError;
use crate::pipeline::{InvocationRequest, PipelineInvoker};
use crate::validation::{validate_request, ValidatedRequest};
use crate::workspace::{Workspace, WorkspaceManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Staging,
    Invoking,
    Reading,
    Responding,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Validating => "validating",
            Stage::Staging => "staging",
            Stage::Invoking => "invoking",
            Stage::Reading => "reading",
            Stage::Responding => "responding",
        };
        f.write_str(s)
    }
}

/// Composes validation, workspace lifecycle, pipeline invocation and artifact
/// reading. Holds no per-request state, so one instance serves every request
/// concurrently.
#[derive(Clone)]
pub struct GenerationHandler {
    workspaces: WorkspaceManager,
    invoker: Arc<dyn PipelineInvoker>,
}

impl GenerationHandler {
    pub fn new(workspaces: WorkspaceManager, invoker: Arc<dyn PipelineInvoker>) -> Self {
        Self {
            workspaces,
            invoker,
        }
    }

    pub async fn generate(&self, body: Value) -> Result<GenerateResponse, GenerationError> {
        let request_id = Uuid::new_v4();
        async move {
            debug!(stage = %Stage::Validating, "stage");
            let request = validate_request(body).map_err(|e| {
                info!("rejected request: {e}");
                e
            })?;

            debug!(stage = %Stage::Staging, signals = request.signals.len(), "stage");
            let workspace = self.workspaces.create().await?;

            let result = self.run(&workspace, request).await;

            debug!(stage = %Stage::Responding, ok = result.is_ok(), "stage");
            workspace.destroy().await;
            result
        }
        .instrument(info_span!("generate", %request_id))
        .await
    }

    async fn run(
        &self,
        workspace: &Workspace,
        request: ValidatedRequest,
    ) -> Result<GenerateResponse, GenerationError> {
        let input_path = workspace.stage_signals(&request.signals).await?;

        debug!(stage = %Stage::Invoking, workspace = %workspace.path().display(), "stage");
        let invocation = InvocationRequest {
            input_path,
            output_path: workspace.expected_output_path(),
            reference_date: request.reference_date,
        };
        let output = self.invoker.invoke(&invocation).await?;
        if !output.success() {
            warn!(exit_code = ?output.exit_code, "pipeline failed");
            return Err(GenerationError::Execution {
                exit_code: output.exit_code,
                diagnostics: output.into_diagnostics(),
            });
        }

        debug!(stage = %Stage::Reading, "stage");
        read_artifact(workspace, output).await
    }
}
