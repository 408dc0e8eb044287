use std::sync::Arc;

use crate::config::Config;
use crate::handler::GenerationHandler;
use crate::pipeline::{PipelineInvoker, ProcessInvoker};
use crate::workspace::WorkspaceManager;

pub struct AppState {
    pub handler: GenerationHandler,
}

impl AppState {
    /// Production wiring: real child processes, workspaces under the configured root.
    pub fn from_config(config: &Config) -> Arc<Self> {
        let invoker: Arc<dyn PipelineInvoker> =
            Arc::new(ProcessInvoker::new(config.pipeline.clone()));
        Self::with_invoker(WorkspaceManager::new(&config.workspace_root), invoker)
    }

    pub fn with_invoker(
        workspaces: WorkspaceManager,
        invoker: Arc<dyn PipelineInvoker>,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: GenerationHandler::new(workspaces, invoker),
        })
    }
}
