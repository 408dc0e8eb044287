//! Reads the memo the pipeline left in the workspace.

use std::io;

use shared_types::GenerateResponse;
use tracing::{debug, error};

use crate::error::GenerationError;
use crate::pipeline::PipelineOutput;
use crate::workspace::Workspace;

/// Read the artifact after a successful run and pair it with the run's stdout.
///
/// The memo is returned exactly as written. A successful exit without an
/// artifact is a pipeline contract violation (`ArtifactMissing`).
pub async fn read_artifact(
    workspace: &Workspace,
    output: PipelineOutput,
) -> Result<GenerateResponse, GenerationError> {
    let path = workspace.expected_output_path();

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            error!(artifact = %path.display(), "pipeline exited 0 without writing an artifact");
            return Err(GenerationError::ArtifactMissing {
                path,
                diagnostics: output.into_diagnostics(),
            });
        }
        Err(source) => {
            error!(artifact = %path.display(), "failed to read artifact: {source}");
            return Err(GenerationError::ArtifactUnreadable {
                path,
                source,
                diagnostics: output.into_diagnostics(),
            });
        }
    };

    let memo = match String::from_utf8(bytes) {
        Ok(memo) => memo,
        Err(e) => {
            error!(artifact = %path.display(), "artifact is not valid UTF-8");
            return Err(GenerationError::ArtifactUnreadable {
                path,
                source: io::Error::new(io::ErrorKind::InvalidData, e),
                diagnostics: output.into_diagnostics(),
            });
        }
    };

    debug!(artifact = %path.display(), memo_bytes = memo.len(), "artifact read");
    Ok(GenerateResponse {
        memo,
        log: output.stdout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::WorkspaceManager;

    fn ok_output(stdout: &str) -> PipelineOutput {
        PipelineOutput {
            exit_code: Some(0),
            stdout: stdout.to_string(),
            stderr: "warning: stale signal".to_string(),
        }
    }

    #[tokio::test]
    async fn returns_artifact_verbatim_with_stdout_as_log() {
        let temp = tempfile::tempdir().unwrap();
        let ws = WorkspaceManager::new(temp.path()).create().await.unwrap();
        let memo = "# Memo\n\n  trailing spaces  \r\nünïcödé\n";
        std::fs::write(ws.expected_output_path(), memo).unwrap();

        let response = read_artifact(&ws, ok_output("Loaded 3 signals\n")).await.unwrap();
        assert_eq!(response.memo, memo);
        assert_eq!(response.log, "Loaded 3 signals\n");
        ws.destroy().await;
    }

    #[tokio::test]
    async fn missing_artifact_keeps_diagnostics() {
        let temp = tempfile::tempdir().unwrap();
        let ws = WorkspaceManager::new(temp.path()).create().await.unwrap();

        let err = read_artifact(&ws, ok_output("done")).await.unwrap_err();
        match err {
            GenerationError::ArtifactMissing { path, diagnostics } => {
                assert_eq!(path, ws.expected_output_path());
                assert_eq!(diagnostics.stdout, "done");
                assert_eq!(diagnostics.stderr, "warning: stale signal");
            }
            other => panic!("expected ArtifactMissing, got {other:?}"),
        }
        ws.destroy().await;
    }

    #[tokio::test]
    async fn non_utf8_artifact_is_unreadable() {
        let temp = tempfile::tempdir().unwrap();
        let ws = WorkspaceManager::new(temp.path()).create().await.unwrap();
        std::fs::write(ws.expected_output_path(), [0xff, 0xfe, 0x00]).unwrap();

        let err = read_artifact(&ws, ok_output("")).await.unwrap_err();
        assert!(matches!(err, GenerationError::ArtifactUnreadable { .. }));
        ws.destroy().await;
    }

    #[tokio::test]
    async fn directory_in_place_of_artifact_is_unreadable() {
        let temp = tempfile::tempdir().unwrap();
        let ws = WorkspaceManager::new(temp.path()).create().await.unwrap();
        std::fs::create_dir(ws.expected_output_path()).unwrap();

        let err = read_artifact(&ws, ok_output("")).await.unwrap_err();
        assert!(matches!(err, GenerationError::ArtifactUnreadable { .. }));
        ws.destroy().await;
    }
}
