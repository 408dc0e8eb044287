use std::path::PathBuf;
use std::time::Duration;

/// Default request body limit (4 MiB)
const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the gateway binds to
    pub bind: String,
    /// Port the gateway listens on
    pub port: u16,
    /// Pipeline invocation settings
    pub pipeline: PipelineConfig,
    /// Parent directory for per-request workspaces
    pub workspace_root: PathBuf,
    /// Maximum accepted request body in bytes
    pub max_body_bytes: usize,
}

/// How to launch the external memo pipeline. Read-only after startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Interpreter or binary to execute (e.g. `python3`).
    pub program: String,
    /// First argument: the pipeline entry point (e.g. `main.py`).
    pub target: String,
    /// Working directory for the pipeline process.
    pub cwd: Option<PathBuf>,
    /// Kill the pipeline after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            target: "main.py".to_string(),
            cwd: None,
            timeout: Some(Duration::from_secs(300)),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let timeout_secs: u64 = env_parse("CURATOR_PIPELINE_TIMEOUT_SECS", 300)?;

        Ok(Self {
            bind: env_str("CURATOR_BIND", "0.0.0.0"),
            port: env_parse("CURATOR_PORT", 8787)?,
            pipeline: PipelineConfig {
                // PYTHON_PATH matches the variable the web frontend already honours.
                program: env_str("PYTHON_PATH", "python3"),
                target: env_str("CURATOR_PIPELINE_TARGET", "main.py"),
                cwd: std::env::var("CURATOR_PIPELINE_CWD").ok().map(PathBuf::from),
                timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            },
            workspace_root: std::env::var("CURATOR_WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir()),
            max_body_bytes: env_parse("CURATOR_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => parse_value(key, &val),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, val: &str) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    val.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}"))
}
