//! Region-selector invocation boundary.
//!
//! The selector runs as an isolated subprocess that prints a structured
//! JSON report on stdout. Parse success is the only success signal:
//! spawn failure or unparseable output is an [`InvokeError`], never
//! silently coerced to an empty report. Exit status 1 with a valid
//! report simply means "no zone picked" and is not an error here.

use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use gridshift_select::SelectionReport;

/// The selector boundary failed to run or returned garbage. Treated by
/// the controller as "no suitable zone found"; the cooldown window is
/// still consumed.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("failed to run selector: {0}")]
    Spawn(String),

    #[error("selector produced unparseable output: {0}")]
    Malformed(String),

    #[error("selector did not finish within {0}s")]
    Timeout(u64),
}

/// Boxed future returned by [`SelectorInvoker::invoke`].
pub type InvokeFuture =
    Pin<Box<dyn Future<Output = Result<SelectionReport, InvokeError>> + Send + 'static>>;

/// Typed call boundary for region selection, mockable in tests.
pub trait SelectorInvoker: Send + Sync {
    fn invoke(&self) -> InvokeFuture;
}

/// Runs the `gridshift-select` binary with `--format json`.
#[derive(Clone)]
pub struct SelectSubprocess {
    pub binary: PathBuf,
    pub backend_url: String,
    pub metric: String,
    pub zones: Vec<String>,
    pub query_timeout_secs: u64,
    pub max_ceiling: Option<f64>,
    pub region_map: Option<PathBuf>,
}

impl SelectSubprocess {
    fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "--format".to_string(),
            "json".to_string(),
            "--backend-url".to_string(),
            self.backend_url.clone(),
            "--metric".to_string(),
            self.metric.clone(),
            "--zones".to_string(),
            self.zones.join(","),
            "--timeout".to_string(),
            self.query_timeout_secs.to_string(),
        ];
        if let Some(ceiling) = self.max_ceiling {
            args.push("--max-ceiling".to_string());
            args.push(ceiling.to_string());
        }
        if let Some(ref path) = self.region_map {
            args.push("--region-map".to_string());
            args.push(path.display().to_string());
        }
        args
    }

    async fn run(self) -> Result<SelectionReport, InvokeError> {
        let args = self.build_args();
        debug!(binary = %self.binary.display(), ?args, "invoking region selector");

        // Generous outer bound: per-zone query timeout times the zone
        // count, plus startup slack.
        let budget_secs = self.query_timeout_secs * self.zones.len().max(1) as u64 + 10;
        let output = tokio::time::timeout(
            Duration::from_secs(budget_secs),
            Command::new(&self.binary).args(&args).output(),
        )
        .await
        .map_err(|_| InvokeError::Timeout(budget_secs))?
        .map_err(|e| InvokeError::Spawn(format!("{}: {e}", self.binary.display())))?;

        if !output.stderr.is_empty() {
            debug!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "selector stderr"
            );
        }

        // Exit status 1 still carries a valid "best: null" report; parse
        // stdout regardless of status and let the shape decide.
        serde_json::from_slice(&output.stdout).map_err(|e| {
            let stdout = String::from_utf8_lossy(&output.stdout);
            warn!(
                status = ?output.status.code(),
                stdout = %stdout.trim(),
                "selector crashed or produced invalid output"
            );
            InvokeError::Malformed(e.to_string())
        })
    }
}

impl SelectorInvoker for SelectSubprocess {
    fn invoke(&self) -> InvokeFuture {
        let this = self.clone();
        Box::pin(this.run())
    }
}
