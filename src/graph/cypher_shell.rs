use super::statement::{Statement, render_batch};
use super::store::GraphStore;
use crate::config::GraphConfig;
use crate::error::GraphError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Neo4j through the `cypher-shell` executable. Each call writes its batch
/// to a temporary script and runs it non-interactively.
pub struct CypherShellStore {
    config: GraphConfig,
}

impl CypherShellStore {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    /// Check that the shell runs and the server answers
    pub async fn connect(config: GraphConfig) -> Result<Self> {
        let store = Self::new(config);
        store
            .run_script("RETURN 1;", 1)
            .await
            .map_err(|e| GraphError::ConnectionFailed(format!("{:#}", e)))?;
        tracing::info!("Connected to graph store at {}", store.config.uri);
        Ok(store)
    }

    async fn run_script(&self, script: &str, statement_count: usize) -> Result<String> {
        let mut file = tempfile::Builder::new()
            .prefix("graph-batch-")
            .suffix(".cypher")
            .tempfile()
            .context("Failed to create statement script")?;
        file.write_all(script.as_bytes())
            .context("Failed to write statement script")?;
        file.flush().context("Failed to flush statement script")?;

        let mut command = Command::new(&self.config.cypher_shell);
        command
            .arg("-a")
            .arg(&self.config.uri)
            .arg("-u")
            .arg(&self.config.username)
            .arg("-p")
            .arg(&self.config.password)
            .arg("--non-interactive")
            .arg("--format")
            .arg("plain")
            .arg("-f")
            .arg(file.path())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let timeout = self.config.timeout_secs;
        let output = match tokio::time::timeout(Duration::from_secs(timeout), command.output()).await
        {
            Ok(result) => result
                .with_context(|| format!("Failed to run {}", self.config.cypher_shell))?,
            Err(_) => return Err(GraphError::Timeout(timeout).into()),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GraphError::ExecutionFailed {
                statements: statement_count,
                reason: format!("{}: {}", output.status, stderr),
            }
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl GraphStore for CypherShellStore {
    async fn execute(&self, statements: &[Statement]) -> Result<String> {
        if statements.is_empty() {
            return Ok(String::new());
        }
        let script = render_batch(statements);
        tracing::debug!("Executing {} statement(s)", statements.len());
        self.run_script(&script, statements.len()).await
    }

    async fn clear(&self) -> Result<()> {
        self.execute(&[Statement::DetachDeleteAll])
            .await
            .context("Failed to clear graph store")?;
        tracing::info!("Cleared graph store");
        Ok(())
    }
}
