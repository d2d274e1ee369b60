use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

use crate::domain::cluster::batch_system_trait::{BatchSystem, SubmitRequest};
use crate::domain::cluster::slurm::sinfo_response::SinfoResponse;
use crate::error::{Error, Result};

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to Slurm through its command line tools.
#[derive(Debug, Clone)]
pub struct SlurmCli {
    /// Read the node list from this file instead of running `sinfo --json`.
    pub sinfo_json: Option<PathBuf>,
    pub timeout: Duration,
}

impl SlurmCli {
    pub fn new(sinfo_json: Option<PathBuf>) -> Self {
        SlurmCli { sinfo_json, timeout: DEFAULT_COMMAND_TIMEOUT }
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<String> {
        let command_line = format!("{} {}", program, args.join(" "));
        log::debug!("Executing '{}'.", command_line);

        let output = tokio::time::timeout(self.timeout, Command::new(program).args(args).kill_on_drop(true).output())
            .await
            .map_err(|_| Error::Timeout(command_line.clone()))?
            .map_err(|e| Error::CommandError { command: command_line.clone(), message: e.to_string() })?;

        if !output.status.success() {
            let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
            log::error!("'{}' exited with {}: {}", command_line, output.status, message);
            return Err(Error::CommandError { command: command_line, message });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Arguments of `sbatch` for `request`:
/// `--time=<h>:00:00 --begin=now+<secs> --nodelist=<node> [--exclusive] <command>`.
///
/// Options after the script name are handed to the script, so they go first.
pub fn build_sbatch_args(request: &SubmitRequest) -> Vec<String> {
    let mut args = vec![
        format!("--time={}:00:00", request.runtime_hours),
        format!("--begin=now+{}", request.begin_offset.num_seconds().max(0)),
        format!("--nodelist={}", request.node),
    ];
    if request.exclusive {
        args.push("--exclusive".to_string());
    }

    args.extend(request.command.split_whitespace().map(str::to_string));
    args
}

#[async_trait]
impl BatchSystem for SlurmCli {
    async fn submit(&self, request: &SubmitRequest) -> Result<String> {
        let answer = self.run("sbatch", &build_sbatch_args(request)).await?;
        log::info!("sbatch: {}", answer.trim());
        Ok(answer)
    }

    async fn list_nodes(&self) -> Result<SinfoResponse> {
        let json = match &self.sinfo_json {
            Some(path) => tokio::fs::read_to_string(path).await?,
            None => self.run("sinfo", &["--json".to_string()]).await?,
        };

        Ok(serde_json::from_str(&json)?)
    }
}
