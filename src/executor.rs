use std::process::Stdio;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::time::timeout;

use crate::builder::CommandPlan;

/// Captured result of one external process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed, by a signal or on timeout
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Stdout followed by stderr, the way a terminal would show them
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}{}", self.stdout, self.stderr),
        }
    }
}

/// Runs command plans as external processes
///
/// Implementations block until the process finishes; callers run them on
/// the blocking thread pool.
pub trait ProcessExecutor: Send + Sync {
    /// Executes `plan`, killing the process once `limit` has elapsed.
    ///
    /// A non-zero exit is reported through [`ProcessOutput`]; `Err` means the
    /// process could not be run at all.
    fn execute(&self, plan: &CommandPlan, limit: Duration) -> Result<ProcessOutput>;
}

/// Spawns processes directly on the host, without any isolation
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalExecutor;

impl ProcessExecutor for LocalExecutor {
    fn execute(&self, plan: &CommandPlan, limit: Duration) -> Result<ProcessOutput> {
        tokio::runtime::Handle::current().block_on(async {
            match timeout(limit, execute_async(plan)).await {
                Ok(output) => output,
                Err(_) => Ok(ProcessOutput {
                    stderr: format!("{} timed out after {}s", plan.phase, limit.as_secs()),
                    timed_out: true,
                    ..Default::default()
                }),
            }
        })
    }
}

async fn execute_async(plan: &CommandPlan) -> Result<ProcessOutput> {
    if plan.program.is_empty() {
        bail!("Empty {} command", plan.phase);
    }

    let mut cmd = tokio::process::Command::new(&plan.program);
    cmd.args(&plan.args)
        .current_dir(&plan.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    log::debug!(
        "Spawning {} process: {} {:?} in {}",
        plan.phase,
        plan.program,
        plan.args,
        plan.working_dir.display()
    );
    let output = cmd.spawn()?.wait_with_output().await?;

    Ok(ProcessOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
        timed_out: false,
    })
}
