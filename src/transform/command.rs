// src/transform/command.rs

//! External build command transform (sass, esbuild, minifiers, ...).

use std::collections::VecDeque;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::TransformError;
use crate::rules::PathRule;
use crate::transform::{Transform, TransformContext, TransformFuture, TransformReport};
use crate::types::TransformKind;

/// Space-separated source globs of the rule being built.
pub const SRC_ENV: &str = "ASSETWATCH_SRC";
/// Absolute destination directory of the rule being built.
pub const DEST_ENV: &str = "ASSETWATCH_DEST";

/// Number of trailing stderr lines kept for the failure report.
const STDERR_TAIL_LINES: usize = 20;

/// Runs a shell command in the project root.
///
/// The command sees the rule's sources and destination through
/// [`SRC_ENV`] and [`DEST_ENV`]. A nonzero exit is a
/// [`TransformError::CommandFailed`] carrying the tail of stderr.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    cmd: String,
}

impl CommandTransform {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }

    async fn execute(
        &self,
        task: &str,
        rule: &PathRule,
        ctx: &TransformContext,
    ) -> Result<TransformReport, TransformError> {
        let dest = ctx.root.join(rule.dest());
        ctx.fs.create_dir_all(&dest)?;

        info!(task, cmd = %self.cmd, "running build command");

        let mut cmd = shell_command(&self.cmd);
        cmd.current_dir(&ctx.root)
            .env(SRC_ENV, rule.source_patterns().join(" "))
            .env(DEST_ENV, &dest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning build command for task '{}'", task))?;

        // Drain both pipes so the child never blocks on a full buffer.
        if let Some(stdout) = child.stdout.take() {
            let task_name = task.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(task = %task_name, "stdout: {}", line);
                }
            });
        }

        let stderr_reader = child.stderr.take().map(|stderr| {
            let task_name = task.to_string();
            tokio::spawn(async move {
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(task = %task_name, "stderr: {}", line);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                Vec::from(tail)
            })
        });

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for build command of task '{}'", task))?;

        let stderr_tail = match stderr_reader {
            Some(handle) => handle.await.unwrap_or_default(),
            None => Vec::new(),
        };

        let code = status.code().unwrap_or(-1);
        debug!(task, exit_code = code, "build command exited");

        if status.success() {
            Ok(TransformReport::default())
        } else {
            Err(TransformError::CommandFailed {
                task: task.to_string(),
                code,
                stderr_tail,
            })
        }
    }
}

impl Transform for CommandTransform {
    fn kind(&self) -> TransformKind {
        TransformKind::Command
    }

    fn run<'a>(
        &'a self,
        task: &'a str,
        rule: &'a PathRule,
        ctx: &'a TransformContext,
    ) -> TransformFuture<'a> {
        Box::pin(self.execute(task, rule, ctx))
    }
}

/// Build a shell command appropriate for the platform.
fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}
