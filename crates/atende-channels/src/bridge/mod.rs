//! WhatsApp client backed by an external automation bridge process.
//!
//! The bridge (a headless WhatsApp Web driver) runs as a child process.
//! atende writes commands to its stdin and reads events from its stdout,
//! one JSON object per line (see [`codec`]).

mod client;
pub mod codec;

#[cfg(test)]
mod tests;

use atende_core::{config::BridgeConfig, error::AtendeError, shellexpand};
use codec::BridgeCommand;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::sync::Mutex;

/// Event channel capacity between the stdout reader and the controller.
const EVENT_BUFFER: usize = 64;

/// Seconds to wait for the bridge to exit after `shutdown` before killing it.
const STOP_GRACE_SECS: u64 = 5;

/// WhatsApp client that drives a bridge child process.
pub struct BridgeClient {
    pub(super) config: BridgeConfig,
    /// Bridge stdin, set while the process runs.
    pub(super) stdin: Arc<Mutex<Option<ChildStdin>>>,
    pub(super) child: Arc<Mutex<Option<Child>>>,
}

impl BridgeClient {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            stdin: Arc::new(Mutex::new(None)),
            child: Arc::new(Mutex::new(None)),
        }
    }

    /// Command line used to start the bridge, for logs and `status`.
    pub fn command_line(&self) -> Vec<String> {
        let mut argv = vec![self.config.command.clone()];
        if !self.config.script.is_empty() {
            argv.push(shellexpand(&self.config.script));
        }
        argv.extend(self.config.args.iter().cloned());
        argv
    }

    /// Whether a bridge process is currently attached.
    pub async fn is_running(&self) -> bool {
        self.stdin.lock().await.is_some()
    }

    /// Write one command line to the bridge.
    pub(super) async fn write_command(&self, cmd: &BridgeCommand<'_>) -> Result<(), AtendeError> {
        let line = cmd.to_line()?;
        let mut guard = self.stdin.lock().await;
        let stdin = guard
            .as_mut()
            .ok_or_else(|| AtendeError::Client("bridge is not running".into()))?;

        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| AtendeError::Client(format!("bridge write failed: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| AtendeError::Client(format!("bridge flush failed: {e}")))?;
        Ok(())
    }
}
