//! WhatsAppClient trait implementation for the bridge.

use super::codec::{decode_line, BridgeCommand, Decoded};
use super::{BridgeClient, EVENT_BUFFER, STOP_GRACE_SECS};
use async_trait::async_trait;
use atende_core::{
    error::AtendeError, event::ClientEvent, session::SessionCredentials, traits::WhatsAppClient,
};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

impl BridgeClient {
    /// Stop any attached process without the shutdown handshake.
    async fn kill_current(&self) {
        self.stdin.lock().await.take();
        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.kill().await;
        }
    }
}

#[async_trait]
impl WhatsAppClient for BridgeClient {
    fn name(&self) -> &str {
        "bridge"
    }

    async fn initialize(
        &self,
        session: Option<SessionCredentials>,
    ) -> Result<mpsc::Receiver<ClientEvent>, AtendeError> {
        self.kill_current().await;

        let argv = self.command_line();
        info!("starting WhatsApp bridge: {}", argv.join(" "));

        let mut child = tokio::process::Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AtendeError::Client(format!("failed to spawn bridge '{}': {e}", argv[0]))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AtendeError::Client("bridge stdout unavailable".into()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AtendeError::Client("bridge stdin unavailable".into()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("bridge stderr: {line}");
                }
            });
        }

        *self.stdin.lock().await = Some(stdin);
        *self.child.lock().await = Some(child);

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match decode_line(&line) {
                        Some(Decoded::Event(event)) => {
                            debug!("bridge event: {}", event.kind());
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Some(Decoded::Output(text)) => debug!("bridge: {text}"),
                        Some(Decoded::Unrecognized(detail)) => {
                            debug!("unrecognized bridge event: {detail}")
                        }
                        None => {}
                    },
                    Ok(None) => {
                        info!("WhatsApp bridge process exited");
                        break;
                    }
                    Err(e) => {
                        warn!("error reading bridge stdout: {e}");
                        break;
                    }
                }
            }
        });

        let resume = session.is_some();
        self.write_command(&BridgeCommand::Initialize {
            session: session.as_ref(),
        })
        .await?;
        info!(
            "WhatsApp bridge initialized ({})",
            if resume { "resuming stored session" } else { "fresh login" }
        );

        Ok(rx)
    }

    async fn send_message(&self, to: &str, text: &str) -> Result<(), AtendeError> {
        self.write_command(&BridgeCommand::Send { to, text }).await
    }

    async fn send_typing(&self, chat: &str) -> Result<(), AtendeError> {
        self.write_command(&BridgeCommand::Typing { chat }).await
    }

    async fn stop(&self) -> Result<(), AtendeError> {
        if let Err(e) = self.write_command(&BridgeCommand::Shutdown).await {
            debug!("bridge shutdown command not delivered: {e}");
        }
        self.stdin.lock().await.take();

        if let Some(mut child) = self.child.lock().await.take() {
            match tokio::time::timeout(Duration::from_secs(STOP_GRACE_SECS), child.wait()).await {
                Ok(Ok(status)) => debug!("bridge exited with {status}"),
                Ok(Err(e)) => warn!("waiting for bridge failed: {e}"),
                Err(_) => {
                    warn!("bridge did not exit within {STOP_GRACE_SECS}s, killing");
                    let _ = child.kill().await;
                }
            }
        }
        info!("WhatsApp bridge stopped");
        Ok(())
    }
}
