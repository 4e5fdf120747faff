//! Bot session controller: the lifecycle state machine and event loop.
//!
//! Consumes client events one at a time: persists credentials on
//! authentication, publishes and e-mails the login QR, clears state on
//! disconnect, and answers chat messages through the responder.
//! Restarts the client with backoff when its event stream ends.


use crate::responder;
use atende_core::{
    error::AtendeError,
    event::ClientEvent,
    message::IncomingMessage,
    session::SessionCredentials,
    traits::{QrNotifier, WhatsAppClient},
};
use atende_notify::qr;
use atende_session::SessionStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, error, info, warn};

/// First restart delay after the client's event stream ends.
const INITIAL_BACKOFF_SECS: u64 = 1;
/// Restart delay ceiling.
const MAX_BACKOFF_SECS: u64 = 60;

/// Lifecycle phase of the WhatsApp connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    AwaitingCode,
    Authenticated,
    Ready,
    Disconnected,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::AwaitingCode => "awaiting_code",
            Self::Authenticated => "authenticated",
            Self::Ready => "ready",
            Self::Disconnected => "disconnected",
        }
    }
}

/// The most recent login code, kept until the client reports ready.
#[derive(Debug, Clone)]
pub struct PendingQr {
    pub png: Vec<u8>,
    pub generated_at: DateTime<Utc>,
}

/// State shared with the HTTP API. Written only by the controller.
#[derive(Debug)]
pub struct BotState {
    pub phase: Phase,
    pub pending_qr: Option<PendingQr>,
    pub started_at: Instant,
}

impl BotState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Uninitialized,
            pending_qr: None,
            started_at: Instant::now(),
        }
    }
}

impl Default for BotState {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedState = Arc<RwLock<BotState>>;

/// Why a dispatch run ended.
enum StreamEnd {
    Shutdown,
    /// The client's event stream closed. `reached_ready` resets the backoff.
    Closed { reached_ready: bool },
}

/// Controller tunables taken from config.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Pause used when pacing replies. Zero disables pacing.
    pub reply_delay: Duration,
    /// Delete stored credentials when the client disconnects.
    pub clear_on_disconnect: bool,
}

/// Drives one WhatsApp client for the lifetime of the process.
pub struct Controller {
    client: Arc<dyn WhatsAppClient>,
    store: SessionStore,
    notifier: Arc<dyn QrNotifier>,
    state: SharedState,
    settings: ControllerSettings,
}

impl Controller {
    pub fn new(
        client: Arc<dyn WhatsAppClient>,
        store: SessionStore,
        notifier: Arc<dyn QrNotifier>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            client,
            store,
            notifier,
            state: Arc::new(RwLock::new(BotState::new())),
            settings,
        }
    }

    /// Handle to the shared state, for the HTTP API.
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    #[cfg(test)]
    pub async fn phase(&self) -> Phase {
        self.state.read().await.phase
    }

    async fn set_phase(&self, phase: Phase) {
        let mut state = self.state.write().await;
        if state.phase != phase {
            debug!("phase {} -> {}", state.phase.as_str(), phase.as_str());
            state.phase = phase;
        }
    }

    /// Run until `shutdown` flips to true (or its sender is dropped).
    ///
    /// Loads the stored session, initializes the client, and dispatches its
    /// events. When the event stream ends, waits with exponential backoff and
    /// starts over with a freshly loaded session.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), AtendeError> {
        let mut backoff = INITIAL_BACKOFF_SECS;

        while !*shutdown.borrow() {
            let session = self.store.load().await;
            info!(
                "initializing {} client ({})",
                self.client.name(),
                if session.is_some() { "stored session" } else { "new login" }
            );

            match self.client.initialize(session).await {
                Ok(events) => match self.dispatch(events, &mut shutdown).await {
                    StreamEnd::Shutdown => break,
                    StreamEnd::Closed { reached_ready } => {
                        if reached_ready {
                            backoff = INITIAL_BACKOFF_SECS;
                        }
                        warn!("client event stream closed, restarting in {backoff}s");
                        let mut state = self.state.write().await;
                        state.phase = Phase::Disconnected;
                        state.pending_qr = None;
                    }
                },
                Err(e) => {
                    error!("client initialization failed: {e}; retrying in {backoff}s");
                }
            }

            if wait_or_shutdown(&mut shutdown, Duration::from_secs(backoff)).await {
                break;
            }
            backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
        }

        info!("controller shutting down");
        self.client.stop().await
    }

    /// Feed events to the handlers until the stream closes or shutdown.
    async fn dispatch(
        &self,
        mut events: mpsc::Receiver<ClientEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> StreamEnd {
        let mut reached_ready = false;
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return StreamEnd::Shutdown;
                    }
                }
                event = events.recv() => match event {
                    Some(event) => {
                        reached_ready |= matches!(event, ClientEvent::Ready);
                        self.handle(event).await;
                    }
                    None => return StreamEnd::Closed { reached_ready },
                }
            }
        }
    }

    /// Route one client event to its handler.
    pub async fn handle(&self, event: ClientEvent) {
        match event {
            ClientEvent::CodeReady(code) => self.on_code_ready(code).await,
            ClientEvent::Authenticated(session) => self.on_authenticated(session).await,
            ClientEvent::AuthFailure(reason) => self.on_auth_failure(&reason).await,
            ClientEvent::Ready => self.on_ready().await,
            ClientEvent::Disconnected(reason) => self.on_disconnected(&reason).await,
            ClientEvent::Message(msg) => self.on_message(msg).await,
            ClientEvent::Error(message) => error!("client error: {message}"),
        }
    }

    async fn on_code_ready(&self, code: String) {
        info!("QR code generated, scan it to connect");

        match qr::render_terminal(&code) {
            Ok(art) => println!("\n{art}"),
            Err(e) => warn!("terminal QR render failed: {e}"),
        }

        let png = match qr::render_png(&code) {
            Ok(png) => Some(png),
            Err(e) => {
                error!("failed to render QR image: {e}");
                None
            }
        };

        {
            let mut state = self.state.write().await;
            state.phase = Phase::AwaitingCode;
            state.pending_qr = png.as_ref().map(|png| PendingQr {
                png: png.clone(),
                generated_at: Utc::now(),
            });
        }

        if let Some(png) = png {
            if let Err(e) = self.notifier.notify(&png).await {
                error!("failed to send QR via {}: {e}", self.notifier.name());
            }
        }
    }

    async fn on_authenticated(&self, session: Option<serde_json::Value>) {
        self.set_phase(Phase::Authenticated).await;
        info!("session authenticated");

        let Some(value) = session else {
            debug!("client exposed no credentials, nothing to persist");
            return;
        };
        match SessionCredentials::from_value(value) {
            Ok(creds) => {
                // Failures are logged by the store.
                let _ = self.store.save(&creds).await;
            }
            Err(e) => warn!("not persisting session: {e}"),
        }
    }

    async fn on_auth_failure(&self, reason: &str) {
        warn!("authentication failed: {reason}; discarding stored session");
        let _ = self.store.clear().await;
        self.set_phase(Phase::AwaitingCode).await;
    }

    async fn on_ready(&self) {
        let mut state = self.state.write().await;
        state.phase = Phase::Ready;
        state.pending_qr = None;
        info!("bot connected and ready");
    }

    async fn on_disconnected(&self, reason: &str) {
        {
            let mut state = self.state.write().await;
            state.phase = Phase::Disconnected;
            state.pending_qr = None;
        }
        info!("client disconnected: {reason}");

        if self.settings.clear_on_disconnect {
            let _ = self.store.clear().await;
        }
    }

    async fn on_message(&self, msg: IncomingMessage) {
        let Some(reply) = responder::respond(&msg) else {
            debug!("no reply for message from {}", msg.sender_id);
            return;
        };
        info!(
            "replying to {} with {} message(s)",
            msg.sender_id,
            reply.texts.len()
        );

        let delay = self.settings.reply_delay;
        let paced = reply.paced && !delay.is_zero();

        for (i, text) in reply.texts.iter().enumerate() {
            if paced {
                tokio::time::sleep(delay).await;
                if i == 0 {
                    if let Err(e) = self.client.send_typing(&msg.chat_id).await {
                        debug!("typing indicator failed: {e}");
                    }
                    tokio::time::sleep(delay).await;
                }
            }
            if let Err(e) = self.client.send_message(&msg.chat_id, text).await {
                warn!("failed to send reply to {}: {e}", msg.chat_id);
            }
        }
    }
}

/// Sleep for `delay`; returns true if shutdown was requested meanwhile.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => *shutdown.borrow(),
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}
