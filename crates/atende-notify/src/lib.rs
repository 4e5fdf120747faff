//! # atende-notify
//!
//! Login QR rendering and delivery to an administrator.

pub mod brevo;
pub mod qr;

pub use brevo::BrevoMailer;

use async_trait::async_trait;
use atende_core::{config::EmailConfig, error::AtendeError, traits::QrNotifier};
use std::sync::Arc;
use tracing::{info, warn};

/// Notifier used when e-mail delivery is not configured. Only logs.
pub struct DisabledNotifier;

#[async_trait]
impl QrNotifier for DisabledNotifier {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn notify(&self, _png: &[u8]) -> Result<(), AtendeError> {
        info!("QR e-mail disabled; scan the code from the terminal or GET /qr");
        Ok(())
    }
}

/// Pick the notifier for this configuration.
pub fn build_notifier(config: &EmailConfig) -> Arc<dyn QrNotifier> {
    if config.is_configured() {
        Arc::new(BrevoMailer::new(config.clone()))
    } else {
        warn!("email not configured (api_key/from/to); QR codes will not be e-mailed");
        Arc::new(DisabledNotifier)
    }
}
