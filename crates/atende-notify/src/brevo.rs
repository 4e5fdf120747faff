//! QR delivery through the Brevo transactional e-mail API.

use crate::qr::png_data_url;
use async_trait::async_trait;
use atende_core::{config::EmailConfig, error::AtendeError, traits::QrNotifier};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use tracing::{debug, info};

/// Attachment file name for the QR image.
pub const QR_ATTACHMENT_NAME: &str = "qrcode.png";

/// Sends the login QR to one administrator address.
pub struct BrevoMailer {
    client: reqwest::Client,
    config: EmailConfig,
}

#[derive(Serialize)]
struct Contact<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct Attachment<'a> {
    name: &'a str,
    content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailRequest<'a> {
    sender: Contact<'a>,
    to: Vec<Contact<'a>>,
    subject: &'a str,
    html_content: String,
    attachment: Vec<Attachment<'a>>,
}

impl BrevoMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v3/smtp/email", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request<'a>(&'a self, png: &[u8]) -> SendEmailRequest<'a> {
        let html_content = format!(
            "<p>Escaneie o QR Code para conectar o bot ao WhatsApp:</p>\
             <img src=\"{}\" alt=\"QR Code\">",
            png_data_url(png)
        );
        SendEmailRequest {
            sender: Contact {
                email: &self.config.from,
                name: &self.config.from_name,
            },
            to: vec![Contact {
                email: &self.config.to,
                name: &self.config.to_name,
            }],
            subject: &self.config.subject,
            html_content,
            attachment: vec![Attachment {
                name: QR_ATTACHMENT_NAME,
                content: STANDARD.encode(png),
            }],
        }
    }
}

#[async_trait]
impl QrNotifier for BrevoMailer {
    fn name(&self) -> &str {
        "brevo"
    }

    async fn notify(&self, png: &[u8]) -> Result<(), AtendeError> {
        let url = self.endpoint();
        debug!("brevo: POST {url} to={}", self.config.to);

        let resp = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .json(&self.build_request(png))
            .send()
            .await
            .map_err(|e| AtendeError::Notify(format!("brevo request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AtendeError::Notify(format!(
                "brevo rejected e-mail ({status}): {text}"
            )));
        }

        info!("QR code e-mailed to {}", self.config.to);
        Ok(())
    }
}
