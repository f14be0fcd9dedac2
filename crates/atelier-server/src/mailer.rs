//! Transactional email via a third-party HTTP API.
//!
//! The portal sends exactly one kind of email: a styled HTML notice to the
//! client when the studio uploads new files to their record. Delivery is a
//! single POST with no retry policy; the outcome is reported as a
//! structured [`MailOutcome`] and the caller decides whether to log or
//! surface it.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ServerConfig;

/// Structured result of a send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl MailOutcome {
    fn ok() -> Self {
        Self { success: true, error: None }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: String,
    html: String,
}

pub struct Mailer {
    http: reqwest::Client,
    api_url: Option<String>,
    api_key: String,
    from: String,
    studio_name: String,
}

impl Mailer {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.mail_api_url.clone(),
            api_key: config.mail_api_key.clone(),
            from: config.mail_from.clone(),
            studio_name: config.instance_name.clone(),
        }
    }

    /// Notify a client that a new file landed on their record.
    pub async fn send_asset_notice(&self, to: &str, asset_name: &str) -> MailOutcome {
        let Some(api_url) = &self.api_url else {
            debug!("Mail API not configured, skipping notification");
            return MailOutcome::failed("mail API not configured");
        };

        let request = MailRequest {
            from: &self.from,
            to,
            subject: format!("{} shared a new file with you", self.studio_name),
            html: self.asset_notice_html(asset_name),
        };

        let response = self
            .http
            .post(api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                debug!(to = %to, asset = %asset_name, "Notification email sent");
                MailOutcome::ok()
            }
            Ok(resp) => {
                let status = resp.status();
                warn!(to = %to, %status, "Mail API rejected the notification");
                MailOutcome::failed(format!("mail API returned {status}"))
            }
            Err(e) => {
                warn!(to = %to, error = %e, "Failed to reach the mail API");
                MailOutcome::failed(e.to_string())
            }
        }
    }

    fn asset_notice_html(&self, asset_name: &str) -> String {
        format!(
            r#"<div style="font-family: Georgia, serif; max-width: 560px; margin: 0 auto; padding: 32px; color: #1a1a1a;">
  <h2 style="font-weight: normal; letter-spacing: 0.02em;">{studio}</h2>
  <p>Hello,</p>
  <p>We just added a new file to your project space:</p>
  <p style="padding: 12px 16px; background: #f4f1ec; border-radius: 4px; font-family: monospace;">{asset}</p>
  <p>Sign in to your dashboard to download it and leave us a note.</p>
  <p style="color: #8a8a8a; font-size: 13px; margin-top: 32px;">— the {studio} team</p>
</div>"#,
            studio = self.studio_name,
            asset = asset_name,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_mailer_reports_failure_without_sending() {
        let mailer = Mailer::from_config(&ServerConfig::default());
        let outcome = mailer.send_asset_notice("c@example.com", "brief.pdf").await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("not configured"));
    }

    #[test]
    fn notice_html_names_the_file_and_studio() {
        let config = ServerConfig {
            instance_name: "Maison Test".into(),
            ..Default::default()
        };
        let mailer = Mailer::from_config(&config);
        let html = mailer.asset_notice_html("brief.pdf");
        assert!(html.contains("brief.pdf"));
        assert!(html.contains("Maison Test"));
    }
}
