//! Public contact form, submitted to a third-party relay service.
//!
//! The relay receives multipart form data: the visitor's fields, a fixed
//! access key identifying this site, and a hidden honeypot field. Humans
//! leave the honeypot empty; bots tend to fill it. The field is forwarded
//! verbatim either way - spam rejection is the relay's job, this side only
//! makes the signal distinguishable in the payload.

use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{ClientError, Result};

/// Name of the hidden honeypot field in the relay payload.
const HONEYPOT_FIELD: &str = "botcheck";

/// Submission lifecycle driving the form UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Sending,
    Success,
    /// Failed; the form stays filled and can be resubmitted.
    Error,
}

/// A filled-in contact form.
#[derive(Debug, Clone, Default)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub message: String,
    /// Hidden field; empty for humans.
    pub honeypot: String,
}

pub struct ContactForm {
    http: reqwest::Client,
    endpoint: String,
    access_key: String,
    state: watch::Sender<SubmitState>,
}

impl ContactForm {
    pub fn new(endpoint: impl Into<String>, access_key: impl Into<String>) -> Self {
        let (state, _) = watch::channel(SubmitState::Idle);
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            access_key: access_key.into(),
            state,
        }
    }

    pub fn state(&self) -> SubmitState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmitState> {
        self.state.subscribe()
    }

    /// Post the submission to the relay.
    ///
    /// Drives the state through `Sending` to `Success` or `Error`; an
    /// errored form re-arms itself for resubmission.
    pub async fn submit(&self, submission: &ContactSubmission) -> Result<()> {
        self.state.send_replace(SubmitState::Sending);

        let form = reqwest::multipart::Form::new()
            .text("access_key", self.access_key.clone())
            .text("name", submission.name.clone())
            .text("email", submission.email.clone())
            .text("message", submission.message.clone())
            .text(HONEYPOT_FIELD, submission.honeypot.clone());

        let outcome = async {
            let response = self.http.post(&self.endpoint).multipart(form).send().await?;
            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(ClientError::Api {
                    status: status.as_u16(),
                    message: format!("relay returned {status}"),
                })
            }
        }
        .await;

        match &outcome {
            Ok(()) => {
                info!("Contact form delivered");
                self.state.send_replace(SubmitState::Success);
            }
            Err(e) => {
                warn!(error = %e, "Contact form submission failed");
                self.state.send_replace(SubmitState::Error);
            }
        }
        outcome
    }
}
