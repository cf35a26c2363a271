//! [`ResendNotifier`]: emails the Préfecture about new questions through the
//! Resend HTTP API.

use std::time::Duration;

use prefecture_core::notify::{Notifier, Submission};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

fn default_endpoint() -> String { "https://api.resend.com/emails".to_owned() }

fn default_from() -> String { "prefecture@fase.app".to_owned() }

/// `[notify]` section of the server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
  pub api_key:    String,
  /// Comma-separated list of admin addresses.
  pub recipients: String,
  #[serde(default = "default_from")]
  pub from:       String,
  #[serde(default = "default_endpoint")]
  pub endpoint:   String,
}

impl NotifyConfig {
  pub fn recipient_list(&self) -> Vec<String> {
    self
      .recipients
      .split(',')
      .map(str::trim)
      .filter(|r| !r.is_empty())
      .map(str::to_owned)
      .collect()
  }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct Email {
  from:    String,
  to:      Vec<String>,
  subject: String,
  text:    String,
}

fn compose(from: &str, to: &[String], submission: &Submission) -> Email {
  let theme = submission.theme.label();
  Email {
    from:    from.to_owned(),
    to:      to.to_vec(),
    subject: format!("[Préfecture] Nouvelle question: {theme}"),
    text:    format!(
      "Nouvelle question soumise :\n\n- Thème : {theme}\n- Description : {}\n\n\
       Connectez-vous à la Préfecture pour répondre et publier.\n",
      submission.full_text
    ),
  }
}

/// Sends one email per submission. Each send runs on its own task; the
/// submitting request never waits for it.
#[derive(Clone)]
pub struct ResendNotifier {
  client:     Client,
  api_key:    String,
  from:       String,
  recipients: Vec<String>,
  endpoint:   String,
}

impl ResendNotifier {
  /// Returns `None` when no recipients are configured.
  pub fn new(config: &NotifyConfig) -> reqwest::Result<Option<Self>> {
    let recipients = config.recipient_list();
    if recipients.is_empty() {
      return Ok(None);
    }
    let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
    Ok(Some(Self {
      client,
      api_key: config.api_key.clone(),
      from: config.from.clone(),
      recipients,
      endpoint: config.endpoint.clone(),
    }))
  }

  async fn send(&self, email: Email) -> Result<(), String> {
    let resp = self
      .client
      .post(&self.endpoint)
      .bearer_auth(&self.api_key)
      .json(&email)
      .send()
      .await
      .map_err(|e| e.to_string())?;

    if !resp.status().is_success() {
      let status = resp.status();
      let body = resp.text().await.unwrap_or_default();
      return Err(format!("{status}: {body}"));
    }
    Ok(())
  }
}

impl Notifier for ResendNotifier {
  fn question_submitted(&self, submission: Submission) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
      warn!(question_id = %submission.question_id, "no async runtime; notification dropped");
      return;
    };
    let email = compose(&self.from, &self.recipients, &submission);
    let this = self.clone();
    runtime.spawn(async move {
      match this.send(email).await {
        Ok(()) => debug!(question_id = %submission.question_id, "admins notified"),
        Err(error) => warn!(
          question_id = %submission.question_id,
          %error,
          "failed to notify admins of new question"
        ),
      }
    });
  }
}
