// SPDX-License-Identifier: MIT

//! Match notification emails over SMTP.
//!
//! When SMTP is not configured the service runs disabled: sends are
//! reported as skipped instead of failing, so the rest of the app works
//! without a mail account.

use crate::config::Config;
use crate::models::User;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{message::header::ContentType, Message, SmtpTransport, Transport};
use std::sync::Arc;

/// Errors from sending notifications.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail delivery is not configured")]
    Disabled,

    #[error("Giver '{0}' has no email address")]
    MissingAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

struct Sender {
    transport: SmtpTransport,
    from_address: String,
}

/// Service for sending match notification emails.
#[derive(Clone)]
pub struct MailService {
    sender: Option<Arc<Sender>>,
}

impl MailService {
    /// Build the service from config. Missing SMTP settings produce a
    /// disabled service rather than an error.
    pub fn from_config(config: &Config) -> Result<Self, MailError> {
        let Some(smtp) = &config.smtp else {
            tracing::warn!("SMTP not configured; match emails are disabled");
            return Ok(Self { sender: None });
        };

        let creds = Credentials::new(smtp.username.clone(), smtp.password.clone());
        let transport = SmtpTransport::relay(&smtp.host)
            .map_err(|e| MailError::Smtp(e.to_string()))?
            .credentials(creds)
            .build();

        tracing::info!(host = %smtp.host, "Mail service initialized");

        Ok(Self {
            sender: Some(Arc::new(Sender {
                transport,
                from_address: smtp.from_address.clone(),
            })),
        })
    }

    /// Disabled service for tests.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Send the giver their assignment, including the receiver's gift
    /// preferences and the exchange price range.
    pub async fn send_match_notification(
        &self,
        giver: &User,
        receiver: &User,
        price_range: &str,
    ) -> Result<(), MailError> {
        let sender = self.sender.as_ref().ok_or(MailError::Disabled)?.clone();

        let to_address = giver
            .email
            .clone()
            .ok_or_else(|| MailError::MissingAddress(giver.username.clone()))?;

        let email = Message::builder()
            .from(
                sender
                    .from_address
                    .parse()
                    .map_err(|e| MailError::Build(format!("invalid from address: {}", e)))?,
            )
            .to(to_address
                .parse()
                .map_err(|e| MailError::Build(format!("invalid to address: {}", e)))?)
            .subject("🎄 Your Secret Santa Match!")
            .header(ContentType::TEXT_HTML)
            .body(notification_body(giver, receiver, price_range))
            .map_err(|e| MailError::Build(e.to_string()))?;

        // SmtpTransport is blocking; keep it off the async runtime
        let result = tokio::task::spawn_blocking(move || sender.transport.send(&email))
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_address, "Match notification sent");
                Ok(())
            }
            Err(e) => Err(MailError::Smtp(e.to_string())),
        }
    }
}

/// HTML body revealing the assignment to the giver.
fn notification_body(giver: &User, receiver: &User, price_range: &str) -> String {
    let likes = join_or_none(&receiver.gift_preferences.likes);
    let dislikes = join_or_none(&receiver.gift_preferences.dislikes);

    format!(
        "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;\">\
           <h1 style=\"color: #c41e3a;\">Ho Ho Ho! 🎅</h1>\
           <p>Hello {giver}!</p>\
           <p>You have been matched with <strong>{receiver}</strong> for the Secret Santa gift exchange!</p>\
           <div style=\"background-color: #f8f8f8; padding: 15px; border-radius: 5px; margin: 20px 0;\">\
             <h2 style=\"color: #2e7d32; margin-top: 0;\">Their Gift Preferences:</h2>\
             <p><strong>Likes:</strong> {likes}</p>\
             <p><strong>Dislikes:</strong> {dislikes}</p>\
             <p><strong>Suggested price range:</strong> ${price_range}</p>\
           </div>\
           <p style=\"color: #666;\">Remember to keep it a secret! 🤫</p>\
           <p style=\"color: #c41e3a;\">Happy Christmas and good luck! 🎁</p>\
         </div>",
        giver = giver.username,
        receiver = receiver.username,
        likes = likes,
        dislikes = dislikes,
        price_range = price_range,
    )
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None listed".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GiftPreferences;

    fn user(name: &str, email: Option<&str>) -> User {
        User {
            id: 1,
            username: name.to_string(),
            email: email.map(String::from),
            password_hash: "x".to_string(),
            is_admin: false,
            ready: true,
            matched_with: None,
            gift_preferences: GiftPreferences {
                likes: vec!["tea".to_string()],
                dislikes: vec![],
            },
            created_at: String::new(),
        }
    }

    #[tokio::test]
    async fn test_disabled_service_reports_disabled() {
        let mail = MailService::disabled();
        let giver = user("alice", Some("alice@example.com"));
        let receiver = user("bob", None);

        let err = mail
            .send_match_notification(&giver, &receiver, "25-50")
            .await
            .unwrap_err();

        assert!(matches!(err, MailError::Disabled));
    }

    #[test]
    fn test_body_includes_preferences_and_price_range() {
        let giver = user("alice", Some("alice@example.com"));
        let receiver = user("bob", None);

        let body = notification_body(&giver, &receiver, "25-50");

        assert!(body.contains("bob"));
        assert!(body.contains("tea"));
        assert!(body.contains("None listed"));
        assert!(body.contains("$25-50"));
    }
}
