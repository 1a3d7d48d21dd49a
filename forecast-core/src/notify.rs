//! One-shot "app has been used" notification.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::MultiPart,
    transport::smtp::authentication::Credentials,
};
pub use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::{config::MailConfig, error::ForecastError, model::TemperatureUnit};

pub const SUBJECT: &str = "Weather app has been used";
const DEFAULT_RELAY: &str = "smtp.gmail.com";
const UNKNOWN_IP: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLocation {
    pub name: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub location: ReportLocation,
    pub temperature: i64,
    pub unit: TemperatureUnit,
}

/// Endpoint result; carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotifyStatus {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageNotification {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl UsageNotification {
    pub fn compose(report: &UsageReport, client_ip: &str, at: DateTime<Utc>) -> Self {
        let location = format!("{}, {}", report.location.name, report.location.country);
        let temperature = format!("{}{}", report.temperature, report.unit.symbol());
        let timestamp = at.format("%Y-%m-%d %H:%M:%S UTC");

        let text = format!(
            "Weather App Usage Notification\n\n\
             IP Address: {client_ip}\n\
             Location: {location}\n\
             Current Temperature: {temperature}\n\
             Timestamp: {timestamp}\n"
        );
        let html = format!(
            "<h2>Weather App Usage Notification</h2>\n\
             <p><strong>IP Address:</strong> {client_ip}</p>\n\
             <p><strong>Location:</strong> {location}</p>\n\
             <p><strong>Current Temperature:</strong> {temperature}</p>\n\
             <p><strong>Timestamp:</strong> {timestamp}</p>\n"
        );

        Self {
            subject: SUBJECT.to_string(),
            text,
            html,
        }
    }
}

/// Client IP from proxy headers: Cloudflare, then the first `x-forwarded-for`
/// hop, then `x-real-ip`.
pub fn client_ip(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("cf-connecting-ip")
        .or_else(|| {
            header("x-forwarded-for")
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .or_else(|| header("x-real-ip"))
        .unwrap_or(UNKNOWN_IP)
        .to_string()
}

#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    async fn deliver(&self, notification: &UsageNotification) -> Result<(), ForecastError>;
}

/// Sends the notification as a plain-text + HTML mail over SMTP.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    user: String,
    password: String,
    recipient: String,
    relay: String,
}

impl SmtpNotifier {
    /// `None` unless user, password and recipient are all configured.
    pub fn from_config(mail: &MailConfig) -> Option<Self> {
        if !mail.is_complete() {
            return None;
        }
        Some(Self {
            user: mail.user.clone()?,
            password: mail.app_password.clone()?,
            recipient: mail.recipient.clone()?,
            relay: mail
                .relay
                .clone()
                .unwrap_or_else(|| DEFAULT_RELAY.to_string()),
        })
    }

    /// Implicit-TLS relay transport; nothing is sent until a message is.
    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, ForecastError> {
        Ok(AsyncSmtpTransport::<Tokio1Executor>::relay(&self.relay)
            .map_err(|e| ForecastError::Notification(e.to_string()))?
            .credentials(Credentials::new(self.user.clone(), self.password.clone()))
            .build())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn deliver(&self, notification: &UsageNotification) -> Result<(), ForecastError> {
        let failed = |e: &dyn std::fmt::Display| ForecastError::Notification(e.to_string());

        let email = Message::builder()
            .from(self.user.parse().map_err(|e| failed(&e))?)
            .to(self.recipient.parse().map_err(|e| failed(&e))?)
            .subject(notification.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                notification.text.clone(),
                notification.html.clone(),
            ))
            .map_err(|e| failed(&e))?;

        self.transport()?
            .send(email)
            .await
            .map_err(|e| failed(&e))?;
        Ok(())
    }
}

/// Composes and delivers a usage notification. Failures are logged, never
/// propagated.
pub async fn handle_usage_report(
    notifier: &dyn Notifier,
    report: &UsageReport,
    headers: &HeaderMap,
    at: DateTime<Utc>,
) -> NotifyStatus {
    let ip = client_ip(headers);
    let notification = UsageNotification::compose(report, &ip, at);

    match notifier.deliver(&notification).await {
        Ok(()) => {
            tracing::info!(ip = %ip, "usage notification sent");
            NotifyStatus { success: true }
        }
        Err(err) => {
            tracing::error!(error = %err, "usage notification failed");
            NotifyStatus { success: false }
        }
    }
}
