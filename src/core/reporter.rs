//! Report rendering and delivery
//!
//! A stored record is rendered into a plain-text report and handed to a
//! `Mailer`. Delivery failures come back as MAIL_xxx errors; they never touch
//! classification or the store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::models::config::MailConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{ReadingRecord, SensorField};
use crate::utils::constants::USER_AGENT;

/// Outgoing report message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Mail transport abstraction
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message
    async fn send(&self, message: &EmailMessage) -> AppResult<()>;

    /// Short transport name for logs and responses
    fn name(&self) -> &'static str;
}

/// Writes reports to the log instead of sending them
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "📧 Mail relay not configured, report logged only\n{}",
            message.text
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Posts messages as JSON to an HTTP mail relay
pub struct RelayMailer {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl RelayMailer {
    /// Relay URL must be absolute http(s)
    pub fn new(url: impl Into<String>, token: Option<String>, timeout: Duration) -> AppResult<Self> {
        let url = url.into();
        match reqwest::Url::parse(&url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => return Err(AppError::invalid_config("MAIL_RELAY_URL", &url)),
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, url, token })
    }

    /// Relay URL with any query string removed, safe to log
    pub fn masked_url(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        let mut request = self.client.post(&self.url).json(message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            warn!(relay = %self.masked_url(), error = %e, "Mail relay request failed");
            AppError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::mail_rejected(status.as_u16(), body));
        }

        info!(to = %message.to, relay = %self.masked_url(), "📧 Report delivered to mail relay");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "relay"
    }
}

/// Pick the transport for a configuration
pub fn mailer_from_config(config: &MailConfig) -> AppResult<Arc<dyn Mailer>> {
    match &config.relay_url {
        Some(url) => Ok(Arc::new(RelayMailer::new(
            url.clone(),
            config.relay_token.clone(),
            config.timeout,
        )?)),
        None => Ok(Arc::new(LogMailer)),
    }
}

/// Render a record as a plain-text report
pub fn render_report(record: &ReadingRecord) -> String {
    let reading = &record.reading;
    let assessment = &record.assessment;
    let mark = |field: SensorField| if reading.is_synthesized(field) { " (estimated)" } else { "" };

    let elements = if assessment.elements.is_empty() {
        "none".to_string()
    } else {
        let names: Vec<&str> = assessment.elements.iter().map(|e| e.name()).collect();
        names.join(", ")
    };
    let treatments: String = assessment
        .treatments
        .iter()
        .map(|t| format!("  - {}\n", t))
        .collect();

    format!(
        "Water Quality Report\n\
         ====================\n\
         Location:  {location}\n\
         Timestamp: {timestamp}\n\
         Record ID: {id}\n\
         \n\
         Readings\n\
         \x20 pH:       {ph:.2}{ph_mark}\n\
         \x20 TDS:      {tds:.1} mg/L\n\
         \x20 Hardness: {hardness:.1} mg/L{hardness_mark}\n\
         \x20 Nitrate:  {nitrate:.1} mg/L{nitrate_mark}\n\
         \n\
         Risk score: {score:.1} / 100\n\
         Status:     {status}\n\
         Predicted elements: {elements}\n\
         Recommended treatment:\n\
         {treatments}",
        location = reading.location,
        timestamp = reading.timestamp.to_rfc3339(),
        id = record.id,
        ph = reading.ph,
        ph_mark = mark(SensorField::Ph),
        tds = reading.tds,
        hardness = reading.hardness,
        hardness_mark = mark(SensorField::Hardness),
        nitrate = reading.nitrate,
        nitrate_mark = mark(SensorField::Nitrate),
        score = assessment.risk_score,
        status = assessment.status.as_str(),
        elements = elements,
        treatments = treatments,
    )
}

/// Subject line for a record
pub fn report_subject(record: &ReadingRecord) -> String {
    format!(
        "Water quality report: {} ({})",
        record.reading.location,
        record.assessment.status.as_str()
    )
}

/// Renders records and sends them through a mailer
pub struct Reporter {
    mailer: Arc<dyn Mailer>,
    from: String,
    default_recipient: Option<String>,
}

impl Reporter {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>, default_recipient: Option<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
            default_recipient,
        }
    }

    pub fn from_config(config: &MailConfig) -> AppResult<Self> {
        Ok(Self::new(
            mailer_from_config(config)?,
            config.from.clone(),
            config.default_recipient.clone(),
        ))
    }

    pub fn transport(&self) -> &'static str {
        self.mailer.name()
    }

    /// Build the message for a record without sending it
    pub fn compose(&self, record: &ReadingRecord, recipient: Option<&str>) -> AppResult<EmailMessage> {
        let to = recipient
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .or_else(|| self.default_recipient.clone())
            .ok_or_else(AppError::missing_recipient)?;

        Ok(EmailMessage {
            from: self.from.clone(),
            to,
            subject: report_subject(record),
            text: render_report(record),
        })
    }

    /// Render and deliver a report, returning the message that was sent
    pub async fn send_report(&self, record: &ReadingRecord, recipient: Option<&str>) -> AppResult<EmailMessage> {
        let message = self.compose(record, recipient)?;
        self.mailer.send(&message).await?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::classify;
    use crate::models::errors::ErrorCode;
    use crate::models::types::Reading;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> AppResult<()> {
            if self.fail {
                return Err(AppError::mail_transport("relay down"));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    fn record() -> ReadingRecord {
        let mut reading = Reading::new("river-bend", 6.0, 300.0, 250.0, 20.0);
        reading.synthesized = vec![SensorField::Nitrate];
        let assessment = classify(reading.ph, reading.tds, reading.hardness, reading.nitrate).unwrap();
        ReadingRecord::new(reading, assessment)
    }

    #[test]
    fn test_render_report() {
        let text = render_report(&record());
        assert!(text.contains("Location:  river-bend"));
        assert!(text.contains("Status:     MODERATE"));
        assert!(text.contains("Predicted elements: Uranium"));
        assert!(text.contains("Nitrate:  20.0 mg/L (estimated)"));
        assert!(text.contains("Reverse osmosis"));
    }

    #[test]
    fn test_render_report_layout() {
        let reading = Reading::new("well-2", 7.0, 200.0, 100.0, 10.0);
        let assessment = classify(7.0, 200.0, 100.0, 10.0).unwrap();
        let text = render_report(&ReadingRecord::new(reading, assessment));

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Water Quality Report");
        assert_eq!(lines[5], "");
        assert_eq!(lines[6], "Readings");
        assert_eq!(lines[7], "  pH:       7.00");
        assert_eq!(lines[8], "  TDS:      200.0 mg/L");
        assert_eq!(lines[12], "Risk score: 0.0 / 100");
        assert_eq!(lines[13], "Status:     SAFE");
        assert_eq!(lines[14], "Predicted elements: none");
        assert_eq!(lines[15], "Recommended treatment:");
        assert_eq!(lines[16], "  - No treatment required");
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_subject() {
        assert_eq!(report_subject(&record()), "Water quality report: river-bend (MODERATE)");
    }

    #[tokio::test]
    async fn test_send_report_uses_default_recipient() {
        let mailer = Arc::new(RecordingMailer::default());
        let reporter = Reporter::new(mailer.clone(), "sentry@example.org", Some("ops@example.org".into()));

        let message = reporter.send_report(&record(), None).await.unwrap();
        assert_eq!(message.to, "ops@example.org");
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_explicit_recipient_wins() {
        let mailer = Arc::new(RecordingMailer::default());
        let reporter = Reporter::new(mailer.clone(), "sentry@example.org", Some("ops@example.org".into()));

        let message = reporter.send_report(&record(), Some("lab@example.org")).await.unwrap();
        assert_eq!(message.to, "lab@example.org");
    }

    #[tokio::test]
    async fn test_missing_recipient() {
        let reporter = Reporter::new(Arc::new(LogMailer), "sentry@example.org", None);
        let err = reporter.send_report(&record(), Some("  ")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMissingRecipient);
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces() {
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..Default::default()
        });
        let reporter = Reporter::new(mailer, "sentry@example.org", Some("ops@example.org".into()));
        let err = reporter.send_report(&record(), None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MailTransportFailed);
    }

    #[test]
    fn test_mailer_selection() {
        let config = MailConfig::default();
        assert_eq!(mailer_from_config(&config).unwrap().name(), "log");

        let config = MailConfig {
            relay_url: Some("http://127.0.0.1:9/send?key=secret".into()),
            ..Default::default()
        };
        assert_eq!(mailer_from_config(&config).unwrap().name(), "relay");
    }

    #[test]
    fn test_relay_url_must_be_http() {
        for url in ["relay.local/send", "ftp://relay.local/send", ""] {
            let err = RelayMailer::new(url, None, Duration::from_secs(1)).err().unwrap();
            assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
            assert!(err.message.contains("MAIL_RELAY_URL"));
        }

        let config = MailConfig {
            relay_url: Some("not a url".into()),
            ..Default::default()
        };
        assert!(Reporter::from_config(&config).is_err());
    }

    #[test]
    fn test_masked_url() {
        let mailer = RelayMailer::new("http://relay.local/send?key=secret", None, Duration::from_secs(1)).unwrap();
        assert_eq!(mailer.masked_url(), "http://relay.local/send");
    }
}
