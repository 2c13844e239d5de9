use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::json;

use crate::error::AppError;
use crate::services::{http_client, Appointment, ConnectionTest, Contact, SmsSender};

pub const DEFAULT_SMS_API_URL: &str = "https://api.twilio.com/2010-04-01";
pub const DEFAULT_FROM_NUMBER: &str = "+49123456789";

static GERMAN_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+49|0)[0-9]{6,14}$").expect("phone pattern should compile"));

#[derive(Debug, Clone)]
pub struct SmsSettings {
    pub base_url: String,
    pub api_key: String,
    pub from_number: String,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
}

impl Default for SmsSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SMS_API_URL.to_string(),
            api_key: String::new(),
            from_number: DEFAULT_FROM_NUMBER.to_string(),
            account_sid: None,
            auth_token: None,
        }
    }
}

/// A canned SMS with `{placeholder}` variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmsTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub message: &'static str,
    pub variables: &'static [&'static str],
}

pub const SMS_TEMPLATES: &[SmsTemplate] = &[
    SmsTemplate {
        id: "white-paper-confirmation",
        name: "White Paper Confirmation",
        message: "Hi {firstName}! Your Financial Planning Guide has been sent to your email. Check your inbox and spam folder. Need help? Call us at +49 XXX XXX XXXX. - Financial Advisory Team",
        variables: &["firstName"],
    },
    SmsTemplate {
        id: "appointment-confirmation",
        name: "Appointment Confirmation",
        message: "Hi {firstName}! Your appointment is confirmed for {date} at {time}. Location: {location}. We'll send a calendar invite shortly. - Financial Advisory Team",
        variables: &["firstName", "date", "time", "location"],
    },
    SmsTemplate {
        id: "appointment-reminder",
        name: "Appointment Reminder",
        message: "Hi {firstName}! Reminder: Your appointment is tomorrow at {time}. Location: {location}. Need to reschedule? Call +49 XXX XXX XXXX. - Financial Advisory Team",
        variables: &["firstName", "time", "location"],
    },
    SmsTemplate {
        id: "follow-up",
        name: "Follow-up Message",
        message: "Hi {firstName}! How did you find our Financial Planning Guide? Ready to discuss your financial goals? Book a free consultation: +49 XXX XXX XXXX or reply BOOK to schedule. - Financial Advisory Team",
        variables: &["firstName"],
    },
];

pub fn find_template(id: &str) -> Option<&'static SmsTemplate> {
    SMS_TEMPLATES.iter().find(|template| template.id == id)
}

/// Fill a template's placeholders. Variables without a value stay as-is.
pub fn render_template(id: &str, values: &[(&str, &str)]) -> Option<String> {
    let template = find_template(id)?;
    let mut message = template.message.to_string();
    for (key, value) in values {
        message = message.replace(&format!("{{{}}}", key), value);
    }
    Some(message)
}

/// Basic validation for German numbers, ignoring whitespace.
pub fn validate_phone_number(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    GERMAN_PHONE.is_match(&compact)
}

/// Normalise a number to international form, assuming Germany.
pub fn format_phone_number(phone: &str) -> String {
    let mut formatted: String = phone.chars().filter(|c| !c.is_whitespace()).collect();

    if let Some(rest) = formatted.strip_prefix('0') {
        formatted = format!("+49{}", rest);
    }
    if !formatted.starts_with('+') {
        formatted = format!("+49{}", formatted);
    }

    formatted
}

/// Client for Twilio, or a generic bearer-token SMS API when no Twilio
/// credentials are configured.
#[derive(Clone)]
pub struct SmsClient {
    settings: SmsSettings,
    http: Client,
}

impl SmsClient {
    pub fn new(settings: SmsSettings) -> Self {
        Self {
            settings,
            http: http_client(),
        }
    }

    fn twilio_credentials(&self) -> Option<(&str, &str)> {
        match (&self.settings.account_sid, &self.settings.auth_token) {
            (Some(sid), Some(token)) => Some((sid.as_str(), token.as_str())),
            _ => None,
        }
    }

    pub fn uses_twilio(&self) -> bool {
        self.twilio_credentials().is_some()
    }

    pub async fn send_white_paper_confirmation(&self, contact: &Contact) -> bool {
        let message = render_template(
            "white-paper-confirmation",
            &[("firstName", contact.first_name.as_str())],
        )
        .unwrap_or_default();
        self.send(&contact.phone, &message).await
    }

    pub async fn send_appointment_confirmation(&self, contact: &Contact, appointment: &Appointment) -> bool {
        let message = render_template(
            "appointment-confirmation",
            &[
                ("firstName", contact.first_name.as_str()),
                ("date", appointment.date.as_str()),
                ("time", appointment.time.as_str()),
                ("location", appointment.location.as_str()),
            ],
        )
        .unwrap_or_default();
        self.send(&contact.phone, &message).await
    }

    pub async fn send_appointment_reminder(&self, contact: &Contact, appointment: &Appointment) -> bool {
        let message = render_template(
            "appointment-reminder",
            &[
                ("firstName", contact.first_name.as_str()),
                ("time", appointment.time.as_str()),
                ("location", appointment.location.as_str()),
            ],
        )
        .unwrap_or_default();
        self.send(&contact.phone, &message).await
    }

    pub async fn send_follow_up(&self, contact: &Contact) -> bool {
        let message =
            render_template("follow-up", &[("firstName", contact.first_name.as_str())]).unwrap_or_default();
        self.send(&contact.phone, &message).await
    }

    async fn send(&self, to: &str, message: &str) -> bool {
        let result = match self.twilio_credentials() {
            Some((sid, token)) => self.send_via_twilio(sid, token, to, message).await,
            None => self.send_via_generic_api(to, message).await,
        };

        match result {
            Ok(()) => {
                tracing::info!("SMS sent to {}", to);
                true
            }
            Err(err) => {
                tracing::error!("Failed to send SMS to {}: {}", to, err);
                false
            }
        }
    }

    async fn send_via_twilio(&self, sid: &str, token: &str, to: &str, message: &str) -> Result<(), AppError> {
        let url = format!("{}/Accounts/{}/Messages.json", self.settings.base_url, sid);
        let form = [
            ("To", to),
            ("From", self.settings.from_number.as_str()),
            ("Body", message),
        ];

        let response = self
            .http
            .post(&url)
            .basic_auth(sid, Some(token))
            .form(&form)
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        ensure_success(response.status(), "Twilio")
    }

    async fn send_via_generic_api(&self, to: &str, message: &str) -> Result<(), AppError> {
        let url = format!("{}/send", self.settings.base_url);
        let payload = json!({
            "to": to,
            "from": self.settings.from_number,
            "message": message,
            "api_key": self.settings.api_key,
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        ensure_success(response.status(), "SMS API")
    }

    async fn check_status(&self) -> Result<(), AppError> {
        let request = match self.twilio_credentials() {
            Some((sid, token)) => self
                .http
                .get(format!("{}/Accounts/{}.json", self.settings.base_url, sid))
                .basic_auth(sid, Some(token)),
            None => self
                .http
                .get(format!("{}/status", self.settings.base_url))
                .bearer_auth(&self.settings.api_key),
        };

        let response = request
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        ensure_success(response.status(), "SMS API")
    }
}

fn ensure_success(status: reqwest::StatusCode, provider: &str) -> Result<(), AppError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(AppError::Network(format!("{} returned HTTP {}", provider, status)))
    }
}

#[async_trait]
impl SmsSender for SmsClient {
    async fn send_confirmation(&self, contact: &Contact) -> bool {
        let mut recipient = contact.clone();
        recipient.phone = format_phone_number(&contact.phone);
        self.send_white_paper_confirmation(&recipient).await
    }
}

#[async_trait]
impl ConnectionTest for SmsClient {
    async fn test_connection(&self) -> bool {
        match self.check_status().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("SMS service connection test failed: {}", err);
                false
            }
        }
    }
}
