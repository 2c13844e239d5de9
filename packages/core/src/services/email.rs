use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::error::AppError;
use crate::services::{http_client, Appointment, ConnectionTest, Contact, EmailSender};

pub const DEFAULT_EMAIL_API_URL: &str = "https://api.sendgrid.com/v3";
pub const DEFAULT_FROM_EMAIL: &str = "noreply@financialfirm.de";
pub const DEFAULT_FROM_NAME: &str = "Financial Advisory Team";

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub base_url: String,
    pub api_key: String,
    pub from_email: String,
    pub from_name: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EMAIL_API_URL.to_string(),
            api_key: String::new(),
            from_email: DEFAULT_FROM_EMAIL.to_string(),
            from_name: DEFAULT_FROM_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailTemplate {
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Client for a SendGrid-compatible transactional mail API.
#[derive(Clone)]
pub struct EmailClient {
    settings: EmailSettings,
    http: Client,
}

impl EmailClient {
    pub fn new(settings: EmailSettings) -> Self {
        Self {
            settings,
            http: http_client(),
        }
    }

    pub async fn send_white_paper(&self, contact: &Contact) -> bool {
        let template = white_paper_template(contact);
        match self.deliver(contact, &template).await {
            Ok(()) => {
                tracing::info!("White paper email sent to {}", contact.email);
                true
            }
            Err(err) => {
                tracing::error!("Failed to send white paper email to {}: {}", contact.email, err);
                false
            }
        }
    }

    pub async fn send_appointment_email(&self, contact: &Contact, appointment: &Appointment) -> bool {
        let template = appointment_template(contact, appointment);
        match self.deliver(contact, &template).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!("Failed to send appointment email to {}: {}", contact.email, err);
                false
            }
        }
    }

    async fn deliver(&self, contact: &Contact, template: &EmailTemplate) -> Result<(), AppError> {
        let url = format!("{}/mail/send", self.settings.base_url);
        let payload = json!({
            "personalizations": [{
                "to": [{ "email": contact.email, "name": contact.first_name }],
                "subject": template.subject,
            }],
            "from": {
                "email": self.settings.from_email,
                "name": self.settings.from_name,
            },
            "content": [
                { "type": "text/html", "value": template.html_body },
                { "type": "text/plain", "value": template.text_body },
            ],
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "Mail API returned HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }

    async fn check_profile(&self) -> Result<(), AppError> {
        let url = format!("{}/user/profile", self.settings.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.settings.api_key)
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "Mail API returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl EmailSender for EmailClient {
    async fn send_white_paper_email(&self, contact: &Contact) -> bool {
        self.send_white_paper(contact).await
    }
}

#[async_trait]
impl ConnectionTest for EmailClient {
    async fn test_connection(&self) -> bool {
        match self.check_profile().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("Email service connection test failed: {}", err);
                false
            }
        }
    }
}

pub fn white_paper_template(contact: &Contact) -> EmailTemplate {
    let name = &contact.first_name;
    let subject = format!("Your Financial Planning Guide is Ready, {}!", name);

    let html_body = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Financial Planning Guide</title></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <h1>Your Financial Planning Guide</h1>
  <p>Exclusively prepared for {name}</p>
  <h2>Dear {name},</h2>
  <p>Thank you for requesting our comprehensive <strong>Financial Planning Guide for Young Professionals</strong>!</p>
  <h3>What's Inside Your Guide:</h3>
  <ul>
    <li>The biggest financial misconceptions young professionals make</li>
    <li>5 strategies for smart protection &amp; wealth creation</li>
    <li>Bonus: Checklist for your financial start in 2025</li>
  </ul>
  <p><strong>Next Steps:</strong></p>
  <ol>
    <li>Download and read your white paper</li>
    <li>Complete the action items in the guide</li>
    <li>Book a free 30-minute consultation with our experts</li>
    <li>Start building your financial future today!</li>
  </ol>
  <p>Best regards,<br><strong>{team}</strong><br>info@financialfirm.de</p>
</body>
</html>"#,
        name = name,
        team = DEFAULT_FROM_NAME,
    );

    let text_body = format!(
        "Your Financial Planning Guide is Ready, {name}!\n\n\
         Dear {name},\n\n\
         Thank you for requesting our comprehensive Financial Planning Guide for Young Professionals!\n\n\
         What's Inside Your Guide:\n\
         - The biggest financial misconceptions young professionals make\n\
         - 5 strategies for smart protection & wealth creation\n\
         - Bonus: Checklist for your financial start in 2025\n\n\
         Next Steps:\n\
         1. Download and read your white paper\n\
         2. Complete the action items in the guide\n\
         3. Book a free 30-minute consultation with our experts\n\
         4. Start building your financial future today!\n\n\
         Best regards,\n{team}\n",
        name = name,
        team = DEFAULT_FROM_NAME,
    );

    EmailTemplate {
        subject,
        html_body,
        text_body,
    }
}

pub fn appointment_template(contact: &Contact, appointment: &Appointment) -> EmailTemplate {
    let subject = format!("Appointment Confirmed - {}", appointment.date);
    let html_body = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Appointment Confirmation</title></head>\n<body>\n\
         <h2>Appointment Confirmed</h2>\n<p>Dear {},</p>\n\
         <p>Your appointment has been confirmed for {} at {}.</p>\n<p>Location: {}</p>\n\
         <p>We look forward to meeting with you!</p>\n</body>\n</html>",
        contact.first_name, appointment.date, appointment.time, appointment.location
    );
    let text_body = format!(
        "Appointment Confirmed\n\nDear {},\n\nYour appointment has been confirmed for {} at {}.\n\n\
         Location: {}\n\nWe look forward to meeting with you!\n",
        contact.first_name, appointment.date, appointment.time, appointment.location
    );

    EmailTemplate {
        subject,
        html_body,
        text_body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_string_contains, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn contact() -> Contact {
        Contact::new("Anna", "anna@example.com", "+4915112345678")
    }

    fn client_for(server: &MockServer) -> EmailClient {
        EmailClient::new(EmailSettings {
            base_url: server.uri(),
            api_key: "test-key".to_string(),
            ..EmailSettings::default()
        })
    }

    #[test]
    fn white_paper_template_is_personalised() {
        let template = white_paper_template(&contact());
        assert_eq!(template.subject, "Your Financial Planning Guide is Ready, Anna!");
        assert!(template.html_body.contains("Dear Anna,"));
        assert!(template.text_body.contains("Dear Anna,"));
    }

    #[test]
    fn appointment_subject_names_the_date() {
        let appointment = Appointment {
            date: "2025-05-02".into(),
            time: "10:00".into(),
            location: "Berlin".into(),
        };
        let template = appointment_template(&contact(), &appointment);
        assert_eq!(template.subject, "Appointment Confirmed - 2025-05-02");
        assert!(template.text_body.contains("Location: Berlin"));
    }

    #[tokio::test]
    async fn send_white_paper_posts_to_mail_send() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mail/send"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_string_contains("anna@example.com"))
            .and(body_string_contains("Your Financial Planning Guide is Ready, Anna!"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client_for(&server).send_white_paper_email(&contact()).await);
    }

    #[tokio::test]
    async fn non_success_status_degrades_to_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mail/send"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        assert!(!client_for(&server).send_white_paper_email(&contact()).await);
    }

    #[tokio::test]
    async fn unreachable_host_degrades_to_false() {
        let client = EmailClient::new(EmailSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            ..EmailSettings::default()
        });
        assert!(!client.send_white_paper_email(&contact()).await);
        assert!(!client.test_connection().await);
    }

    #[tokio::test]
    async fn test_connection_reads_user_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        assert!(client_for(&server).test_connection().await);
    }
}
