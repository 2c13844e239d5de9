//! Lead-form submission pipeline.
//!
//! Chains the third-party services for one white-paper request:
//! 1. Upsert the contact in the CRM
//! 2. Send the white-paper email
//! 3. Send the SMS confirmation
//! 4. Create a follow-up deal, only if the email went out
//!
//! Each step is best effort. The submission counts as successful when
//! both the email and the SMS were delivered.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::metrics::AppMetrics;
use crate::services::sms::validate_phone_number;
use crate::services::{Contact, CrmGateway, EmailSender, SmsSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Success,
    Error,
}

/// What happened to one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadOutcome {
    pub contact_saved: bool,
    pub email_sent: bool,
    pub sms_sent: bool,
    pub deal_created: bool,
    pub status: SendStatus,
}

pub struct LeadPipeline {
    email: Arc<dyn EmailSender + Send + Sync>,
    sms: Arc<dyn SmsSender + Send + Sync>,
    crm: Arc<dyn CrmGateway + Send + Sync>,
    metrics: Option<Arc<AppMetrics>>,
}

impl LeadPipeline {
    pub fn new(
        email: Arc<dyn EmailSender + Send + Sync>,
        sms: Arc<dyn SmsSender + Send + Sync>,
        crm: Arc<dyn CrmGateway + Send + Sync>,
    ) -> Self {
        Self {
            email,
            sms,
            crm,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<AppMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Process one submission. Never fails; see [`LeadOutcome::status`].
    pub async fn submit(&self, contact: &Contact) -> LeadOutcome {
        tracing::info!("Processing white paper request for {}", contact.email);

        let contact_saved = self.crm.upsert_contact(contact).await;
        let email_sent = self.email.send_white_paper_email(contact).await;
        let sms_sent = self.sms.send_confirmation(contact).await;

        let deal_created = if email_sent {
            let deal_name = format!("White Paper Request - {}", contact.first_name);
            self.crm.create_deal(contact, &deal_name, 0).await
        } else {
            false
        };

        let status = if email_sent && sms_sent {
            SendStatus::Success
        } else {
            tracing::warn!(
                "White paper request for {} incomplete (email: {}, sms: {})",
                contact.email,
                email_sent,
                sms_sent
            );
            SendStatus::Error
        };

        if let Some(metrics) = &self.metrics {
            let label = match status {
                SendStatus::Success => "success",
                SendStatus::Error => "error",
            };
            metrics.leads_total.with_label_values(&[label]).inc();
        }

        LeadOutcome {
            contact_saved,
            email_sent,
            sms_sent,
            deal_created,
            status,
        }
    }
}

/// Reject submissions with a blank required field, a malformed email or a
/// phone number that is not a German number.
pub fn validate_contact(contact: &Contact) -> Result<(), AppError> {
    let required = [
        ("first_name", &contact.first_name),
        ("email", &contact.email),
        ("phone", &contact.phone),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{} is required", field)));
        }
    }
    if !contact.email.contains('@') {
        return Err(AppError::Validation("email is invalid".to_string()));
    }
    if !validate_phone_number(&contact.phone) {
        return Err(AppError::Validation("phone is invalid".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    /// Records every call and answers with a fixed result.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        email_ok: bool,
        sms_ok: bool,
    }

    impl Recorder {
        fn new(email_ok: bool, sms_ok: bool) -> Arc<Self> {
            Arc::new(Self {
                email_ok,
                sms_ok,
                ..Self::default()
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn log(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl EmailSender for Recorder {
        async fn send_white_paper_email(&self, contact: &Contact) -> bool {
            self.log(format!("email:{}", contact.email));
            self.email_ok
        }
    }

    #[async_trait]
    impl SmsSender for Recorder {
        async fn send_confirmation(&self, contact: &Contact) -> bool {
            self.log(format!("sms:{}", contact.phone));
            self.sms_ok
        }
    }

    #[async_trait]
    impl CrmGateway for Recorder {
        async fn upsert_contact(&self, contact: &Contact) -> bool {
            self.log(format!("upsert:{}", contact.email));
            true
        }

        async fn create_deal(&self, _contact: &Contact, deal_name: &str, amount: u64) -> bool {
            self.log(format!("deal:{}:{}", deal_name, amount));
            true
        }
    }

    fn pipeline(recorder: &Arc<Recorder>) -> LeadPipeline {
        LeadPipeline::new(recorder.clone(), recorder.clone(), recorder.clone())
    }

    fn contact() -> Contact {
        Contact::new("Mia", "mia@example.com", "015112345678")
    }

    #[tokio::test]
    async fn successful_submission_runs_every_step_in_order() {
        let recorder = Recorder::new(true, true);

        let outcome = pipeline(&recorder).submit(&contact()).await;

        assert_eq!(
            outcome,
            LeadOutcome {
                contact_saved: true,
                email_sent: true,
                sms_sent: true,
                deal_created: true,
                status: SendStatus::Success,
            }
        );
        assert_eq!(
            recorder.calls(),
            vec![
                "upsert:mia@example.com",
                "email:mia@example.com",
                "sms:015112345678",
                "deal:White Paper Request - Mia:0",
            ]
        );
    }

    #[tokio::test]
    async fn failed_email_skips_deal_and_reports_error() {
        let recorder = Recorder::new(false, true);

        let outcome = pipeline(&recorder).submit(&contact()).await;

        assert_eq!(outcome.status, SendStatus::Error);
        assert!(!outcome.deal_created);
        assert!(outcome.sms_sent);
        assert!(!recorder.calls().iter().any(|c| c.starts_with("deal:")));
    }

    #[tokio::test]
    async fn failed_sms_still_creates_deal_but_reports_error() {
        let recorder = Recorder::new(true, false);
        let metrics = Arc::new(AppMetrics::new().unwrap());

        let outcome = pipeline(&recorder)
            .with_metrics(metrics.clone())
            .submit(&contact())
            .await;

        assert_eq!(outcome.status, SendStatus::Error);
        assert!(outcome.deal_created);
        assert!((metrics.leads_total.with_label_values(&["error"]).get() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_contact_requires_every_field() {
        assert!(validate_contact(&contact()).is_ok());

        let mut blank_name = contact();
        blank_name.first_name = "  ".into();
        assert!(matches!(validate_contact(&blank_name), Err(AppError::Validation(_))));

        let mut bad_email = contact();
        bad_email.email = "not-an-email".into();
        assert!(matches!(validate_contact(&bad_email), Err(AppError::Validation(_))));

        let mut no_phone = contact();
        no_phone.phone = String::new();
        assert!(matches!(validate_contact(&no_phone), Err(AppError::Validation(_))));
    }

    #[test]
    fn validate_contact_rejects_non_german_phone_numbers() {
        let mut spaced = contact();
        spaced.phone = "0151 2345 6789".into();
        assert!(validate_contact(&spaced).is_ok());

        let mut international = contact();
        international.phone = "+4915112345678".into();
        assert!(validate_contact(&international).is_ok());

        for bad in ["12345", "+1 555 0100 200", "0151-abc-6789"] {
            let mut invalid = contact();
            invalid.phone = bad.into();
            match validate_contact(&invalid) {
                Err(AppError::Validation(msg)) => assert_eq!(msg, "phone is invalid", "{bad}"),
                other => panic!("{bad}: expected phone rejection, got {other:?}"),
            }
        }
    }
}
