//! Third-party service clients used by the lead pipeline.
//!
//! Every public capability is best effort: failures (non-2xx, transport
//! errors, undecodable bodies) are logged at the call site and reported to
//! the caller as `false`. Nothing here propagates an error upward.

pub mod crm;
pub mod email;
pub mod sms;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Upper bound on any single outbound request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client shared by the service clients' constructors.
pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!("Falling back to default HTTP client: {}", err);
            Client::new()
        })
}

/// A lead as captured by the site's form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub first_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
}

impl Contact {
    pub fn new(
        first_name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            email: email.into(),
            phone: phone.into(),
            company: None,
            job_title: None,
        }
    }
}

/// A booked consultation, used by the appointment email and SMS templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub date: String,
    pub time: String,
    pub location: String,
}

#[async_trait]
pub trait EmailSender {
    async fn send_white_paper_email(&self, contact: &Contact) -> bool;
}

#[async_trait]
pub trait SmsSender {
    async fn send_confirmation(&self, contact: &Contact) -> bool;
}

#[async_trait]
pub trait CrmGateway {
    async fn upsert_contact(&self, contact: &Contact) -> bool;

    async fn create_deal(&self, contact: &Contact, deal_name: &str, amount: u64) -> bool;
}

/// Anything that can report whether its remote end is reachable.
#[async_trait]
pub trait ConnectionTest {
    async fn test_connection(&self) -> bool;
}
