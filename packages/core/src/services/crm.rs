use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::services::{http_client, ConnectionTest, Contact, CrmGateway};

pub const DEFAULT_CRM_API_URL: &str = "https://api.hubapi.com";

#[derive(Debug, Clone)]
pub struct CrmSettings {
    pub base_url: String,
    pub api_key: String,
}

impl Default for CrmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CRM_API_URL.to_string(),
            api_key: String::new(),
        }
    }
}

/// Object reference returned by the CRM's create/upsert endpoints.
#[derive(Debug, Deserialize)]
pub struct CrmObject {
    pub id: String,
}

/// Client for a HubSpot-compatible CRM API.
#[derive(Clone)]
pub struct CrmClient {
    settings: CrmSettings,
    http: Client,
}

impl CrmClient {
    pub fn new(settings: CrmSettings) -> Self {
        Self {
            settings,
            http: http_client(),
        }
    }

    async fn post_object(&self, url: &str, body: serde_json::Value) -> Result<CrmObject, AppError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "CRM returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<CrmObject>()
            .await
            .map_err(|err| AppError::Parse(err.to_string()))
    }

    async fn upsert(&self, contact: &Contact) -> Result<CrmObject, AppError> {
        let url = format!("{}/crm/v3/objects/contacts/upsert", self.settings.base_url);
        let body = json!({
            "properties": {
                "email": contact.email,
                "firstname": contact.first_name,
                "phone": contact.phone,
                "company": contact.company.as_deref().unwrap_or("Individual"),
                "jobtitle": contact.job_title.as_deref().unwrap_or("Professional"),
                "industry": "Financial Services",
                "lead_status": "NEW",
                "lifecycle_stage": "lead",
                "source": "Website White Paper",
                "hs_lead_status": "NEW",
                "hs_lifecycle_stage": "lead",
            }
        });
        self.post_object(&url, body).await
    }

    async fn create_deal_object(&self, deal_name: &str, amount: u64) -> Result<CrmObject, AppError> {
        let url = format!("{}/crm/v3/objects/deals", self.settings.base_url);
        let body = json!({
            "properties": {
                "dealname": deal_name,
                "amount": amount.to_string(),
                "dealstage": "appointmentscheduled",
                "pipeline": "default",
                "hs_lead_status": "NEW",
                "hs_deal_stage_probability": "0.5",
            }
        });
        self.post_object(&url, body).await
    }

    async fn associate_deal(&self, deal_id: &str, contact_email: &str) -> Result<(), AppError> {
        let url = format!(
            "{}/crm/v3/objects/deals/{}/associations/contacts",
            self.settings.base_url, deal_id
        );
        let body = json!({
            "inputs": [{
                "from": { "id": deal_id },
                "to": { "id": contact_email },
                "types": [{ "associationCategory": "HUBSPOT_DEFINED", "associationTypeId": 4 }],
            }]
        });

        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| AppError::Network(err.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "CRM returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Add a contact to a static list.
    pub async fn add_to_list(&self, contact_email: &str, list_id: &str) -> bool {
        let url = format!("{}/contacts/v1/lists/{}/add", self.settings.base_url, list_id);
        let body = json!({ "vids": [contact_email], "emails": [contact_email] });

        let result = self
            .http
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::error!("Failed to add {} to list {}: {}", contact_email, list_id, err);
                false
            }
        }
    }
}

#[async_trait]
impl CrmGateway for CrmClient {
    async fn upsert_contact(&self, contact: &Contact) -> bool {
        match self.upsert(contact).await {
            Ok(object) => {
                tracing::info!("CRM contact {} upserted for {}", object.id, contact.email);
                true
            }
            Err(err) => {
                tracing::error!("Failed to upsert CRM contact {}: {}", contact.email, err);
                false
            }
        }
    }

    async fn create_deal(&self, contact: &Contact, deal_name: &str, amount: u64) -> bool {
        let deal = match self.create_deal_object(deal_name, amount).await {
            Ok(deal) => deal,
            Err(err) => {
                tracing::error!("Failed to create deal '{}': {}", deal_name, err);
                return false;
            }
        };

        if let Err(err) = self.associate_deal(&deal.id, &contact.email).await {
            tracing::error!(
                "Failed to associate deal {} with {}: {}",
                deal.id,
                contact.email,
                err
            );
        }

        true
    }
}

#[async_trait]
impl ConnectionTest for CrmClient {
    async fn test_connection(&self) -> bool {
        let url = format!("{}/crm/v3/objects/contacts", self.settings.base_url);
        match self
            .http
            .get(&url)
            .bearer_auth(&self.settings.api_key)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                tracing::warn!("CRM connection test failed: {}", err);
                false
            }
        }
    }
}
