//! Request bodies as they arrive on the wire.
//!
//! Everything is optional and enumerations are plain strings so that the
//! validator can report every problem at once instead of failing on the first
//! unknown value.

use serde::Deserialize;

use super::ContactInfo;

/// Body of a create or update request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemePayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub eligibility: Option<EligibilityPayload>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub benefits: Option<Vec<String>>,
    #[serde(default)]
    pub documents: Option<Vec<String>>,
    #[serde(default)]
    pub application_process: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub government_body: Option<String>,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
    #[serde(default)]
    pub budget: Option<BudgetPayload>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityPayload {
    #[serde(default)]
    pub age: Option<RangePayload>,
    #[serde(default)]
    pub income: Option<RangePayload>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub other_requirements: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RangePayload {
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BudgetPayload {
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Body of a chatbot message.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: String,
}
