//! WOW Met Office adapter
//!
//! Posts form-encoded automatic readings. The site id and authentication key
//! travel inside the payload; refusals come back as a JSON `errorMessage`.

use super::{scan_json_error, FieldRule, ProviderAdapter, ResponseScan, IMPERIAL_FIELDS};
use crate::types::{ProviderId, PushPayload, StationCredentials};

pub const WOW_ENDPOINT: &str = "http://wow.metoffice.gov.uk/automaticreading";

/// WOW Met Office adapter
#[derive(Debug, Clone)]
pub struct WowAdapter {
    endpoint: String,
}

impl Default for WowAdapter {
    fn default() -> Self {
        Self::with_endpoint(WOW_ENDPOINT)
    }
}

impl WowAdapter {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl ProviderAdapter for WowAdapter {
    fn provider(&self) -> ProviderId {
        ProviderId::Wow
    }

    fn field_map(&self) -> &'static [FieldRule] {
        IMPERIAL_FIELDS
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn complete(&self, payload: &mut PushPayload, station: &StationCredentials, signature: &str) {
        payload.insert("siteid", station.username.trim());
        payload.insert("siteAuthenticationKey", station.password.trim());
        payload.insert("softwaretype", signature);
    }

    fn parse_error(&self, body: &str) -> ResponseScan {
        scan_json_error(body, "errorMessage")
    }
}
