//! Weather Underground adapter
//!
//! Readings are sent as a GET query string. The body is a single line:
//! `success`, or an upper-case error code followed by `|` and a message.

use super::{FieldRule, HttpMethod, ProviderAdapter, ResponseScan, IMPERIAL_FIELDS};
use crate::types::{ProviderId, PushPayload, StationCredentials};

pub const WUNDERGROUND_ENDPOINT: &str =
    "https://weatherstation.wunderground.com/weatherstation/updateweatherstation.php";

#[derive(Debug, Clone)]
pub struct WundergroundAdapter {
    endpoint: String,
}

impl Default for WundergroundAdapter {
    fn default() -> Self {
        Self::with_endpoint(WUNDERGROUND_ENDPOINT)
    }
}

impl WundergroundAdapter {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl ProviderAdapter for WundergroundAdapter {
    fn provider(&self) -> ProviderId {
        ProviderId::Wunderground
    }

    fn field_map(&self) -> &'static [FieldRule] {
        IMPERIAL_FIELDS
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn method(&self) -> HttpMethod {
        HttpMethod::GetQuery
    }

    fn complete(&self, payload: &mut PushPayload, station: &StationCredentials, signature: &str) {
        payload.insert("ID", station.username.trim());
        payload.insert("PASSWORD", station.password.trim());
        payload.insert("softwaretype", signature);
        payload.insert("action", "updateraw");
    }

    fn parse_error(&self, body: &str) -> ResponseScan {
        let line = body.trim();
        if line.is_empty() || line.eq_ignore_ascii_case("success") {
            return ResponseScan::Accepted;
        }
        match line.split_once('|') {
            Some((code, message))
                if !code.is_empty()
                    && code
                        .chars()
                        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') =>
            {
                let message = message.trim();
                if message.is_empty() {
                    ResponseScan::Rejected(code.to_string())
                } else {
                    ResponseScan::Rejected(message.to_string())
                }
            }
            _ => ResponseScan::Unrecognized(format!("unexpected response: {}", line)),
        }
    }
}
