//! PWS Weather adapter
//!
//! Speaks the Weather Underground upload protocol over a form POST. The
//! service answers with a short HTML page; problems are reported on a line
//! containing `ERROR`.

use super::{FieldRule, ProviderAdapter, ResponseScan, IMPERIAL_FIELDS};
use crate::types::{ProviderId, PushPayload, StationCredentials};

pub const PWS_ENDPOINT: &str = "http://www.pwsweather.com/pwsupdate/pwsupdate.php";

#[derive(Debug, Clone)]
pub struct PwsWeatherAdapter {
    endpoint: String,
}

impl Default for PwsWeatherAdapter {
    fn default() -> Self {
        Self::with_endpoint(PWS_ENDPOINT)
    }
}

impl PwsWeatherAdapter {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl ProviderAdapter for PwsWeatherAdapter {
    fn provider(&self) -> ProviderId {
        ProviderId::Pws
    }

    fn field_map(&self) -> &'static [FieldRule] {
        IMPERIAL_FIELDS
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn complete(&self, payload: &mut PushPayload, station: &StationCredentials, signature: &str) {
        payload.insert("ID", station.username.trim());
        payload.insert("PASSWORD", station.password.trim());
        payload.insert("softwaretype", signature);
        payload.insert("action", "updateraw");
    }

    fn parse_error(&self, body: &str) -> ResponseScan {
        let line = body.lines().map(str::trim).find(|l| l.contains("ERROR"));
        match line {
            Some(line) => {
                let message = match line.split_once("ERROR:") {
                    Some((_, rest)) => rest,
                    None => line,
                };
                ResponseScan::Rejected(strip_tags(message).trim().to_string())
            }
            None => ResponseScan::Accepted,
        }
    }
}

fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_fields() {
        let adapter = PwsWeatherAdapter::default();
        let creds = StationCredentials::new(ProviderId::Pws, true, "KSTATION", "secret");
        let mut payload = PushPayload::new();
        adapter.complete(&mut payload, &creds, "sig");

        assert_eq!(payload.get("ID"), Some("KSTATION"));
        assert_eq!(payload.get("PASSWORD"), Some("secret"));
        assert_eq!(payload.get("action"), Some("updateraw"));
        assert_eq!(payload.get("softwaretype"), Some("sig"));
    }

    #[test]
    fn test_parse_error_lines() {
        let adapter = PwsWeatherAdapter::default();
        let ok = "<html><body>Data Logged and posted in METAR mirror.</body></html>";
        assert_eq!(adapter.parse_error(ok), ResponseScan::Accepted);

        let bad = "<html>\n<body>ERROR: Not a vailid Station ID</body>\n</html>";
        assert_eq!(
            adapter.parse_error(bad),
            ResponseScan::Rejected("Not a vailid Station ID".to_string())
        );
    }

    #[test]
    fn test_eligibility() {
        let adapter = PwsWeatherAdapter::default();
        assert!(adapter.is_eligible(&StationCredentials::new(ProviderId::Pws, true, "A", "B")));
        assert!(!adapter.is_eligible(&StationCredentials::new(ProviderId::Pws, true, "A", " ")));
    }
}
