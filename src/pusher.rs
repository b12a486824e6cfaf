//! Push workflow
//!
//! This module drives one push identically for every provider:
//! eligibility → shaping → completion → submission → result interpretation.
//! Provider specifics come from the [`ProviderAdapter`]; the network exchange
//! goes through an [`HttpTransport`].

use crate::adapters::{ProviderAdapter, ResponseScan};
use crate::config::PusherConfig;
use crate::error::{PushError, TransportError};
use crate::shaper::PayloadShaper;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::types::{
    PushOutcome, PushPayload, PushResult, PushState, ReadingSnapshot, SkipReason,
    StationCredentials,
};
use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};
use std::time::Duration;
use uuid::Uuid;

/// Generic pusher shared by all providers
pub struct Pusher<T: HttpTransport> {
    transport: T,
    shaper: PayloadShaper,
    signature: String,
}

impl Pusher<ReqwestTransport> {
    /// Create a pusher with a reqwest transport configured from `config`
    pub fn from_config(config: &PusherConfig) -> Result<Self, PushError> {
        let transport = ReqwestTransport::new(config.http_timeout(), config.connect_timeout())?;
        Ok(Self::new(
            transport,
            config.time_shift_threshold(),
            config.signature(),
        ))
    }
}

impl<T: HttpTransport> Pusher<T> {
    pub fn new(transport: T, time_shift: Duration, signature: impl Into<String>) -> Self {
        Self {
            transport,
            shaper: PayloadShaper::new(time_shift),
            signature: signature.into(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Push the snapshot to the adapter's provider now
    pub async fn push(
        &self,
        adapter: &dyn ProviderAdapter,
        station: &StationCredentials,
        snapshot: &ReadingSnapshot,
    ) -> PushResult {
        self.push_at(adapter, station, snapshot, Utc::now()).await
    }

    /// Push the snapshot, judging freshness against `now`
    pub async fn push_at(
        &self,
        adapter: &dyn ProviderAdapter,
        station: &StationCredentials,
        snapshot: &ReadingSnapshot,
        now: DateTime<Utc>,
    ) -> PushResult {
        let provider = adapter.provider();
        let station_id = snapshot.station_id.as_str();

        let payload = match self.prepare(adapter, station, snapshot, now) {
            Ok(payload) => payload,
            Err(reason) => {
                trace!("{} → {}: {:?}", station_id, provider, PushState::Skipped);
                return PushResult::skipped(station_id, provider, reason);
            }
        };

        trace!("{} → {}: {:?}", station_id, provider, PushState::Submitting);
        let request = build_request(adapter, station, &payload);
        let reply = self.transport.send(request).await;

        let (outcome, status, body) = match reply {
            Ok(response) => {
                let outcome = process_result(adapter, &response);
                (outcome, Some(response.status), Some(response.body))
            }
            Err(error) => (PushOutcome::TransportFailed { error }, None, None),
        };

        let result = PushResult {
            attempt_id: Uuid::new_v4(),
            station_id: station_id.to_string(),
            provider,
            outcome,
            status,
            body,
            payload: Some(payload),
        };
        log_result(&result);
        result
    }

    /// Run the pure part of a push: eligibility, shaping and completion
    pub fn prepare(
        &self,
        adapter: &dyn ProviderAdapter,
        station: &StationCredentials,
        snapshot: &ReadingSnapshot,
        now: DateTime<Utc>,
    ) -> Result<PushPayload, SkipReason> {
        let provider = adapter.provider();
        let station_id = snapshot.station_id.as_str();

        trace!(
            "{} → {}: {:?} -> {:?}",
            station_id,
            provider,
            PushState::Idle,
            PushState::CheckingEligibility
        );
        if !adapter.is_eligible(station) {
            debug!(
                "{} → {}: sharing disabled or credentials incomplete, skipping",
                station_id, provider
            );
            return Err(SkipReason::NotConfigured);
        }

        trace!("{} → {}: {:?}", station_id, provider, PushState::ShapingPayload);
        let mut payload = match self.shaper.get_pushed_data(adapter, snapshot, now) {
            Some(payload) => payload,
            None => {
                debug!("{} → {}: no fresh data, skipping", station_id, provider);
                return Err(SkipReason::StaleData);
            }
        };

        adapter.complete(&mut payload, station, &self.signature);
        Ok(payload)
    }
}

/// Assemble the request for a completed payload
pub fn build_request(
    adapter: &dyn ProviderAdapter,
    station: &StationCredentials,
    payload: &PushPayload,
) -> HttpRequest {
    HttpRequest {
        method: adapter.method(),
        url: adapter.endpoint().to_string(),
        fields: payload.as_pairs().to_vec(),
        basic_auth: adapter.basic_auth(station),
    }
}

/// Interpret a provider response
///
/// A recognized error wins over the status code. Without one, a non-2xx
/// status is a transport failure and anything else is a success, with a
/// warning when the body could not be understood.
pub fn process_result(adapter: &dyn ProviderAdapter, response: &HttpResponse) -> PushOutcome {
    match adapter.parse_error(&response.body) {
        ResponseScan::Rejected(message) => PushOutcome::ProviderRejected { message },
        _ if !response.is_success() => PushOutcome::TransportFailed {
            error: TransportError::http_status(response.status),
        },
        ResponseScan::Accepted => PushOutcome::Success { warning: None },
        ResponseScan::Unrecognized(detail) => PushOutcome::Success {
            warning: Some(detail),
        },
    }
}

fn log_result(result: &PushResult) {
    let target = format!("{} → {}", result.station_id, result.provider);
    match &result.outcome {
        PushOutcome::Success { warning: None } => info!("{}: data pushed", target),
        PushOutcome::Success {
            warning: Some(detail),
        } => warn!("{}: data pushed, unexpected response ({})", target, detail),
        PushOutcome::ProviderRejected { message } => {
            warn!("{}: rejected by provider: {}", target, message)
        }
        PushOutcome::TransportFailed { error } => warn!("{}: transport failure: {}", target, error),
        PushOutcome::Skipped { reason } => debug!("{}: skipped ({:?})", target, reason),
    }
}
