//! Push scheduling
//!
//! Runs one push per configured (station, provider) pair, several at a time,
//! and keeps the bookkeeping the pusher itself does not: which pairs failed
//! on the network and deserve an early retry, and which were refused by the
//! provider and should wait until their credentials change.

use crate::adapters::ProviderAdapter;
use crate::config::PusherConfig;
use crate::pusher::Pusher;
use crate::transport::HttpTransport;
use crate::types::{
    ProviderId, PushOutcome, PushResult, ReadingSnapshot, RetryAdvice, SkipReason,
    StationConfig, StationCredentials,
};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use log::{debug, info};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

type PairKey = (String, ProviderId);

/// Counts of outcomes in one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub pushed: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub transport_failures: usize,
    /// Pairs not attempted because the provider refused their credentials
    pub suspended: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub summary: CycleSummary,
    pub results: Vec<PushResult>,
}

impl CycleReport {
    /// Whether some pair should be retried before the next regular cycle
    pub fn has_retryable_failures(&self) -> bool {
        self.results
            .iter()
            .any(|r| r.retry_advice() == RetryAdvice::RetrySoon)
    }
}

/// Orchestrates pushes for all configured stations
pub struct PushScheduler<T: HttpTransport> {
    pusher: Pusher<T>,
    adapters: HashMap<ProviderId, Box<dyn ProviderAdapter>>,
    max_concurrent: usize,
    /// Rejected pairs and the credentials that were refused
    suspended: HashMap<PairKey, StationCredentials>,
    pending_retry: HashSet<PairKey>,
}

impl<T: HttpTransport> PushScheduler<T> {
    pub fn new(pusher: Pusher<T>, config: &PusherConfig) -> Self {
        let adapters = ProviderId::ALL
            .iter()
            .map(|&provider| (provider, config.adapter(provider)))
            .collect();
        Self {
            pusher,
            adapters,
            max_concurrent: config.max_concurrent_pushes.max(1),
            suspended: HashMap::new(),
            pending_retry: HashSet::new(),
        }
    }

    /// Swap in a pusher and adapters built from a reloaded configuration,
    /// keeping suspensions and pending retries
    pub fn reconfigure(&mut self, pusher: Pusher<T>, config: &PusherConfig) {
        let suspended = std::mem::take(&mut self.suspended);
        let pending_retry = std::mem::take(&mut self.pending_retry);
        *self = Self::new(pusher, config);
        self.suspended = suspended;
        self.pending_retry = pending_retry;
    }

    pub fn pusher(&self) -> &Pusher<T> {
        &self.pusher
    }

    pub fn is_suspended(&self, station_id: &str, provider: ProviderId) -> bool {
        self.suspended
            .contains_key(&(station_id.to_string(), provider))
    }

    pub fn pending_retries(&self) -> usize {
        self.pending_retry.len()
    }

    /// Push every configured pair
    pub async fn run_cycle(
        &mut self,
        stations: &[StationConfig],
        snapshots: &[ReadingSnapshot],
        now: DateTime<Utc>,
    ) -> CycleReport {
        self.run(stations, snapshots, now, None).await
    }

    /// Push only the pairs whose last attempt failed on the network
    pub async fn retry_failed(
        &mut self,
        stations: &[StationConfig],
        snapshots: &[ReadingSnapshot],
        now: DateTime<Utc>,
    ) -> CycleReport {
        let only = self.pending_retry.clone();
        self.run(stations, snapshots, now, Some(&only)).await
    }

    async fn run(
        &mut self,
        stations: &[StationConfig],
        snapshots: &[ReadingSnapshot],
        now: DateTime<Utc>,
        only: Option<&HashSet<PairKey>>,
    ) -> CycleReport {
        let by_station: HashMap<&str, &ReadingSnapshot> = snapshots
            .iter()
            .map(|s| (s.station_id.as_str(), s))
            .collect();

        self.forget_unconfigured(stations);

        let mut summary = CycleSummary::default();
        let mut jobs = Vec::new();

        for station in stations {
            for creds in &station.providers {
                let key = (station.station_id.clone(), creds.provider);
                if let Some(filter) = only {
                    if !filter.contains(&key) {
                        continue;
                    }
                }
                if let Some(refused) = self.suspended.get(&key) {
                    if refused == creds {
                        debug!(
                            "{} → {}: suspended until credentials change",
                            station.station_id, creds.provider
                        );
                        summary.suspended += 1;
                        continue;
                    }
                    info!(
                        "{} → {}: credentials changed, resuming",
                        station.station_id, creds.provider
                    );
                    self.suspended.remove(&key);
                }
                jobs.push((station.station_id.as_str(), creds));
            }
        }

        let pusher = &self.pusher;
        let adapters = &self.adapters;
        let outcomes: Vec<(&StationCredentials, PushResult)> = stream::iter(jobs)
            .map(|(station_id, creds)| {
                let snapshot = by_station.get(station_id).copied();
                let adapter = adapters.get(&creds.provider);
                async move {
                    let result = match (snapshot, adapter) {
                        (Some(snapshot), Some(adapter)) => {
                            pusher.push_at(adapter.as_ref(), creds, snapshot, now).await
                        }
                        _ => {
                            debug!("{} → {}: no snapshot", station_id, creds.provider);
                            PushResult::skipped(station_id, creds.provider, SkipReason::NoSnapshot)
                        }
                    };
                    (creds, result)
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut results = Vec::with_capacity(outcomes.len());
        for (creds, result) in outcomes {
            let key = (result.station_id.clone(), result.provider);
            match &result.outcome {
                PushOutcome::Success { .. } => summary.pushed += 1,
                PushOutcome::Skipped { .. } => summary.skipped += 1,
                PushOutcome::ProviderRejected { .. } => summary.rejected += 1,
                PushOutcome::TransportFailed { .. } => summary.transport_failures += 1,
            }
            match result.retry_advice() {
                RetryAdvice::RetrySoon => {
                    self.pending_retry.insert(key);
                }
                RetryAdvice::AwaitConfigurationChange => {
                    self.pending_retry.remove(&key);
                    self.suspended.insert(key, creds.clone());
                }
                RetryAdvice::None => {
                    self.pending_retry.remove(&key);
                }
            }
            results.push(result);
        }

        results.sort_by(|a, b| {
            (a.station_id.as_str(), a.provider.as_str())
                .cmp(&(b.station_id.as_str(), b.provider.as_str()))
        });

        info!(
            "push cycle: {} pushed, {} skipped, {} rejected, {} transport failures, {} suspended",
            summary.pushed,
            summary.skipped,
            summary.rejected,
            summary.transport_failures,
            summary.suspended
        );

        CycleReport { summary, results }
    }

    /// Drop bookkeeping for pairs no longer present in the configuration
    fn forget_unconfigured(&mut self, stations: &[StationConfig]) {
        let configured: HashSet<PairKey> = stations
            .iter()
            .flat_map(|station| {
                station
                    .providers
                    .iter()
                    .map(move |creds| (station.station_id.clone(), creds.provider))
            })
            .collect();
        self.suspended.retain(|key, _| configured.contains(key));
        self.pending_retry.retain(|key| configured.contains(key));
    }
}
