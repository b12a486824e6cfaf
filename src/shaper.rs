//! Freshness-gated payload shaping
//!
//! Turns a reading snapshot into the flat field set a provider expects.
//! - Freshness is judged per module: a module read too long ago contributes
//!   nothing, since its sensors are read together on the device
//! - The base module anchors the record: when it is stale or missing there is
//!   no payload at all
//! - A field is only emitted when its source measurement exists

use crate::adapters::ProviderAdapter;
use crate::types::{ModuleReading, ModuleType, PushPayload, ReadingSnapshot};
use chrono::{DateTime, Utc};
use log::{debug, trace};
use std::time::Duration;

/// Shapes snapshots into provider payloads
#[derive(Debug, Clone, Copy)]
pub struct PayloadShaper {
    time_shift: Duration,
}

impl PayloadShaper {
    /// Create a shaper with the maximum accepted reading age
    pub fn new(time_shift: Duration) -> Self {
        Self { time_shift }
    }

    pub fn time_shift(&self) -> Duration {
        self.time_shift
    }

    /// A module is fresh while its age stays strictly below the threshold.
    /// Readings stamped in the future count as fresh.
    pub fn is_fresh(&self, module: &ModuleReading, now: DateTime<Utc>) -> bool {
        let threshold = i64::try_from(self.time_shift.as_secs()).unwrap_or(i64::MAX);
        module.age_at(now) < threshold
    }

    /// Build the provider fields for a snapshot, or `None` when there is
    /// nothing fresh enough to send
    pub fn get_pushed_data(
        &self,
        adapter: &dyn ProviderAdapter,
        snapshot: &ReadingSnapshot,
        now: DateTime<Utc>,
    ) -> Option<PushPayload> {
        let base = match snapshot.base_module() {
            Some(base) => base,
            None => {
                debug!("station {}: no base module in snapshot", snapshot.station_id);
                return None;
            }
        };

        if !self.is_fresh(base, now) {
            debug!(
                "station {}: base module is {}s old, nothing to push",
                snapshot.station_id,
                base.age_at(now)
            );
            return None;
        }

        let observed_at = match base.observed_at() {
            Some(at) => at,
            None => {
                debug!(
                    "station {}: base timestamp {} is out of range",
                    snapshot.station_id, base.time_utc
                );
                return None;
            }
        };

        let mut payload = PushPayload::new();

        if let Some(field) = adapter.timestamp_field() {
            payload.insert(field.name, field.render(observed_at));
        }
        map_module(adapter, base, &mut payload);

        for module in &snapshot.modules {
            if module.module_type == ModuleType::Main {
                continue;
            }
            if !self.is_fresh(module, now) {
                trace!(
                    "station {}: skipping stale module {} ({}s old)",
                    snapshot.station_id,
                    module.module_id,
                    module.age_at(now)
                );
                continue;
            }
            map_module(adapter, module, &mut payload);
        }

        if payload.is_empty() {
            None
        } else {
            Some(payload)
        }
    }
}

/// Apply the adapter's rules for this module type
fn map_module(adapter: &dyn ProviderAdapter, module: &ModuleReading, payload: &mut PushPayload) {
    for rule in adapter
        .field_map()
        .iter()
        .filter(|rule| rule.module == module.module_type)
    {
        let value = match module.measurement(rule.source) {
            Some(v) => v,
            None => continue,
        };
        if let Some(rendered) = rule.conversion.apply(value) {
            payload.insert(rule.target, rendered);
        }
    }
}
