//! station-push - Republishes weather-station readings to third-party networks
//!
//! A reading snapshot goes through a deterministic pipeline before it leaves
//! the host: eligibility check → freshness-gated shaping → unit conversion →
//! completion with provider credentials → HTTP submission → result
//! classification.
//!
//! ## Modules
//!
//! - **Adapters**: one per network (WOW Met Office, PWS Weather, Weather
//!   Underground, OpenWeatherMap), pure data plus a few hooks
//! - **Pusher**: the provider-independent workflow
//! - **Scheduler**: pushes every configured station/provider pair per cycle

pub mod adapters;
pub mod computed;
pub mod config;
pub mod error;
pub mod pusher;
pub mod scheduler;
pub mod schema;
pub mod shaper;
pub mod transport;
pub mod types;
pub mod units;

pub use adapters::{adapter_for, FieldRule, ProviderAdapter};
pub use config::PusherConfig;
pub use error::{PushError, TransportError, TransportErrorKind};
pub use pusher::Pusher;
pub use scheduler::{CycleReport, PushScheduler};
pub use schema::NetatmoAdapter;
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::{
    ModuleReading, ModuleType, ProviderId, PushOutcome, PushPayload, PushResult, ReadingSnapshot,
    StationConfig, StationCredentials,
};

/// Crate version embedded in the software signature
pub const PUSH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Client signature sent to providers as `softwaretype`
pub const SOFTWARE_SIGNATURE: &str = concat!("station-push/", env!("CARGO_PKG_VERSION"));
