//! Observability for the platform connection: health probing and logging.
//!
//! Probe latency and failures are recorded through the `metrics` facade:
//! - `platform_probe_latency_ms{service}` (histogram)
//! - `platform_probe_failures_total{service}` (counter)

pub mod health;
pub mod logging;

pub use health::{
    BlobStoreProbe, DocumentStoreProbe, HealthProbe, IdentityProbe, ServiceProbe,
    UnavailableProbe,
};
pub use logging::{init_logging, LogConfig, LogFormat};
