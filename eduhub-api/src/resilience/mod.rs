//! Resilience patterns around the platform connection.
//!
//! - **Retry**: bounded, fixed-delay, cancellable retry for the first connection
//! - **Graceful Shutdown**: one-time teardown on termination signals

pub mod retry;
pub mod shutdown;

pub use retry::{retry, ConstantBackoff, RetryError, RetryPolicy};
pub use shutdown::{GracefulShutdown, ShutdownCoordinator, ShutdownError, SignalListener};
