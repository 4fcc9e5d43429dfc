//! # Supervisor-wide configuration.
//!
//! Provides [`SupervisorConfig`], the centralized settings for the engine.
//!
//! ## Field semantics
//! - `channel_capacity`: bound of the per-stage event channels (min 1)
//! - `monitor_capacity`: monitor broadcast ring size (min 1)
//! - `warn_diagnostics`: arms per-actor warn timers; an explicit switch
//!   rather than a build-environment probe, so hosts decide per deployment
//! - `grace`: wait window for [`Supervisor::shutdown`](crate::Supervisor::shutdown)

use std::time::Duration;

/// Global configuration for the supervision engine.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Capacity of the bounded channels linking pipeline stages.
    ///
    /// Backpressure applies: a full stage slows its upstream rather than
    /// dropping events. Minimum value is 1 (clamped at use sites).
    pub channel_capacity: usize,

    /// Capacity of the monitor broadcast ring buffer.
    ///
    /// Observers lagging behind more than this many notes receive `Lagged`
    /// and skip the oldest items. Minimum value is 1.
    pub monitor_capacity: usize,

    /// Arms the per-actor warn timer configured by
    /// [`LogicDef::with_warn_timeout`](crate::LogicDef::with_warn_timeout).
    ///
    /// The timer is diagnostic only: it reports a still-running actor, it
    /// never terminates one. Typically on in development, off in production.
    pub warn_diagnostics: bool,

    /// Maximum wait for live actors to finish during shutdown before
    /// reporting [`RuntimeError::GraceExceeded`](crate::RuntimeError::GraceExceeded).
    pub grace: Duration,
}

impl SupervisorConfig {
    /// Returns a stage channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn channel_capacity_clamped(&self) -> usize {
        self.channel_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `channel_capacity = 1024`
    /// - `monitor_capacity = 1024`
    /// - `warn_diagnostics = true`
    /// - `grace = 60s`
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            monitor_capacity: 1024,
            warn_diagnostics: true,
            grace: Duration::from_secs(60),
        }
    }
}
