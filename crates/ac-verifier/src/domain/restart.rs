//! # Restart Policy
//!
//! Backoff delays for restarting the block stream, and the retry bookkeeping
//! that feeds them.
//!
//! A base delay of zero is the "immediate" sentinel: every attempt restarts
//! without waiting. Any other base must lie inside the configured bounds.
//! Validation happens once, at construction.

use shared_types::BlockHeight;
use std::time::Duration;

use crate::error::ConfigError;

/// Smallest non-zero base delay accepted by default.
pub const MIN_RESTART_DELAY_MS: i64 = 100;
/// Largest base delay accepted by default.
pub const MAX_RESTART_DELAY_MS: i64 = 600_000;
pub const DEFAULT_RESTART_DELAY_MS: i64 = 1_000;
pub const DEFAULT_MAX_BACKOFF_MS: i64 = 300_000;

/// Inclusive range a non-zero base delay must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayBounds {
    pub min_ms: i64,
    pub max_ms: i64,
}

impl Default for DelayBounds {
    fn default() -> Self {
        Self {
            min_ms: MIN_RESTART_DELAY_MS,
            max_ms: MAX_RESTART_DELAY_MS,
        }
    }
}

impl DelayBounds {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_ms <= 0 || self.min_ms > self.max_ms {
            return Err(ConfigError::InvalidDelayBounds {
                min_ms: self.min_ms,
                max_ms: self.max_ms,
            });
        }
        Ok(())
    }

    /// Check a base delay against the bounds. Zero is always accepted.
    fn check(&self, delay_ms: i64) -> Result<u64, ConfigError> {
        self.validate()?;
        if delay_ms == 0 {
            return Ok(0);
        }
        if delay_ms < self.min_ms || delay_ms > self.max_ms {
            return Err(ConfigError::InvalidRestartDelay {
                delay_ms,
                min_ms: self.min_ms,
                max_ms: self.max_ms,
            });
        }
        Ok(delay_ms.unsigned_abs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Immediate,
    Fixed,
    Exponential { cap_ms: u64 },
}

/// Validated backoff policy. Computing a delay never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    base_ms: u64,
    strategy: Strategy,
}

impl RestartPolicy {
    /// Restart without waiting, whatever the attempt count.
    pub const fn immediate() -> Self {
        Self {
            base_ms: 0,
            strategy: Strategy::Immediate,
        }
    }

    /// Wait the same `delay_ms` before every restart.
    pub fn fixed(delay_ms: i64, bounds: DelayBounds) -> Result<Self, ConfigError> {
        let base_ms = bounds.check(delay_ms)?;
        if base_ms == 0 {
            return Ok(Self::immediate());
        }
        Ok(Self {
            base_ms,
            strategy: Strategy::Fixed,
        })
    }

    /// Wait `delay_ms * 2^attempt`, capped at `max_delay_ms`.
    pub fn exponential(
        delay_ms: i64,
        max_delay_ms: i64,
        bounds: DelayBounds,
    ) -> Result<Self, ConfigError> {
        let base_ms = bounds.check(delay_ms)?;
        if base_ms == 0 {
            return Ok(Self::immediate());
        }
        if max_delay_ms < delay_ms {
            return Err(ConfigError::InvalidBackoffCap {
                delay_ms,
                max_delay_ms,
            });
        }
        Ok(Self {
            base_ms,
            strategy: Strategy::Exponential {
                cap_ms: max_delay_ms.unsigned_abs(),
            },
        })
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self.strategy, Strategy::Immediate)
    }

    /// Delay to wait before restart number `attempt` (zero-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let millis = match self.strategy {
            Strategy::Immediate => 0,
            Strategy::Fixed => self.base_ms,
            Strategy::Exponential { cap_ms } => {
                let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
                self.base_ms.saturating_mul(factor).min(cap_ms)
            }
        };
        Duration::from_millis(millis)
    }
}

/// Whether the stream driver restarts at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartMode {
    Disabled,
    Enabled(RestartPolicy),
}

impl RestartMode {
    pub fn policy(&self) -> Option<&RestartPolicy> {
        match self {
            RestartMode::Disabled => None,
            RestartMode::Enabled(policy) => Some(policy),
        }
    }
}

/// Backoff strategy selected in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    Exponential { max_delay_ms: i64 },
}

/// Unvalidated restart settings, as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartConfig {
    pub enabled: bool,
    /// Base delay; 0 means restart immediately.
    pub delay_ms: i64,
    pub backoff: Backoff,
    pub bounds: DelayBounds,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: DEFAULT_RESTART_DELAY_MS,
            backoff: Backoff::Exponential {
                max_delay_ms: DEFAULT_MAX_BACKOFF_MS,
            },
            bounds: DelayBounds::default(),
        }
    }
}

impl RestartConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn fixed(delay_ms: i64) -> Self {
        Self {
            delay_ms,
            backoff: Backoff::Fixed,
            ..Self::default()
        }
    }

    pub fn exponential(delay_ms: i64, max_delay_ms: i64) -> Self {
        Self {
            delay_ms,
            backoff: Backoff::Exponential { max_delay_ms },
            ..Self::default()
        }
    }

    /// Validate and build the restart mode.
    ///
    /// Settings are validated even when restarts are disabled, so a bad value
    /// is caught before someone turns restarts on.
    pub fn build(&self) -> Result<RestartMode, ConfigError> {
        let policy = match self.backoff {
            Backoff::Fixed => RestartPolicy::fixed(self.delay_ms, self.bounds)?,
            Backoff::Exponential { max_delay_ms } => {
                RestartPolicy::exponential(self.delay_ms, max_delay_ms, self.bounds)?
            }
        };
        Ok(if self.enabled {
            RestartMode::Enabled(policy)
        } else {
            RestartMode::Disabled
        })
    }
}

/// Retry counter keyed on the height the stream is being restarted from.
///
/// The counter grows while restarts keep targeting the same height and drops
/// back to zero as soon as the target height changes. The error that caused
/// the restart plays no part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    stuck_height: Option<BlockHeight>,
    primed: bool,
}

impl RetryState {
    /// Record a restart from `height` and return the attempt number to use.
    pub fn next_attempt(&mut self, height: Option<BlockHeight>) -> u32 {
        if self.primed && self.stuck_height == height {
            self.attempt = self.attempt.saturating_add(1);
        } else {
            self.primed = true;
            self.stuck_height = height;
            self.attempt = 0;
        }
        self.attempt
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn stuck_height(&self) -> Option<BlockHeight> {
        self.stuck_height
    }
}
