//! Latency-adaptive leading + trailing throttle for outbound mutations.
//!
//! DESIGN
//! ======
//! The delay between applied calls follows the measured round-trip latency:
//!
//! - `scaling = min(1, target_latency / avg_latency)` when latency is known, else 1
//! - `rate = max(min_rate, base_rate * scaling)` requests/second
//! - `delay = 1000 / rate` when latency is known, else `default_delay`
//!
//! A call made at least `delay` ms after the last applied call is applied at
//! once. Otherwise it replaces whatever call is pending and is scheduled for the
//! remaining wait, so the last applied value is always the newest one.
//! `submit_merged` folds the pending value into the new one instead, for
//! values that carry independent fields.
//!
//! The throttle does not own a timer. Callers drive it with `poll(now)` at or
//! after `next_deadline()`; `cancel()` discards the pending call.

#[cfg(test)]
#[path = "throttle_test.rs"]
mod throttle_test;

const DEFAULT_TARGET_LATENCY_MS: f64 = 100.0;
const DEFAULT_BASE_RATE: f64 = 28.0;
const DEFAULT_MIN_RATE: f64 = 2.0;
const DEFAULT_DELAY_MS: f64 = 35.0;

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleConfig {
    /// Latency the base rate is tuned for, in milliseconds.
    pub target_latency_ms: f64,
    /// Requests per second at or below the target latency.
    pub base_rate: f64,
    /// Floor for the scaled rate, in requests per second.
    pub min_rate: f64,
    /// Delay used while no latency sample exists.
    pub default_delay_ms: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            target_latency_ms: DEFAULT_TARGET_LATENCY_MS,
            base_rate: DEFAULT_BASE_RATE,
            min_rate: DEFAULT_MIN_RATE,
            default_delay_ms: DEFAULT_DELAY_MS,
        }
    }
}

impl ThrottleConfig {
    /// Read the config from `THROTTLE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(_) => None,
        })
    }

    /// Build the config from an arbitrary key lookup. Missing, unparsable or
    /// non-positive values fall back to the defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            target_latency_ms: env_parse(&lookup, "THROTTLE_TARGET_LATENCY_MS", DEFAULT_TARGET_LATENCY_MS),
            base_rate: env_parse(&lookup, "THROTTLE_BASE_RATE", DEFAULT_BASE_RATE),
            min_rate: env_parse(&lookup, "THROTTLE_MIN_RATE", DEFAULT_MIN_RATE),
            default_delay_ms: env_parse(&lookup, "THROTTLE_DEFAULT_DELAY_MS", DEFAULT_DELAY_MS),
        }
    }

    /// Delay between applied calls for the given average latency.
    #[must_use]
    pub fn delay_ms(&self, avg_latency_ms: Option<f64>) -> f64 {
        let Some(latency) = avg_latency_ms.filter(|l| l.is_finite() && *l > 0.0) else {
            return self.default_delay_ms;
        };
        let scaling = (self.target_latency_ms / latency).min(1.0);
        let rate = self.min_rate.max(self.base_rate * scaling);
        if rate > 0.0 { 1000.0 / rate } else { self.default_delay_ms }
    }
}

fn env_parse(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f64) -> f64 {
    match lookup(key).map(|v| v.trim().parse::<f64>()) {
        Some(Ok(v)) if v.is_finite() && v > 0.0 => v,
        _ => default,
    }
}

// =============================================================================
// THROTTLE
// =============================================================================

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    due_ms: i64,
}

/// Leading + trailing throttle over values of type `T`.
#[derive(Debug, Clone)]
pub struct AdaptiveThrottle<T> {
    config: ThrottleConfig,
    last_applied_ms: Option<i64>,
    pending: Option<Pending<T>>,
}

impl<T> AdaptiveThrottle<T> {
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        Self { config, last_applied_ms: None, pending: None }
    }

    #[must_use]
    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Offer a value. Returns it back when it should be applied right now;
    /// otherwise it replaces the pending value.
    pub fn submit(&mut self, value: T, now_ms: i64, avg_latency_ms: Option<f64>) -> Option<T> {
        self.submit_merged(value, now_ms, avg_latency_ms, |_, newer| newer)
    }

    /// Like [`submit`](Self::submit), but an unapplied pending value is
    /// folded into the new one with `merge(pending, newer)` instead of being
    /// dropped.
    pub fn submit_merged(
        &mut self,
        value: T,
        now_ms: i64,
        avg_latency_ms: Option<f64>,
        merge: impl FnOnce(T, T) -> T,
    ) -> Option<T> {
        let delay = self.config.delay_ms(avg_latency_ms);
        let elapsed = self.last_applied_ms.map(|last| now_ms - last);
        let value = match self.pending.take() {
            Some(pending) => merge(pending.value, value),
            None => value,
        };

        #[allow(clippy::cast_precision_loss)]
        let ready = elapsed.is_none_or(|e| e as f64 >= delay);
        if ready {
            self.last_applied_ms = Some(now_ms);
            return Some(value);
        }

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let remaining = (delay - elapsed.unwrap_or(0) as f64).ceil() as i64;
        self.pending = Some(Pending { value, due_ms: now_ms + remaining.max(1) });
        None
    }

    /// Release the pending value if its wait has elapsed.
    pub fn poll(&mut self, now_ms: i64) -> Option<T> {
        if self.pending.as_ref().is_some_and(|p| now_ms >= p.due_ms) {
            self.last_applied_ms = Some(now_ms);
            return self.pending.take().map(|p| p.value);
        }
        None
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<i64> {
        self.pending.as_ref().map(|p| p.due_ms)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Discard the pending value without applying it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
