//! Pool-level circuit breaker: trips per failure class after K
//! consecutive failures within a window, short-circuiting new tasks of
//! that class to an immediate failure until a cooldown elapses.

use aural_resolver::ResolverError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    NotFound,
    Unavailable,
    RateLimited,
    Timeout,
    ParseFailed,
    Internal,
}

impl FailureClass {
    pub fn of(error: &ResolverError) -> Self {
        match error {
            ResolverError::NotFound => Self::NotFound,
            ResolverError::Unavailable => Self::Unavailable,
            ResolverError::RateLimited => Self::RateLimited,
            ResolverError::Timeout => Self::Timeout,
            ResolverError::ParseFailed(_) => Self::ParseFailed,
            ResolverError::Internal(_) => Self::Internal,
        }
    }
}

#[derive(Default)]
struct Entry {
    consecutive_failures: u32,
    opened_at: Option<DateTime<Utc>>,
}

pub struct CircuitBreaker {
    trip_threshold: u32,
    cooldown: Duration,
    entries: Mutex<HashMap<FailureClass, Entry>>,
}

impl CircuitBreaker {
    pub fn new(trip_threshold: u32, cooldown: Duration) -> Self {
        Self {
            trip_threshold,
            cooldown,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// True when the class is open and the cooldown has not yet elapsed.
    /// Half-opens (clears state) once the cooldown passes, letting the
    /// next task through as a trial.
    pub fn is_open(&self, class: FailureClass) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let Some(entry) = entries.get(&class) else { return false };
        match entry.opened_at {
            Some(opened_at) => {
                let elapsed = Utc::now() - opened_at;
                if elapsed > chrono::Duration::from_std(self.cooldown).unwrap_or_default() {
                    entries.remove(&class);
                    false
                } else {
                    true
                }
            }
            None => false,
        }
    }

    pub fn record_failure(&self, class: FailureClass) {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(class).or_default();
        entry.consecutive_failures += 1;
        if entry.consecutive_failures >= self.trip_threshold && entry.opened_at.is_none() {
            entry.opened_at = Some(Utc::now());
        }
    }

    /// Clears every class's failure streak. Called on any successful
    /// resolution, since a healthy resolver is evidence against all
    /// open classes at once.
    pub fn reset_all(&self) {
        self.entries.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_after_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        assert!(!breaker.is_open(FailureClass::Timeout));
        breaker.record_failure(FailureClass::Timeout);
        breaker.record_failure(FailureClass::Timeout);
        assert!(!breaker.is_open(FailureClass::Timeout));
        breaker.record_failure(FailureClass::Timeout);
        assert!(breaker.is_open(FailureClass::Timeout));
    }

    #[test]
    fn reset_all_clears_every_class() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.record_failure(FailureClass::Internal);
        breaker.record_failure(FailureClass::Timeout);
        breaker.reset_all();
        breaker.record_failure(FailureClass::Internal);
        assert!(!breaker.is_open(FailureClass::Internal));
        assert!(!breaker.is_open(FailureClass::Timeout));
    }

    #[test]
    fn half_opens_after_cooldown() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(0));
        breaker.record_failure(FailureClass::RateLimited);
        assert!(!breaker.is_open(FailureClass::RateLimited));
    }
}
