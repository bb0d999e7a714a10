//! # Replay Guard
//!
//! Tracks claimed nonces so that each one completes at most one handshake
//! inside its validity window.
//!
//! ## Security Design
//!
//! - Check-and-insert happens under a single lock, so two concurrent claims of
//!   one nonce cannot both succeed
//! - Expired entries are swept lazily from `claim` once per sweep interval,
//!   and periodically by the gateway's background task
//! - Memory is bounded by the number of nonces claimed per TTL

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default nonce validity window.
pub const DEFAULT_NONCE_TTL: Duration = Duration::from_secs(10 * 60);

/// Default interval between opportunistic sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// The nonce was already claimed and has not expired.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Nonce has already been used (replay attack)")]
pub struct ReplayDetected;

struct GuardState {
    /// nonce -> instant at which it may be claimed again.
    expiries: HashMap<String, Instant>,
    last_sweep: Instant,
}

/// `now + ttl`, saturated to the furthest instant the platform can represent.
fn expiry(now: Instant, ttl: Duration) -> Instant {
    let mut ttl = ttl;
    loop {
        if let Some(at) = now.checked_add(ttl) {
            return at;
        }
        ttl /= 2;
    }
}

/// Concurrent single-use nonce registry.
pub struct ReplayGuard {
    state: Mutex<GuardState>,
    sweep_interval: Duration,
}

impl ReplayGuard {
    /// Creates a guard with the default sweep interval.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }

    /// Creates a guard that sweeps from `claim` at most once per `interval`.
    #[must_use]
    pub fn with_sweep_interval(interval: Duration) -> Self {
        Self {
            state: Mutex::new(GuardState {
                expiries: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            sweep_interval: interval,
        }
    }

    /// Claims `nonce` for `ttl`, starting now.
    ///
    /// # Errors
    ///
    /// `ReplayDetected` if the nonce is present and unexpired.
    pub fn claim(&self, nonce: &str, ttl: Duration) -> Result<(), ReplayDetected> {
        self.claim_at(nonce, ttl, Instant::now())
    }

    /// Claims `nonce` as of `now`.
    ///
    /// A nonce claimed at T with TTL d is claimable again at T + d.
    pub fn claim_at(&self, nonce: &str, ttl: Duration, now: Instant) -> Result<(), ReplayDetected> {
        let mut state = self.state.lock();

        if now.saturating_duration_since(state.last_sweep) >= self.sweep_interval {
            let removed = Self::sweep_locked(&mut state.expiries, now);
            state.last_sweep = now;
            if removed > 0 {
                tracing::debug!(removed, "Swept expired nonces");
            }
        }

        if let Some(expires_at) = state.expiries.get(nonce) {
            if now < *expires_at {
                return Err(ReplayDetected);
            }
        }

        state.expiries.insert(nonce.to_string(), expiry(now, ttl));
        Ok(())
    }

    /// Removes every entry expired as of `now`, returning how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut state = self.state.lock();
        let removed = Self::sweep_locked(&mut state.expiries, now);
        state.last_sweep = now;
        removed
    }

    fn sweep_locked(expiries: &mut HashMap<String, Instant>, now: Instant) -> usize {
        let before = expiries.len();
        expiries.retain(|_, expires_at| *expires_at > now);
        before - expiries.len()
    }

    /// Returns true if `nonce` has an entry, expired or not.
    #[must_use]
    pub fn contains(&self, nonce: &str) -> bool {
        self.state.lock().expiries.contains_key(nonce)
    }

    /// Number of tracked nonces, including expired but unswept ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().expiries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().expiries.is_empty()
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReplayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayGuard")
            .field("tracked", &self.len())
            .field("sweep_interval", &self.sweep_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    const TTL: Duration = Duration::from_secs(600);

    #[test]
    fn test_claim_once() {
        let guard = ReplayGuard::new();
        assert!(guard.claim("abc123", TTL).is_ok());
        assert_eq!(guard.claim("abc123", TTL), Err(ReplayDetected));
        assert!(guard.contains("abc123"));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn test_distinct_nonces_are_independent() {
        let guard = ReplayGuard::new();
        assert!(guard.claim("a", TTL).is_ok());
        assert!(guard.claim("b", TTL).is_ok());
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn test_reclaimable_exactly_at_expiry() {
        let guard = ReplayGuard::new();
        let t = Instant::now();
        let ttl = Duration::from_secs(30);

        guard.claim_at("n", ttl, t).unwrap();
        assert!(guard
            .claim_at("n", ttl, t + ttl - Duration::from_millis(1))
            .is_err());
        assert!(guard.claim_at("n", ttl, t + ttl).is_ok());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let guard = ReplayGuard::new();
        let t = Instant::now();

        guard.claim_at("abc123", Duration::MAX, t).unwrap();
        assert_eq!(
            guard.claim_at("abc123", Duration::MAX, t + Duration::from_secs(86_400)),
            Err(ReplayDetected)
        );
        assert!(guard.claim("other", Duration::from_secs(u64::MAX)).is_ok());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let guard = ReplayGuard::new();
        let t = Instant::now();

        guard.claim_at("short", Duration::from_secs(1), t).unwrap();
        guard.claim_at("long", Duration::from_secs(100), t).unwrap();

        assert_eq!(guard.sweep(t + Duration::from_secs(2)), 1);
        assert!(!guard.contains("short"));
        assert!(guard.contains("long"));
    }

    #[test]
    fn test_claim_sweeps_lazily() {
        let guard = ReplayGuard::with_sweep_interval(Duration::from_secs(10));
        let t = Instant::now();

        guard.claim_at("old", Duration::from_secs(1), t).unwrap();
        // Before the interval elapses the expired entry is still tracked.
        guard.claim_at("x", TTL, t + Duration::from_secs(5)).unwrap();
        assert!(guard.contains("old"));

        guard.claim_at("y", TTL, t + Duration::from_secs(11)).unwrap();
        assert!(!guard.contains("old"));
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        const THREADS: usize = 16;
        let guard = Arc::new(ReplayGuard::new());
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    guard.claim("race", TTL).is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(guard.len(), 1);
    }
}
