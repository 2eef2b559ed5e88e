//! Human-like pacing and client identity rotation.
//!
//! Both are injectable so tests can run the whole pipeline with zero delays
//! and a predictable user-agent sequence.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Inclusive delay range in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    /// Build a range, swapping the bounds if they are reversed.
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        if min_ms <= max_ms {
            Self { min_ms, max_ms }
        } else {
            Self {
                min_ms: max_ms,
                max_ms: min_ms,
            }
        }
    }

    pub const fn secs(min: u64, max: u64) -> Self {
        Self::new(min * 1000, max * 1000)
    }

    pub const ZERO: Self = Self::new(0, 0);

    /// The same range with bounds in order; used after deserialization.
    pub fn normalized(self) -> Self {
        Self::new(self.min_ms, self.max_ms)
    }
}

/// Chooses how long to pause for a given range.
pub trait PacingPolicy: Send + Sync {
    fn sample(&self, range: DelayRange) -> Duration;
}

/// Uniformly random delay within the range.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPacing;

impl PacingPolicy for RandomPacing {
    fn sample(&self, range: DelayRange) -> Duration {
        let range = range.normalized();
        if range.min_ms == range.max_ms {
            return Duration::from_millis(range.min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(range.min_ms..=range.max_ms))
    }
}

/// Never pauses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

impl PacingPolicy for NoPacing {
    fn sample(&self, _range: DelayRange) -> Duration {
        Duration::ZERO
    }
}

/// Sleep for a duration sampled from `range`.
pub async fn pause(policy: &dyn PacingPolicy, range: DelayRange) {
    let delay = policy.sample(range);
    if !delay.is_zero() {
        tracing::debug!("pausing {}ms", delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}

/// Delay ranges used by the pipeline driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause between consecutive targets.
    pub between_targets: DelayRange,
    /// Short pause after interacting with a page.
    pub human: DelayRange,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            between_targets: DelayRange::secs(5, 10),
            human: DelayRange::secs(2, 5),
        }
    }
}

impl PacingConfig {
    pub fn normalized(self) -> Self {
        Self {
            between_targets: self.between_targets.normalized(),
            human: self.human.normalized(),
        }
    }
}

/// Default desktop user-agents.
pub const DEFAULT_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
];

/// Rotation cursor over a fixed set of client identities.
#[derive(Debug)]
pub struct IdentityPool {
    agents: Vec<String>,
    cursor: AtomicUsize,
}

impl IdentityPool {
    /// Pool starting at a random position. An empty list falls back to
    /// [`DEFAULT_USER_AGENTS`].
    pub fn new(agents: Vec<String>) -> Self {
        let agents = if agents.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()
        } else {
            agents
        };
        let start = rand::thread_rng().gen_range(0..agents.len());
        Self::with_start(agents, start)
    }

    /// Pool starting at a fixed position.
    pub fn with_start(agents: Vec<String>, start: usize) -> Self {
        Self {
            agents,
            cursor: AtomicUsize::new(start),
        }
    }

    /// Next identity in rotation. `None` only for an explicitly empty pool.
    pub fn next(&self) -> Option<&str> {
        if self.agents.is_empty() {
            return None;
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.agents.len();
        Some(&self.agents[i])
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
