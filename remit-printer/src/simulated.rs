//! Simulated thermal printer
//!
//! Stands in for real hardware during development and in tests. Connectivity,
//! latency and write failures are driven by a seedable RNG; paper depletion is
//! state owned by each instance, so several simulated printers can coexist.

use crate::error::{PrintError, PrintResult};
use crate::printer::{PrinterHandle, RawStatus};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::{debug, instrument};

/// Paper level at which the simulated sensor reports "near end"
const NEAR_END_LEVEL: u8 = 20;

/// How a simulated printer misbehaves
#[derive(Debug, Clone)]
pub struct SimulatedBehavior {
    /// Minimum simulated I/O latency
    pub min_latency: Duration,
    /// Maximum simulated I/O latency
    pub max_latency: Duration,
    /// Probability that a status query times out
    pub connect_failure_rate: f64,
    /// Probability that a write is rejected
    pub write_failure_rate: f64,
    /// Paper consumed by every successful write, in percent
    pub paper_per_job: u8,
}

impl SimulatedBehavior {
    /// Always healthy, instant, deterministic
    pub fn reliable() -> Self {
        Self {
            min_latency: Duration::ZERO,
            max_latency: Duration::ZERO,
            connect_failure_rate: 0.0,
            write_failure_rate: 0.0,
            paper_per_job: 2,
        }
    }

    /// Bench-top behavior: short random delays, occasional dropouts
    pub fn flaky() -> Self {
        Self {
            min_latency: Duration::from_millis(200),
            max_latency: Duration::from_millis(1200),
            connect_failure_rate: 0.1,
            write_failure_rate: 0.05,
            paper_per_job: 2,
        }
    }
}

impl Default for SimulatedBehavior {
    fn default() -> Self {
        Self::reliable()
    }
}

struct SimState {
    rng: StdRng,
    connected: bool,
    cover_open: bool,
    paper_level: u8,
    jobs_printed: u64,
    last_job: Option<Vec<u8>>,
}

/// In-process printer with scripted or random behavior
pub struct SimulatedPrinter {
    model: String,
    behavior: SimulatedBehavior,
    state: Mutex<SimState>,
}

impl SimulatedPrinter {
    /// Create a reliable simulated printer with a full paper roll
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            behavior: SimulatedBehavior::reliable(),
            state: Mutex::new(SimState {
                rng: StdRng::from_entropy(),
                connected: true,
                cover_open: false,
                paper_level: 100,
                jobs_printed: 0,
                last_job: None,
            }),
        }
    }

    /// Replace the behavior profile
    pub fn with_behavior(mut self, behavior: SimulatedBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Make random outcomes reproducible
    pub fn with_seed(self, seed: u64) -> Self {
        self.state.lock().rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Plug or unplug the simulated cable
    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    pub fn set_cover_open(&self, open: bool) {
        self.state.lock().cover_open = open;
    }

    pub fn set_paper_level(&self, level: u8) {
        self.state.lock().paper_level = level.min(100);
    }

    /// Load a fresh roll
    pub fn reload_paper(&self) {
        self.set_paper_level(100);
    }

    pub fn paper_level(&self) -> u8 {
        self.state.lock().paper_level
    }

    /// Number of successful writes so far
    pub fn jobs_printed(&self) -> u64 {
        self.state.lock().jobs_printed
    }

    /// Bytes of the most recent successful write
    pub fn last_job(&self) -> Option<Vec<u8>> {
        self.state.lock().last_job.clone()
    }

    async fn simulate_latency(&self) {
        let delay = {
            let mut state = self.state.lock();
            let min = self.behavior.min_latency;
            let max = self.behavior.max_latency.max(min);
            if max.is_zero() {
                Duration::ZERO
            } else {
                let millis = state.rng.gen_range(min.as_millis()..=max.as_millis());
                Duration::from_millis(millis as u64)
            }
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl PrinterHandle for SimulatedPrinter {
    #[instrument(skip(self), fields(model = %self.model))]
    async fn query_status(&self) -> PrintResult<RawStatus> {
        self.simulate_latency().await;

        let mut state = self.state.lock();
        if !state.connected {
            return Err(PrintError::Offline(self.model.clone()));
        }
        if state.rng.gen_bool(self.behavior.connect_failure_rate.clamp(0.0, 1.0)) {
            return Err(PrintError::Timeout("connection timeout".to_string()));
        }

        let temperature = state.rng.gen_range(38..=46);
        Ok(RawStatus {
            online: true,
            model: Some(self.model.clone()),
            paper_level: Some(state.paper_level),
            paper_near_end: state.paper_level < NEAR_END_LEVEL,
            paper_out: state.paper_level == 0,
            cover_open: state.cover_open,
            temperature: Some(temperature),
        })
    }

    #[instrument(skip(self, data), fields(model = %self.model, data_len = data.len()))]
    async fn write_bytes(&self, data: &[u8]) -> PrintResult<()> {
        self.simulate_latency().await;

        let mut state = self.state.lock();
        if !state.connected {
            return Err(PrintError::Offline(self.model.clone()));
        }
        if state.cover_open {
            return Err(PrintError::Rejected("cover open".to_string()));
        }
        if state.paper_level == 0 {
            return Err(PrintError::Rejected("paper out".to_string()));
        }
        if state.rng.gen_bool(self.behavior.write_failure_rate.clamp(0.0, 1.0)) {
            return Err(PrintError::Rejected("simulated write failure".to_string()));
        }

        state.paper_level = state.paper_level.saturating_sub(self.behavior.paper_per_job);
        state.jobs_printed += 1;
        state.last_job = Some(data.to_vec());
        debug!(paper_level = state.paper_level, "Simulated print complete");
        Ok(())
    }
}
