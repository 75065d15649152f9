//! Per-phase wall-clock timing of the outer loop, active with the `timing`
//! feature. Without it every recorder is a plain call.
#![allow(unused)]
use std::cell::RefCell;
use std::time::Duration;
use tracing::info;

#[derive(Default, Clone, Debug)]
pub struct TimingStats {
    pub gradient_times: Vec<Duration>,
    pub momentum_times: Vec<Duration>,
    pub pressure_times: Vec<Duration>,
    pub total_time: Duration,
}

fn total(times: &[Duration]) -> Duration {
    times.iter().sum()
}

fn average_ms(times: &[Duration]) -> f64 {
    if times.is_empty() {
        0.0
    } else {
        total(times).as_secs_f64() * 1000.0 / times.len() as f64
    }
}

impl TimingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iterations(&self) -> usize {
        self.momentum_times.len()
    }

    /// Time not spent in any recorded phase.
    pub fn overhead(&self) -> Duration {
        let accounted = total(&self.gradient_times)
            + total(&self.momentum_times)
            + total(&self.pressure_times);
        self.total_time.saturating_sub(accounted)
    }

    pub fn log_summary(&self) {
        if self.momentum_times.is_empty() {
            return;
        }
        info!(
            total_s = self.total_time.as_secs_f64(),
            iterations = self.iterations(),
            gradients_avg_ms = average_ms(&self.gradient_times),
            momentum_avg_ms = average_ms(&self.momentum_times),
            pressure_avg_ms = average_ms(&self.pressure_times),
            overhead_ms = self.overhead().as_secs_f64() * 1000.0,
            "Solver timing"
        );
    }
}

#[cfg(feature = "timing")]
thread_local! {
    static TIMING_STATS: RefCell<TimingStats> = RefCell::new(TimingStats::new());
}

#[cfg(feature = "timing")]
pub fn reset_timing() {
    TIMING_STATS.with(|stats| {
        *stats.borrow_mut() = TimingStats::new();
    });
}

#[cfg(not(feature = "timing"))]
pub fn reset_timing() {}

#[cfg(feature = "timing")]
fn record<F, R>(f: F, slot: fn(&mut TimingStats) -> &mut Vec<Duration>) -> R
where
    F: FnOnce() -> R,
{
    let start = std::time::Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    TIMING_STATS.with(|stats| slot(&mut stats.borrow_mut()).push(elapsed));
    result
}

#[cfg(feature = "timing")]
pub fn record_gradients<F: FnOnce() -> R, R>(f: F) -> R {
    record(f, |s| &mut s.gradient_times)
}

#[cfg(feature = "timing")]
pub fn record_momentum<F: FnOnce() -> R, R>(f: F) -> R {
    record(f, |s| &mut s.momentum_times)
}

#[cfg(feature = "timing")]
pub fn record_pressure<F: FnOnce() -> R, R>(f: F) -> R {
    record(f, |s| &mut s.pressure_times)
}

#[cfg(not(feature = "timing"))]
pub fn record_gradients<F: FnOnce() -> R, R>(f: F) -> R {
    f()
}

#[cfg(not(feature = "timing"))]
pub fn record_momentum<F: FnOnce() -> R, R>(f: F) -> R {
    f()
}

#[cfg(not(feature = "timing"))]
pub fn record_pressure<F: FnOnce() -> R, R>(f: F) -> R {
    f()
}

#[cfg(feature = "timing")]
pub fn finalize_timing(total_time: Duration) -> TimingStats {
    TIMING_STATS.with(|stats| {
        let mut s = stats.borrow_mut();
        s.total_time = total_time;
        s.clone()
    })
}

#[cfg(not(feature = "timing"))]
pub fn finalize_timing(_total_time: Duration) -> TimingStats {
    TimingStats::new()
}

pub fn finalize_and_log(total_time: Duration) {
    finalize_timing(total_time).log_summary();
}
