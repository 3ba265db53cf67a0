//! Tick scheduling.
//!
//! The scheduler is cooperative and single-threaded: it owns the running
//! flag and the tick policy, and drives a handler with millisecond
//! timestamps. Frame mode expects the host to call [`Scheduler::tick`]
//! itself; interval mode can be driven by [`Scheduler::run_interval`].
//!
//! A handler error stops the loop and stays stopped until restarted; it
//! never tears down the process.

use crate::error::RuntimeError;
use reflex_compiler::ir::TickIr;
use std::time::{Duration, Instant};
use tracing::error;

pub struct Scheduler<F> {
    tick: TickIr,
    handler: F,
    running: bool,
    ticks: u64,
}

impl<F> Scheduler<F>
where
    F: FnMut(f64) -> Result<(), RuntimeError>,
{
    pub fn new(tick: TickIr, handler: F) -> Self {
        Self {
            tick,
            handler,
            running: false,
            ticks: 0,
        }
    }

    /// Idempotent.
    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick at host time `now` (ms). No-op while stopped.
    pub fn tick(&mut self, now: f64) {
        if !self.running {
            return;
        }
        self.ticks += 1;
        if let Err(err) = (self.handler)(now) {
            error!(%err, tick = self.ticks, "step failed, stopping loop");
            self.stop();
        }
    }

    /// Drive an interval-mode scheduler for up to `max_ticks` ticks, or
    /// until stopped. Returns immediately in frame mode, where the host
    /// owns the clock.
    pub async fn run_interval(&mut self, max_ticks: u64) {
        let TickIr::Interval { ms } = self.tick else {
            return;
        };
        self.start();
        let started = Instant::now();
        // tokio panics on a zero period; validation rejects `tick = 0ms`,
        // but hand-built IR still gets a floor of 1us here.
        let period = Duration::from_micros(((ms * 1000.0) as u64).max(1));
        let mut interval = tokio::time::interval(period);
        // The first tick of a tokio interval fires immediately; skip it so
        // ticks land at t >= ms like a host timer would.
        interval.tick().await;
        while self.running && self.ticks < max_ticks {
            interval.tick().await;
            let now = started.elapsed().as_secs_f64() * 1000.0;
            self.tick(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_is_noop_until_started() {
        let mut count = 0;
        let mut sched = Scheduler::new(TickIr::Raf, |_| {
            count += 1;
            Ok(())
        });
        sched.tick(1.0);
        sched.start();
        sched.tick(2.0);
        sched.tick(3.0);
        sched.stop();
        sched.tick(4.0);
        drop(sched);
        assert_eq!(count, 2);
    }

    #[test]
    fn handler_error_stops_the_loop() {
        let mut sched = Scheduler::new(TickIr::Raf, |now| {
            if now > 5.0 {
                Err(RuntimeError::UnknownModule("gone".into()))
            } else {
                Ok(())
            }
        });
        sched.start();
        sched.tick(1.0);
        assert!(sched.is_running());
        sched.tick(10.0);
        assert!(!sched.is_running());
        // Stays stopped, but can be restarted.
        sched.tick(1.0);
        assert_eq!(sched.ticks(), 2);
        sched.start();
        sched.tick(1.0);
        assert_eq!(sched.ticks(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_driver_honors_tick_budget() {
        let mut count = 0u32;
        {
            let mut sched = Scheduler::new(TickIr::Interval { ms: 10.0 }, |_| {
                count += 1;
                Ok(())
            });
            sched.run_interval(5).await;
            assert_eq!(sched.ticks(), 5);
        }
        assert_eq!(count, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_driver_survives_a_zero_period() {
        let mut sched = Scheduler::new(TickIr::Interval { ms: 0.0 }, |_| Ok(()));
        sched.run_interval(3).await;
        assert_eq!(sched.ticks(), 3);
    }

    #[tokio::test]
    async fn interval_driver_is_noop_in_frame_mode() {
        let mut sched = Scheduler::new(TickIr::Raf, |_| Ok(()));
        sched.run_interval(100).await;
        assert_eq!(sched.ticks(), 0);
        assert!(!sched.is_running());
    }
}
