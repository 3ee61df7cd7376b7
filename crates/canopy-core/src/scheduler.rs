//! Background jobs: market sweep, plant tick, weather cycle.
//!
//! Each job runs on its own tokio task at the cadence in
//! [`ScheduleConfig`]. A job that fails logs and waits for its next turn;
//! one failed sweep never stops the loop. All jobs stop when the shared
//! [`Shutdown`] is triggered.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use canopy_world::WeatherBoard;

use crate::config::ScheduleConfig;
use crate::service::GameService;
use crate::store::GameStore;

// ---------------------------------------------------------------------------
// Shutdown signal
// ---------------------------------------------------------------------------

/// A one-way stop signal shared by every background task.
#[derive(Debug, Default)]
pub struct Shutdown {
    triggered: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    /// Create an untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every task to stop. Idempotent.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::AcqRel) {
            info!("shutdown requested");
        }
        self.notify.notify_waiters();
    }

    /// Whether [`trigger`](Self::trigger) has been called.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Resolve once the signal has been triggered.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Spawns and owns the background job tasks.
#[derive(Debug)]
pub struct Scheduler<S> {
    service: Arc<GameService<S>>,
    board: Arc<WeatherBoard>,
    schedule: ScheduleConfig,
    shutdown: Arc<Shutdown>,
}

impl<S: GameStore + 'static> Scheduler<S> {
    /// Create a scheduler. Nothing runs until [`spawn`](Self::spawn).
    pub const fn new(
        service: Arc<GameService<S>>,
        board: Arc<WeatherBoard>,
        schedule: ScheduleConfig,
        shutdown: Arc<Shutdown>,
    ) -> Self {
        Self {
            service,
            board,
            schedule,
            shutdown,
        }
    }

    /// Start every job. The first run of each happens immediately.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        info!(
            market_sweep_secs = self.schedule.market_sweep_secs,
            plant_tick_secs = self.schedule.plant_tick_secs,
            weather_cycle_secs = self.schedule.weather_cycle_secs,
            "scheduler starting"
        );

        let weather = {
            let service = Arc::clone(&self.service);
            let board = Arc::clone(&self.board);
            spawn_job(
                "weather_cycle",
                self.schedule.weather_cycle_secs,
                Arc::clone(&self.shutdown),
                move || {
                    service.run_weather_cycle(&board);
                },
            )
        };

        let market = {
            let service = Arc::clone(&self.service);
            spawn_job(
                "market_sweep",
                self.schedule.market_sweep_secs,
                Arc::clone(&self.shutdown),
                move || {
                    if let Err(err) = service.run_market_sweep() {
                        warn!(error = %err, "market sweep failed");
                    }
                },
            )
        };

        let plants = {
            let service = Arc::clone(&self.service);
            spawn_job(
                "plant_tick",
                self.schedule.plant_tick_secs,
                Arc::clone(&self.shutdown),
                move || {
                    if let Err(err) = service.tick_all_plants() {
                        warn!(error = %err, "plant tick failed");
                    }
                },
            )
        };

        vec![weather, market, plants]
    }
}

/// Run `job` every `period_secs` until `shutdown` fires.
///
/// Jobs take blocking row locks, so each run goes to the blocking pool and
/// the runtime workers stay free. A run that panics is logged and the loop
/// carries on.
pub fn spawn_job(
    name: &'static str,
    period_secs: u64,
    shutdown: Arc<Shutdown>,
    job: impl Fn() + Send + Sync + 'static,
) -> JoinHandle<()> {
    let job = Arc::new(job);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(period_secs.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.wait() => break,
                _ = interval.tick() => {
                    let run = Arc::clone(&job);
                    if let Err(err) = tokio::task::spawn_blocking(move || run()).await {
                        warn!(job = name, error = %err, "background job panicked");
                    }
                }
            }
        }
        info!(job = name, "background job stopped");
    })
}
