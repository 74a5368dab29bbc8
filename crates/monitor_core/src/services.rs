use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use shared::repo::{JobLogRepo, JobResultRepo, JobStatusRepo};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    bloc::{Bloc, BlocSettings},
    bus::EventBus,
    clock::{Clock, SystemClock},
    error::BusError,
    job_log::{LogDomain, LogEvent, LogState, DEFAULT_LOG_BUS_CAPACITY, DEFAULT_MAX_LOG_ENTRIES},
    job_result::{ResultDomain, ResultEvent, ResultState, DEFAULT_RESULT_BUS_CAPACITY},
    job_status::{StatusDomain, StatusEvent, StatusState, DEFAULT_STATUS_BUS_CAPACITY},
    scheduler::{spawn_refresh_loop, DEFAULT_REFRESH_PERIOD},
    state::State,
    store::StateStore,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    pub refresh_period: Duration,
    pub bloc: BlocSettings,
    pub max_log_entries: u32,
    pub result_bus_capacity: usize,
    pub status_bus_capacity: usize,
    pub log_bus_capacity: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            refresh_period: DEFAULT_REFRESH_PERIOD,
            bloc: BlocSettings::default(),
            max_log_entries: DEFAULT_MAX_LOG_ENTRIES,
            result_bus_capacity: DEFAULT_RESULT_BUS_CAPACITY,
            status_bus_capacity: DEFAULT_STATUS_BUS_CAPACITY,
            log_bus_capacity: DEFAULT_LOG_BUS_CAPACITY,
        }
    }
}

#[derive(Clone)]
pub struct Repositories {
    pub results: Arc<dyn JobResultRepo>,
    pub statuses: Arc<dyn JobStatusRepo>,
    pub log: Arc<dyn JobLogRepo>,
}

impl Repositories {
    /// All three domains served by one backend, e.g. a single pooled database.
    pub fn shared<T>(repo: Arc<T>) -> Self
    where
        T: JobResultRepo + JobStatusRepo + JobLogRepo + 'static,
    {
        Self {
            results: repo.clone(),
            statuses: repo.clone(),
            log: repo,
        }
    }
}

/// Running result, status and log domains plus their refresh timers.
pub struct Monitor {
    result_events: EventBus<ResultEvent>,
    result_states: StateStore<ResultState>,
    status_events: EventBus<StatusEvent>,
    status_states: StateStore<StatusState>,
    log_events: EventBus<LogEvent>,
    log_states: StateStore<LogState>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Monitor {
    /// Spawns every task on the current tokio runtime.
    pub fn start(repos: Repositories, settings: MonitorSettings) -> Result<Self, BusError> {
        Self::start_with_clock(repos, settings, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        repos: Repositories,
        settings: MonitorSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BusError> {
        info!(refresh_period = ?settings.refresh_period, "starting job monitor");

        let shutdown = CancellationToken::new();
        let result_events: EventBus<ResultEvent> =
            EventBus::new("job_results", settings.result_bus_capacity);
        let status_events: EventBus<StatusEvent> =
            EventBus::new("job_status", settings.status_bus_capacity);
        let log_events: EventBus<LogEvent> = EventBus::new("job_log", settings.log_bus_capacity);
        let result_states: StateStore<ResultState> = StateStore::new(State::Initial);
        let status_states: StateStore<StatusState> = StateStore::new(State::Initial);
        let log_states: StateStore<LogState> = StateStore::new(State::Initial);

        let blocs = [
            Bloc::new(
                ResultDomain::new(repos.results),
                result_events.subscribe()?,
                result_states.clone(),
                settings.bloc,
            )
            .with_clock(clock.clone())
            .spawn(shutdown.child_token()),
            Bloc::new(
                StatusDomain::new(repos.statuses),
                status_events.subscribe()?,
                status_states.clone(),
                settings.bloc,
            )
            .with_clock(clock.clone())
            .spawn(shutdown.child_token()),
            Bloc::new(
                LogDomain::new(repos.log, settings.max_log_entries),
                log_events.subscribe()?,
                log_states.clone(),
                settings.bloc,
            )
            .with_clock(clock)
            .spawn(shutdown.child_token()),
        ];

        let period = settings.refresh_period;
        let timers = [
            spawn_refresh_loop(result_events.clone(), period, shutdown.child_token()),
            spawn_refresh_loop(status_events.clone(), period, shutdown.child_token()),
            spawn_refresh_loop(log_events.clone(), period, shutdown.child_token()),
        ];

        Ok(Self {
            result_events,
            result_states,
            status_events,
            status_states,
            log_events,
            log_states,
            shutdown,
            tasks: blocs.into_iter().chain(timers).collect(),
        })
    }

    pub fn result_events(&self) -> &EventBus<ResultEvent> {
        &self.result_events
    }

    pub fn result_states(&self) -> &StateStore<ResultState> {
        &self.result_states
    }

    pub fn status_events(&self) -> &EventBus<StatusEvent> {
        &self.status_events
    }

    pub fn status_states(&self) -> &StateStore<StatusState> {
        &self.status_states
    }

    pub fn log_events(&self) -> &EventBus<LogEvent> {
        &self.log_events
    }

    pub fn log_states(&self) -> &StateStore<LogState> {
        &self.log_states
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancels every bloc and timer and waits for them to wind down.
    /// In-flight repository calls are abandoned.
    pub async fn stop(self) {
        info!("stopping job monitor");
        self.shutdown.cancel();
        self.result_events.close();
        self.status_events.close();
        self.log_events.close();

        for joined in join_all(self.tasks).await {
            if let Err(err) = joined {
                error!(error = %err, "monitor task ended abnormally");
            }
        }
        info!("job monitor stopped");
    }
}

#[cfg(test)]
#[path = "tests/services_tests.rs"]
mod tests;
