//! Serialized event-to-state engine shared by the result, status and log tabs.
//!
//! One [`Bloc`] owns one domain's filter values and last fetched rows. It pulls
//! events off that domain's [`EventBus`] strictly one at a time, runs the
//! repository call the event asks for under a cycle timeout, and publishes an
//! immutable [`State`] snapshot to the domain's [`StateStore`]. Failures are
//! contained to the cycle that produced them: the bloc publishes
//! [`State::Error`], waits out a fixed cooldown and keeps consuming events.

use std::{fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    bus::EventReceiver,
    clock::{Clock, SystemClock},
    error::CycleError,
    state::{job_name_options, Intent, State},
    store::StateStore,
};

pub const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_FAILURE_COOLDOWN: Duration = Duration::from_secs(10);

/// Domain-specific half of a bloc: what to fetch and how rows are presented.
#[async_trait]
pub trait Domain: Send + Sync + 'static {
    const NAME: &'static str;

    type Row: Clone + Debug + Send + Sync + 'static;
    type Filter: Clone + Debug + Default + PartialEq + Send + Sync + 'static;
    type Event: Debug + Send + 'static + Into<Intent<Self::Filter>>;

    async fn fetch(&self, filter: &Self::Filter) -> anyhow::Result<Vec<Self::Row>>;

    fn job_name(row: &Self::Row) -> &str;

    /// Rows shown for `filter` out of the last fetch. Domains filtered by the
    /// store return the fetch unchanged.
    fn view(&self, fetched: &Arc<Vec<Self::Row>>, _filter: &Self::Filter) -> Arc<Vec<Self::Row>> {
        Arc::clone(fetched)
    }

    /// `false` when filter changes are applied to the cached fetch instead of
    /// triggering a new repository call.
    fn refetch_on_filter_change(&self) -> bool {
        true
    }
}

pub type DomainState<D> = State<<D as Domain>::Row, <D as Domain>::Filter>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlocSettings {
    pub cycle_timeout: Duration,
    pub failure_cooldown: Duration,
}

impl Default for BlocSettings {
    fn default() -> Self {
        Self {
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
            failure_cooldown: DEFAULT_FAILURE_COOLDOWN,
        }
    }
}

pub struct Bloc<D: Domain> {
    domain: D,
    events: EventReceiver<D::Event>,
    states: StateStore<DomainState<D>>,
    settings: BlocSettings,
    clock: Arc<dyn Clock>,
    filter: D::Filter,
    fetched: Arc<Vec<D::Row>>,
    latest_refresh: Option<NaiveDateTime>,
}

impl<D: Domain> Bloc<D> {
    pub fn new(
        domain: D,
        events: EventReceiver<D::Event>,
        states: StateStore<DomainState<D>>,
        settings: BlocSettings,
    ) -> Self {
        Self {
            domain,
            events,
            states,
            settings,
            clock: Arc::new(SystemClock),
            filter: D::Filter::default(),
            fetched: Arc::new(Vec::new()),
            latest_refresh: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Consumes events until `shutdown` fires or the bus is closed and drained.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(domain = D::NAME, "bloc started");

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(event) => event,
                    None => {
                        info!(domain = D::NAME, "event bus closed");
                        break;
                    }
                },
            };
            debug!(domain = D::NAME, ?event, "received event");

            let outcome = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                outcome = self.process(event.into()) => outcome,
            };

            if let Err(err) = outcome {
                if !self.recover(err, &shutdown).await {
                    break;
                }
            }
        }

        info!(domain = D::NAME, "bloc closed");
    }

    async fn process(&mut self, intent: Intent<D::Filter>) -> Result<(), CycleError> {
        let limit = self.settings.cycle_timeout;
        tokio::time::timeout(limit, self.handle(intent))
            .await
            .map_err(|_| CycleError::TimedOut(limit))?
    }

    async fn handle(&mut self, intent: Intent<D::Filter>) -> Result<(), CycleError> {
        match intent {
            Intent::Refresh => {
                self.publish_loading();
                self.refresh().await
            }
            Intent::FilterChanged(filter) => {
                debug!(domain = D::NAME, ?filter, "filter changed");
                self.filter = filter;
                if let (false, Some(latest_refresh)) =
                    (self.domain.refetch_on_filter_change(), self.latest_refresh)
                {
                    self.publish_loaded(None, latest_refresh);
                    return Ok(());
                }
                self.publish_loading();
                self.refresh().await
            }
            Intent::SelectRow(index) => self.select_row(index),
            Intent::ReportError(message) => {
                warn!(domain = D::NAME, %message, "error reported");
                self.publish_error(message);
                Ok(())
            }
        }
    }

    async fn refresh(&mut self) -> Result<(), CycleError> {
        let rows = self
            .domain
            .fetch(&self.filter)
            .await
            .map_err(CycleError::Fetch)?;

        let now = self.clock.now();
        let latest_refresh = match self.latest_refresh {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        self.latest_refresh = Some(latest_refresh);
        self.fetched = Arc::new(rows);

        debug!(domain = D::NAME, rows = self.fetched.len(), "fetch complete");
        self.publish_loaded(None, latest_refresh);
        Ok(())
    }

    fn select_row(&mut self, index: usize) -> Result<(), CycleError> {
        let current = self.states.current();
        let latest_refresh = match (&current, self.latest_refresh) {
            (State::Initial | State::Error { .. }, _) | (_, None) => {
                return Err(CycleError::IllegalTransition {
                    event: "row_selected",
                    state: current.kind(),
                });
            }
            (_, Some(latest_refresh)) => latest_refresh,
        };

        let rows = current.rows().len();
        if index >= rows {
            return Err(CycleError::RowOutOfRange { index, rows });
        }

        self.publish_loaded(Some(index), latest_refresh);
        Ok(())
    }

    /// Rows and options currently on screen, kept while a new fetch runs.
    fn on_screen(&self) -> (Arc<Vec<D::Row>>, Arc<Vec<String>>) {
        match self.states.current() {
            State::Initial => (Arc::new(Vec::new()), Arc::new(Vec::new())),
            State::Loading { rows, options, .. }
            | State::Loaded { rows, options, .. }
            | State::Error { rows, options, .. } => (rows, options),
        }
    }

    fn publish_loading(&self) {
        let (rows, options) = self.on_screen();
        self.states.emit(State::Loading {
            rows,
            options,
            filter: self.filter.clone(),
            latest_refresh: self.latest_refresh,
        });
    }

    fn publish_loaded(&self, selected_row: Option<usize>, latest_refresh: NaiveDateTime) {
        let options = job_name_options(self.fetched.iter().map(D::job_name));
        self.states.emit(State::Loaded {
            rows: self.domain.view(&self.fetched, &self.filter),
            options: Arc::new(options),
            filter: self.filter.clone(),
            selected_row,
            latest_refresh,
        });
    }

    fn publish_error(&self, message: String) {
        let (rows, options) = self.on_screen();
        self.states.emit(State::Error {
            message,
            rows,
            options,
            filter: self.filter.clone(),
            latest_refresh: self.latest_refresh,
        });
    }

    /// Returns `false` when shutdown arrived during the cooldown.
    async fn recover(&mut self, err: CycleError, shutdown: &CancellationToken) -> bool {
        if err.is_contract_violation() {
            error!(
                domain = D::NAME,
                state = self.states.current().kind(),
                error = %err,
                "contract violation; event rejected"
            );
            return true;
        }

        error!(
            domain = D::NAME,
            error = %err,
            details = ?err,
            cooldown = ?self.settings.failure_cooldown,
            "refresh cycle failed"
        );
        self.publish_error(err.to_string());

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => false,
            _ = tokio::time::sleep(self.settings.failure_cooldown) => true,
        }
    }
}

#[cfg(test)]
#[path = "tests/bloc_tests.rs"]
mod tests;
