//! Reactive core of the ETL job monitor.
//!
//! Each monitored domain (job results, job statuses, job log) gets an
//! [`EventBus`] for intents, a [`StateStore`] holding the latest snapshot and a
//! [`Bloc`] that turns the former into the latter. [`Monitor`] wires the three
//! domains together with their refresh timers and owns shutdown.

pub mod bloc;
pub mod bus;
pub mod clock;
pub mod error;
pub mod job_log;
pub mod job_result;
pub mod job_status;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod store;

pub use bloc::{Bloc, BlocSettings, Domain, DomainState};
pub use bus::{EventBus, EventReceiver, Published, RefreshEvent};
pub use clock::{Clock, SystemClock};
pub use error::{BusError, CycleError};
pub use job_log::{LogDomain, LogEvent, LogFilters, LogState};
pub use job_result::{ResultDomain, ResultEvent, ResultFilters, ResultState};
pub use job_status::{StatusDomain, StatusEvent, StatusFilters, StatusState};
pub use services::{Monitor, MonitorSettings, Repositories};
pub use state::{Intent, State};
pub use store::StateStore;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
