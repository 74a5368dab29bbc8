//! Fakes shared by the bloc, domain and service tests.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use shared::{
    domain::{JobLogEntry, JobResult, JobStatus, LogLevel, ResultFilter, StatusLabel},
    repo::{JobLogRepo, JobResultRepo, JobStatusRepo},
};

use crate::{
    clock::Clock, job_log::LogState, job_result::ResultState, job_status::StatusState,
    store::StateStore,
};

pub fn ts(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|day| day.and_hms_opt(hour, minute, second))
        .expect("valid timestamp")
}

pub fn job_result(job_name: &str, result: &str) -> JobResult {
    JobResult {
        job_name: job_name.to_string(),
        start: ts(1, 0, 0),
        end: ts(1, 5, 0),
        result: result.to_string(),
        skip_reason: None,
        error_message: None,
    }
}

pub fn job_status(job_name: &str, status: StatusLabel) -> JobStatus {
    JobStatus {
        job_name: job_name.to_string(),
        status,
        error_message: None,
        skip_reason: None,
        ts: ts(2, 0, 0),
    }
}

pub fn log_entry(job_name: &str, level: LogLevel, message: &str) -> JobLogEntry {
    JobLogEntry {
        job_name: job_name.to_string(),
        level,
        message: message.to_string(),
        ts: ts(3, 0, 0),
    }
}

pub enum Reply<T> {
    Rows(Vec<T>),
    Fail(&'static str),
    Hang,
}

/// Replays queued replies, then keeps answering with `fallback`.
pub struct Script<T> {
    replies: Mutex<VecDeque<Reply<T>>>,
    fallback: Vec<T>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<T: Clone> Script<T> {
    pub fn new(fallback: Vec<T>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn then(self, reply: Reply<T>) -> Self {
        self.replies.lock().expect("replies").push_back(reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn next(&self) -> Result<Vec<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        let reply = self.replies.lock().expect("replies").pop_front();
        match reply.unwrap_or_else(|| Reply::Rows(self.fallback.clone())) {
            Reply::Rows(rows) => {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(rows)
            }
            Reply::Fail(message) => Err(anyhow!(message)),
            Reply::Hang => future::pending().await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultCall {
    Latest {
        prefix: String,
        filter: ResultFilter,
    },
    ForJob {
        job_name: String,
        filter: ResultFilter,
    },
}

/// Records each call and the state that was on screen when it was made.
pub struct FakeResultRepo {
    pub script: Script<JobResult>,
    pub calls: Mutex<Vec<ResultCall>>,
    pub seen: Mutex<Vec<ResultState>>,
    states: StateStore<ResultState>,
}

impl FakeResultRepo {
    pub fn new(script: Script<JobResult>, states: StateStore<ResultState>) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
            seen: Mutex::new(Vec::new()),
            states,
        }
    }

    pub fn calls(&self) -> Vec<ResultCall> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn seen(&self) -> Vec<ResultState> {
        self.seen.lock().expect("seen").clone()
    }

    async fn record(&self, call: ResultCall) -> Result<Vec<JobResult>> {
        self.calls.lock().expect("calls").push(call);
        self.seen.lock().expect("seen").push(self.states.current());
        self.script.next().await
    }
}

#[async_trait]
impl JobResultRepo for FakeResultRepo {
    async fn fetch_latest(
        &self,
        job_name_prefix: &str,
        filter: ResultFilter,
    ) -> Result<Vec<JobResult>> {
        self.record(ResultCall::Latest {
            prefix: job_name_prefix.to_string(),
            filter,
        })
        .await
    }

    async fn fetch_for_job(&self, job_name: &str, filter: ResultFilter) -> Result<Vec<JobResult>> {
        self.record(ResultCall::ForJob {
            job_name: job_name.to_string(),
            filter,
        })
        .await
    }
}

pub struct FakeStatusRepo {
    pub script: Script<JobStatus>,
    pub seen: Mutex<Vec<StatusState>>,
    states: StateStore<StatusState>,
}

impl FakeStatusRepo {
    pub fn new(script: Script<JobStatus>, states: StateStore<StatusState>) -> Self {
        Self {
            script,
            seen: Mutex::new(Vec::new()),
            states,
        }
    }
}

#[async_trait]
impl JobStatusRepo for FakeStatusRepo {
    async fn fetch_all_latest(&self) -> Result<Vec<JobStatus>> {
        self.seen.lock().expect("seen").push(self.states.current());
        self.script.next().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogCall {
    pub prefix: String,
    pub level: LogLevel,
    pub max_rows: u32,
}

pub struct FakeLogRepo {
    pub script: Script<JobLogEntry>,
    pub calls: Mutex<Vec<LogCall>>,
    pub seen: Mutex<Vec<LogState>>,
    states: StateStore<LogState>,
}

impl FakeLogRepo {
    pub fn new(script: Script<JobLogEntry>, states: StateStore<LogState>) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
            seen: Mutex::new(Vec::new()),
            states,
        }
    }

    pub fn calls(&self) -> Vec<LogCall> {
        self.calls.lock().expect("calls").clone()
    }
}

#[async_trait]
impl JobLogRepo for FakeLogRepo {
    async fn fetch_filtered(
        &self,
        job_name_prefix: &str,
        level: LogLevel,
        max_rows: u32,
    ) -> Result<Vec<JobLogEntry>> {
        self.calls.lock().expect("calls").push(LogCall {
            prefix: job_name_prefix.to_string(),
            level,
            max_rows,
        });
        self.seen.lock().expect("seen").push(self.states.current());
        self.script.next().await
    }
}

/// Hands out queued readings, repeating the last one when exhausted.
pub struct ScriptedClock {
    readings: Mutex<VecDeque<NaiveDateTime>>,
    last: Mutex<NaiveDateTime>,
}

impl ScriptedClock {
    pub fn new(readings: impl IntoIterator<Item = NaiveDateTime>) -> Self {
        let readings: VecDeque<_> = readings.into_iter().collect();
        let last = readings.front().copied().unwrap_or_else(|| ts(0, 0, 0));
        Self {
            readings: Mutex::new(readings),
            last: Mutex::new(last),
        }
    }
}

impl Clock for ScriptedClock {
    fn now(&self) -> NaiveDateTime {
        let mut last = self.last.lock().expect("last");
        if let Some(next) = self.readings.lock().expect("readings").pop_front() {
            *last = next;
        }
        *last
    }
}

/// Waits until the store holds a state matching `pred`.
pub async fn wait_for<S: Clone>(
    store: &StateStore<S>,
    what: &str,
    pred: impl Fn(&S) -> bool,
) -> S {
    let mut rx = store.subscribe();
    let waited = tokio::time::timeout(Duration::from_secs(3600), async {
        loop {
            {
                let state = rx.borrow_and_update();
                if pred(&state) {
                    return state.clone();
                }
            }
            rx.changed().await.expect("state store alive");
        }
    })
    .await;
    waited.unwrap_or_else(|_| panic!("timed out waiting for {what}"))
}
