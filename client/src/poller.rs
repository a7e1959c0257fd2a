//! Status polling for asynchronously processed EEG records.
//!
//! A poll sequence re-reads one record on a fixed interval until the backend
//! reports a terminal status, the attempt budget runs out, a fetch fails, or the
//! caller cancels it. Sequences are independent; nothing coordinates them.

use shared::EegRecord;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::api::EegRecordsApi;
use crate::http::ApiError;

/// Something that can return the current state of a record.
pub trait RecordSource: Send + Sync {
    fn fetch_record(&self, id: &str) -> impl Future<Output = Result<EegRecord, ApiError>> + Send;
}

impl RecordSource for EegRecordsApi {
    async fn fetch_record(&self, id: &str) -> Result<EegRecord, ApiError> {
        self.get(id).await
    }
}

/// Stand-in deadline for intervals too long to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub max_retries: u32,
    pub interval: Duration,
}

impl Default for PollOptions {
    /// Ten minutes at five-second intervals.
    fn default() -> Self {
        Self {
            max_retries: 120,
            interval: Duration::from_millis(5000),
        }
    }
}

impl PollOptions {
    /// Total wall-clock budget of a sequence, saturating at [`Duration::MAX`].
    pub fn budget(&self) -> Duration {
        self.interval
            .checked_mul(self.max_retries)
            .unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("EEG processing timeout after {seconds}s")]
    Timeout { seconds: f64 },
    #[error(transparent)]
    Fetch(#[from] ApiError),
    #[error("status polling was cancelled")]
    Cancelled,
}

/// Cloneable cancellation flag shared between a poll sequence and its owner.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Whether both tokens control the same sequence.
    pub fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.flag, &other.flag)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut flag = self.flag.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = flag.wait_for(|cancelled| *cancelled).await;
    }
}

/// Polls record `id` until it settles.
///
/// `on_change` runs whenever the observed status differs from the previous
/// observation, including the first one. A record that ends up `failed` is
/// still returned as `Ok`; only timeouts, fetch errors and cancellation are
/// errors.
pub async fn poll_status<S, F>(
    source: &S,
    id: &str,
    options: PollOptions,
    mut on_change: F,
    cancel: &CancelToken,
) -> Result<EegRecord, PollError>
where
    S: RecordSource,
    F: FnMut(&EegRecord),
{
    let timeout = PollError::Timeout {
        seconds: options.budget().as_secs_f64(),
    };
    if options.max_retries == 0 {
        return Err(timeout);
    }

    let period = options.interval.max(Duration::from_millis(1));
    let now = Instant::now();
    let first_tick = now.checked_add(period).unwrap_or_else(|| now + FAR_FUTURE);
    let mut ticker = time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_status = None;
    for attempt in 1..=options.max_retries {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            _ = ticker.tick() => {}
        }

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            fetched = source.fetch_record(id) => fetched,
        };
        let record = match fetched {
            Ok(record) => record,
            Err(e) => {
                log::error!("Polling {} failed on attempt {}: {}", id, attempt, e);
                return Err(PollError::Fetch(e));
            }
        };

        if last_status != Some(record.status) {
            log::debug!("Record {} is now {}", id, record.status);
            last_status = Some(record.status);
            on_change(&record);
        }

        if record.status.is_terminal() {
            log::info!("Record {} finished as {} after {} polls", id, record.status, attempt);
            return Ok(record);
        }
    }

    log::warn!("Record {} still not processed after {} polls", id, options.max_retries);
    Err(timeout)
}

/// Owner's side of a spawned poll sequence. Dropping it cancels the sequence.
#[derive(Debug)]
pub struct PollHandle {
    cancel: CancelToken,
    task: Option<JoinHandle<Result<EegRecord, PollError>>>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the sequence to settle.
    pub async fn join(mut self) -> Result<EegRecord, PollError> {
        let Some(task) = self.task.take() else {
            return Err(PollError::Cancelled);
        };

        match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(PollError::Cancelled),
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel.cancel();
        }
    }
}

/// Runs [`poll_status`] on its own task.
pub fn spawn_poll<S, F>(source: S, id: impl Into<String>, options: PollOptions, on_change: F) -> PollHandle
where
    S: RecordSource + 'static,
    F: FnMut(&EegRecord) + Send + 'static,
{
    let id = id.into();
    let cancel = CancelToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move { poll_status(&source, &id, options, on_change, &token).await });

    PollHandle {
        cancel,
        task: Some(task),
    }
}
