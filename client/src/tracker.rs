//! Wires uploads to status polls and the notification registry.

use shared::EegRecord;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{oneshot, watch};

use crate::api::{EegRecordsApi, EegUpload};
use crate::http::ApiError;
use crate::notifications::{NotificationEntry, NotificationRegistry, NotificationUpdate};
use crate::poller::{CancelToken, PollError, PollOptions, spawn_poll};

type ActivePolls = Arc<Mutex<HashMap<String, CancelToken>>>;

/// A record being followed by the tracker.
#[derive(Debug)]
pub struct TrackedUpload {
    pub record: EegRecord,
    outcome: oneshot::Receiver<Result<EegRecord, PollError>>,
}

impl TrackedUpload {
    /// Waits for the poll sequence behind this upload to settle.
    pub async fn finished(self) -> Result<EegRecord, PollError> {
        self.outcome.await.unwrap_or(Err(PollError::Cancelled))
    }
}

/// Owns the notification registry and the poll sequences feeding it.
///
/// Observers get a [`watch::Receiver`] and re-render whenever a sequence
/// changes an entry. Dropping the tracker cancels every running sequence.
pub struct ProcessingTracker {
    records: EegRecordsApi,
    options: PollOptions,
    registry: Arc<watch::Sender<NotificationRegistry>>,
    polls: ActivePolls,
}

impl ProcessingTracker {
    pub fn new(records: EegRecordsApi, options: PollOptions) -> Self {
        let (registry, _) = watch::channel(NotificationRegistry::new());
        Self {
            records,
            options,
            registry: Arc::new(registry),
            polls: Arc::default(),
        }
    }

    /// Uploads the file and starts following the record the backend created.
    pub async fn track_upload(
        &self,
        upload: EegUpload,
        patient_name: impl Into<String>,
    ) -> Result<TrackedUpload, ApiError> {
        let record = self.records.upload(upload).await?;
        Ok(self.track_existing(record, patient_name))
    }

    /// Follows a record that already exists. Must run inside a Tokio runtime.
    pub fn track_existing(&self, record: EegRecord, patient_name: impl Into<String>) -> TrackedUpload {
        let id = record.id.clone();
        let entry = NotificationEntry::from_record(&record, patient_name);
        self.registry.send_modify(|registry| registry.add(entry));

        let (done, outcome) = oneshot::channel();
        if record.status.is_terminal() {
            let _ = done.send(Ok(record.clone()));
            return TrackedUpload { record, outcome };
        }

        let registry = Arc::clone(&self.registry);
        let on_change = move |observed: &EegRecord| {
            registry.send_modify(|registry| {
                registry.update(&observed.id, NotificationUpdate::from_record(observed));
            });
        };
        let handle = spawn_poll(self.records.clone(), id.clone(), self.options, on_change);
        let token = handle.cancel_token();

        if let Some(previous) = lock(&self.polls).insert(id.clone(), token.clone()) {
            previous.cancel();
        }

        let registry = Arc::clone(&self.registry);
        let polls = Arc::clone(&self.polls);
        tokio::spawn(async move {
            let outcome = handle.join().await;
            match &outcome {
                Ok(_) | Err(PollError::Cancelled) => {}
                Err(e) => {
                    let message = e.to_string();
                    registry.send_modify(|registry| {
                        registry.update(&id, NotificationUpdate::failed(message));
                    });
                }
            }

            let mut polls = lock(&polls);
            if polls.get(&id).is_some_and(|active| active.same_as(&token)) {
                polls.remove(&id);
            }
            drop(polls);

            let _ = done.send(outcome);
        });

        TrackedUpload { record, outcome }
    }

    /// Stops following `id`; its entry keeps the last observed state.
    pub fn cancel(&self, id: &str) -> bool {
        match lock(&self.polls).remove(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Removes the entry and stops any sequence still feeding it.
    pub fn dismiss(&self, id: &str) -> Option<NotificationEntry> {
        self.cancel(id);
        let mut dismissed = None;
        self.registry.send_modify(|registry| dismissed = registry.dismiss(id));
        dismissed
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationRegistry> {
        self.registry.subscribe()
    }

    pub fn snapshot(&self) -> NotificationRegistry {
        self.registry.borrow().clone()
    }

    pub fn active_polls(&self) -> usize {
        lock(&self.polls).len()
    }
}

impl Drop for ProcessingTracker {
    fn drop(&mut self) {
        for (_, token) in lock(&self.polls).drain() {
            token.cancel();
        }
    }
}

fn lock(polls: &Mutex<HashMap<String, CancelToken>>) -> MutexGuard<'_, HashMap<String, CancelToken>> {
    polls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
