mod support;

use client::api::EegUpload;
use client::poller::poll_status;
use client::{CancelToken, PollError, PollOptions, ProcessingTracker};
use serde_json::json;
use shared::EegStatus;
use std::time::Duration;
use support::{FakeApi, Reply, processed_record, record};

const RECORD_PATH: &str = "/api/eeg-records/41";

fn fast(max_retries: u32) -> PollOptions {
    PollOptions {
        max_retries,
        interval: Duration::from_millis(20),
    }
}

async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("timed out")
}

#[tokio::test]
async fn upload_is_tracked_until_processed() {
    let fake = FakeApi::start();
    fake.route("POST", "/api/eeg-records/upload", [Reply::Json(201, record(41, "pending"))]);
    fake.route(
        "GET",
        RECORD_PATH,
        [
            Reply::ok(record(41, "processing")),
            Reply::ok(processed_record(41, 4200)),
        ],
    );

    let api = fake.api_with_token("tok");
    let tracker = ProcessingTracker::new(api.eeg_records(), fast(20));
    let updates = tracker.subscribe();

    let upload = EegUpload::new("12", "3", "subject_01.edf", vec![1, 2, 3]);
    let tracked = tracker.track_upload(upload, "Ana Mora").await.unwrap();

    let first = tracker.snapshot();
    assert_eq!(first.len(), 1);
    let entry = first.get("41").unwrap();
    assert_eq!(entry.status, EegStatus::Pending);
    assert_eq!(entry.patient_name, "Ana Mora");
    assert_eq!(first.revision(), 1);
    assert!(updates.has_changed().unwrap());

    let settled = within(tracked.finished()).await.unwrap();
    assert_eq!(settled.status, EegStatus::Processed);

    let registry = tracker.snapshot();
    assert_eq!(registry.len(), 1);
    // processing, then processed: one merge per status change
    assert_eq!(registry.revision() - first.revision(), 2);
    let entry = registry.get("41").unwrap();
    assert_eq!(entry.status, EegStatus::Processed);
    assert_eq!(entry.elapsed().as_deref(), Some("4.20s"));
    assert!(registry.to_string().contains("Analysis completed successfully"));

    assert_eq!(fake.requests_to("GET", RECORD_PATH).len(), 2);
    assert_eq!(tracker.active_polls(), 0);
}

#[tokio::test]
async fn callbacks_fire_once_per_status_change_over_http() {
    let fake = FakeApi::start();
    fake.route(
        "GET",
        RECORD_PATH,
        [
            Reply::ok(record(41, "processing")),
            Reply::ok(record(41, "processing")),
            Reply::ok(processed_record(41, 4200)),
        ],
    );

    let records = fake.api_with_token("tok").eeg_records();
    let mut seen = Vec::new();
    let record = within(poll_status(
        &records,
        "41",
        fast(10),
        |r| seen.push(r.status),
        &CancelToken::new(),
    ))
    .await
    .unwrap();

    assert_eq!(seen, [EegStatus::Processing, EegStatus::Processed]);
    assert_eq!(record.processing_time_ms, Some(4200));
    assert_eq!(fake.requests_to("GET", RECORD_PATH).len(), 3);
}

#[tokio::test]
async fn fetch_failure_marks_the_entry_failed() {
    let fake = FakeApi::start();
    fake.route(
        "GET",
        RECORD_PATH,
        [
            Reply::ok(record(41, "processing")),
            Reply::Json(500, json!({ "error": "Inference worker crashed" })),
        ],
    );

    let api = fake.api_with_token("tok");
    let tracker = ProcessingTracker::new(api.eeg_records(), fast(20));
    let tracked = tracker.track_existing(
        serde_json::from_value(record(41, "pending")).unwrap(),
        "Ana Mora",
    );

    let err = within(tracked.finished()).await.unwrap_err();
    assert!(matches!(err, PollError::Fetch(_)));

    let entry = tracker.snapshot().get("41").cloned().unwrap();
    assert_eq!(entry.status, EegStatus::Failed);
    assert_eq!(entry.error(), Some("Inference worker crashed (HTTP 500)"));
    assert_eq!(fake.requests_to("GET", RECORD_PATH).len(), 2);
}

#[tokio::test]
async fn exhausted_budget_marks_the_entry_failed_with_timeout() {
    let fake = FakeApi::start();
    fake.route("GET", RECORD_PATH, [Reply::ok(record(41, "processing"))]);

    let api = fake.api_with_token("tok");
    let tracker = ProcessingTracker::new(api.eeg_records(), fast(3));
    let tracked = tracker.track_existing(
        serde_json::from_value(record(41, "pending")).unwrap(),
        "Ana Mora",
    );

    let err = within(tracked.finished()).await.unwrap_err();
    assert_eq!(err.to_string(), "EEG processing timeout after 0.06s");

    let entry = tracker.snapshot().get("41").cloned().unwrap();
    assert_eq!(entry.status, EegStatus::Failed);
    assert_eq!(entry.error(), Some("EEG processing timeout after 0.06s"));
    assert_eq!(fake.requests_to("GET", RECORD_PATH).len(), 3);
}

#[tokio::test]
async fn cancelled_tracking_keeps_last_observed_state() {
    let fake = FakeApi::start();
    fake.route("GET", RECORD_PATH, [Reply::ok(record(41, "processing"))]);

    let api = fake.api_with_token("tok");
    let tracker = ProcessingTracker::new(api.eeg_records(), fast(1000));
    let mut updates = tracker.subscribe();
    let tracked = tracker.track_existing(
        serde_json::from_value(record(41, "pending")).unwrap(),
        "Ana Mora",
    );

    within(updates.wait_for(|r| {
        r.get("41").is_some_and(|entry| entry.status == EegStatus::Processing)
    }))
    .await
    .unwrap();

    assert!(tracker.cancel("41"));
    assert!(!tracker.cancel("41"));
    assert_eq!(tracker.active_polls(), 0);

    let err = within(tracked.finished()).await.unwrap_err();
    assert!(matches!(err, PollError::Cancelled));

    let entry = tracker.snapshot().get("41").cloned().unwrap();
    assert_eq!(entry.status, EegStatus::Processing);
    assert_eq!(entry.error(), None);
}

#[tokio::test]
async fn dismiss_removes_entry_and_stops_polling() {
    let fake = FakeApi::start();
    fake.route("GET", RECORD_PATH, [Reply::ok(record(41, "processing"))]);

    let api = fake.api_with_token("tok");
    let tracker = ProcessingTracker::new(api.eeg_records(), fast(1000));
    let tracked = tracker.track_existing(
        serde_json::from_value(record(41, "pending")).unwrap(),
        "Ana Mora",
    );

    let dismissed = tracker.dismiss("41").unwrap();
    assert_eq!(dismissed.id, "41");
    assert!(tracker.snapshot().is_empty());

    assert!(matches!(within(tracked.finished()).await, Err(PollError::Cancelled)));
    let polled = fake.requests_to("GET", RECORD_PATH).len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fake.requests_to("GET", RECORD_PATH).len(), polled);
    assert!(tracker.snapshot().is_empty());
}

#[tokio::test]
async fn settled_records_are_not_polled() {
    let fake = FakeApi::start();

    let api = fake.api_with_token("tok");
    let tracker = ProcessingTracker::new(api.eeg_records(), fast(5));
    let tracked = tracker.track_existing(
        serde_json::from_value(processed_record(41, 1500)).unwrap(),
        "Ana Mora",
    );

    let record = within(tracked.finished()).await.unwrap();
    assert_eq!(record.status, EegStatus::Processed);
    assert_eq!(tracker.active_polls(), 0);
    assert_eq!(tracker.snapshot().get("41").unwrap().elapsed().as_deref(), Some("1.50s"));
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn concurrent_uploads_are_tracked_independently() {
    let fake = FakeApi::start();
    fake.route("GET", "/api/eeg-records/1", [Reply::ok(processed_record(1, 900))]);
    fake.route(
        "GET",
        "/api/eeg-records/2",
        [
            Reply::ok(record(2, "processing")),
            Reply::ok(json!({
                "id": 2,
                "patient_id": 12,
                "uploader_id": 3,
                "file_name": "subject_02.csv",
                "file_type": "csv",
                "file_size_bytes": 10,
                "status": "failed",
                "error_msg": "Unsupported channel layout"
            })),
        ],
    );

    let api = fake.api_with_token("tok");
    let tracker = ProcessingTracker::new(api.eeg_records(), fast(20));
    let first = tracker.track_existing(serde_json::from_value(record(1, "pending")).unwrap(), "Ana Mora");
    let second = tracker.track_existing(serde_json::from_value(record(2, "pending")).unwrap(), "Luis Rojas");

    let (first, second) = within(async { tokio::join!(first.finished(), second.finished()) }).await;
    assert_eq!(first.unwrap().status, EegStatus::Processed);
    assert_eq!(second.unwrap().status, EegStatus::Failed);

    let registry = tracker.snapshot();
    let ids: Vec<_> = registry.iter().map(|entry| entry.id.as_str()).collect();
    assert_eq!(ids, ["1", "2"]);
    assert_eq!(registry.get("2").unwrap().error(), Some("Unsupported channel layout"));
    assert_eq!(registry.get("2").unwrap().patient_name, "Luis Rojas");
}
