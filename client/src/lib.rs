pub mod api;
pub mod config;
pub mod http;
pub mod notifications;
pub mod poller;
pub mod session;
pub mod tracker;

pub use api::Api;
pub use config::ClientConfig;
pub use http::{ApiError, HttpClient};
pub use notifications::{NotificationEntry, NotificationRegistry, NotificationUpdate};
pub use poller::{CancelToken, PollError, PollHandle, PollOptions, RecordSource};
pub use session::{Session, SessionEvent};
pub use tracker::ProcessingTracker;
