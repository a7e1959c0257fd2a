//! Typed resource clients. Each method is one HTTP call.

mod auth;
mod eeg;
mod patients;
mod predictions;
mod users;

pub use auth::AuthApi;
pub use eeg::{EegRecordsApi, EegUpload};
pub use patients::PatientsApi;
pub use predictions::PredictionsApi;
pub use users::UsersApi;

use crate::config::ClientConfig;
use crate::http::{ApiError, HttpClient};
use crate::session::Session;

pub mod endpoints {
    pub const AUTH_LOGIN: &str = "/api/auth/login";
    pub const AUTH_LOGOUT: &str = "/api/auth/logout";
    pub const AUTH_ME: &str = "/api/auth/me";

    pub const USERS: &str = "/api/users";
    pub const PATIENTS: &str = "/api/patients";
    pub const EEG_RECORDS: &str = "/api/eeg-records";
    pub const EEG_RECORD_UPLOAD: &str = "/api/eeg-records/upload";
    pub const PREDICTIONS: &str = "/api/predictions";

    pub fn user(id: &str) -> String {
        format!("{}/{}", USERS, id)
    }

    pub fn patient(id: &str) -> String {
        format!("{}/{}", PATIENTS, id)
    }

    pub fn patient_eeg_records(id: &str) -> String {
        format!("{}/{}/eeg-records", PATIENTS, id)
    }

    pub fn patient_predictions(id: &str) -> String {
        format!("{}/{}/predictions", PATIENTS, id)
    }

    pub fn eeg_record(id: &str) -> String {
        format!("{}/{}", EEG_RECORDS, id)
    }

    pub fn eeg_record_status(id: &str) -> String {
        format!("{}/{}/status", EEG_RECORDS, id)
    }

    pub fn eeg_record_prediction(id: &str) -> String {
        format!("{}/{}/prediction", EEG_RECORDS, id)
    }

    pub fn prediction(id: &str) -> String {
        format!("{}/{}", PREDICTIONS, id)
    }
}

/// Entry point bundling every resource client over one transport.
#[derive(Debug, Clone)]
pub struct Api {
    http: HttpClient,
}

impl Api {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn from_config(config: &ClientConfig, session: Session) -> Result<Self, ApiError> {
        Ok(Self::new(HttpClient::new(config, session)?))
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn session(&self) -> &Session {
        self.http.session()
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.http.clone())
    }

    pub fn users(&self) -> UsersApi {
        UsersApi::new(self.http.clone())
    }

    pub fn patients(&self) -> PatientsApi {
        PatientsApi::new(self.http.clone())
    }

    pub fn eeg_records(&self) -> EegRecordsApi {
        EegRecordsApi::new(self.http.clone())
    }

    pub fn predictions(&self) -> PredictionsApi {
        PredictionsApi::new(self.http.clone())
    }
}
