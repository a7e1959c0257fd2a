use shared::{
    CreatePatientRequest, EegRecord, Patient, PatientFilter, PredictionResult,
    UpdatePatientRequest,
};

use super::endpoints;
use crate::http::{ApiError, HttpClient};

#[derive(Debug, Clone)]
pub struct PatientsApi {
    http: HttpClient,
}

impl PatientsApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list(&self, filter: &PatientFilter) -> Result<Vec<Patient>, ApiError> {
        self.http.get_filtered(endpoints::PATIENTS, filter).await
    }

    pub async fn get(&self, id: &str) -> Result<Patient, ApiError> {
        self.http.get(&endpoints::patient(id)).await
    }

    pub async fn create(&self, request: &CreatePatientRequest) -> Result<Patient, ApiError> {
        self.http.post(endpoints::PATIENTS, request).await
    }

    pub async fn update(
        &self,
        id: &str,
        request: &UpdatePatientRequest,
    ) -> Result<Patient, ApiError> {
        self.http.put(&endpoints::patient(id), request).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.http.delete(&endpoints::patient(id)).await?;
        Ok(())
    }

    pub async fn eeg_records(&self, id: &str) -> Result<Vec<EegRecord>, ApiError> {
        self.http.get(&endpoints::patient_eeg_records(id)).await
    }

    pub async fn predictions(&self, id: &str) -> Result<Vec<PredictionResult>, ApiError> {
        self.http.get(&endpoints::patient_predictions(id)).await
    }
}
