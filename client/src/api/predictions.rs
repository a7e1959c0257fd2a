use shared::PredictionResult;

use super::endpoints;
use crate::http::{ApiError, HttpClient};

#[derive(Debug, Clone)]
pub struct PredictionsApi {
    http: HttpClient,
}

impl PredictionsApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list(&self) -> Result<Vec<PredictionResult>, ApiError> {
        self.http.get(endpoints::PREDICTIONS).await
    }

    pub async fn get(&self, id: &str) -> Result<PredictionResult, ApiError> {
        self.http.get(&endpoints::prediction(id)).await
    }
}
