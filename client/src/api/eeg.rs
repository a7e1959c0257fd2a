use reqwest::multipart::{Form, Part};
use shared::{EegRecord, EegRecordFilter, EegStatusSummary, FileType, PredictionResult};
use std::path::Path;

use super::endpoints;
use crate::http::{ApiError, HttpClient};

/// An EEG file ready to be submitted for classification.
#[derive(Debug, Clone)]
pub struct EegUpload {
    pub patient_id: String,
    pub uploader_id: String,
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl EegUpload {
    pub fn new(
        patient_id: impl Into<String>,
        uploader_id: impl Into<String>,
        file_name: impl Into<String>,
        contents: Vec<u8>,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            uploader_id: uploader_id.into(),
            file_name: file_name.into(),
            contents,
        }
    }

    /// Reads `path` and names the upload after its final component.
    pub async fn from_path(
        path: impl AsRef<Path>,
        patient_id: impl Into<String>,
        uploader_id: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let io_error = |source| ApiError::Io {
            path: path.to_path_buf(),
            source,
        };

        let contents = tokio::fs::read(path).await.map_err(io_error)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io_error(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "path has no file name",
                ))
            })?;

        Ok(Self::new(patient_id, uploader_id, file_name, contents))
    }

    pub fn file_type(&self) -> FileType {
        FileType::infer(&self.file_name)
    }

    pub fn size(&self) -> u64 {
        self.contents.len() as u64
    }

    fn into_form(self) -> Form {
        let file_type = self.file_type().to_string();
        let size = self.size().to_string();
        let file = Part::bytes(self.contents).file_name(self.file_name.clone());

        Form::new()
            .part("file", file)
            .text("patient_id", self.patient_id)
            .text("uploader_id", self.uploader_id)
            .text("file_name", self.file_name)
            .text("file_type", file_type)
            .text("file_size_bytes", size)
    }
}

#[derive(Debug, Clone)]
pub struct EegRecordsApi {
    http: HttpClient,
}

impl EegRecordsApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list(&self, filter: &EegRecordFilter) -> Result<Vec<EegRecord>, ApiError> {
        self.http.get_filtered(endpoints::EEG_RECORDS, filter).await
    }

    pub async fn get(&self, id: &str) -> Result<EegRecord, ApiError> {
        self.http.get(&endpoints::eeg_record(id)).await
    }

    pub async fn upload(&self, upload: EegUpload) -> Result<EegRecord, ApiError> {
        log::info!(
            "Uploading {} ({} bytes, {}) for patient {}",
            upload.file_name,
            upload.size(),
            upload.file_type(),
            upload.patient_id
        );
        self.http
            .upload(endpoints::EEG_RECORD_UPLOAD, upload.into_form())
            .await
    }

    pub async fn status(&self, id: &str) -> Result<EegStatusSummary, ApiError> {
        self.http.get(&endpoints::eeg_record_status(id)).await
    }

    pub async fn prediction(&self, id: &str) -> Result<PredictionResult, ApiError> {
        self.http.get(&endpoints::eeg_record_prediction(id)).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.http.delete(&endpoints::eeg_record(id)).await?;
        Ok(())
    }
}
