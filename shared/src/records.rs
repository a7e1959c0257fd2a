use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::ids::deserialize_id;

/// Processing state of an uploaded EEG file, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EegStatus {
    Pending,
    Processing,
    Processed,
    Failed,
}

impl EegStatus {
    /// `processed` and `failed` records never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, EegStatus::Processed | EegStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FileType {
    Parquet,
    Csv,
    Json,
    Edf,
}

impl FileType {
    /// Guesses the upload format from the file extension.
    ///
    /// The extension is compared without regard to case. Unknown or missing
    /// extensions fall back to `csv`.
    pub fn infer(file_name: &str) -> FileType {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("parquet") => FileType::Parquet,
            Some("csv") => FileType::Csv,
            Some("json") => FileType::Json,
            Some("edf") => FileType::Edf,
            _ => FileType::Csv,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EegRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub patient_id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub uploader_id: String,
    pub file_name: String,
    pub file_type: FileType,
    pub file_size_bytes: u64,
    pub status: EegStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Lightweight view served by `/api/eeg-records/:id/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EegStatusSummary {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub status: EegStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Classification {
    Alcoholic,
    NonAlcoholic,
}

impl Classification {
    pub fn label(self) -> &'static str {
        match self {
            Classification::Alcoholic => "Alcoholic",
            Classification::NonAlcoholic => "Non-alcoholic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub eeg_record_id: String,
    pub result: Classification,
    pub confidence: f64,
    pub model_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl PredictionResult {
    pub fn confidence_percent(&self) -> f64 {
        self.confidence.clamp(0.0, 1.0) * 100.0
    }
}
