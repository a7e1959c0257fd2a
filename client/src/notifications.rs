use shared::{EegRecord, EegStatus};
use std::fmt;

/// Retry attempts shown before a failure is reported as final.
const RETRY_LIMIT: u32 = 3;

/// One in-flight (or settled) upload as shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEntry {
    pub id: String,
    pub file_name: String,
    pub patient_name: String,
    pub status: EegStatus,
    pub error_msg: Option<String>,
    pub processing_time_ms: Option<u64>,
    pub retry_attempt: Option<u32>,
}

impl NotificationEntry {
    pub fn from_record(record: &EegRecord, patient_name: impl Into<String>) -> Self {
        Self {
            id: record.id.clone(),
            file_name: record.file_name.clone(),
            patient_name: patient_name.into(),
            status: record.status,
            error_msg: record.error_msg.clone(),
            processing_time_ms: record.processing_time_ms,
            retry_attempt: None,
        }
    }

    pub fn headline(&self) -> &'static str {
        match self.status {
            EegStatus::Processed => "Prediction completed",
            EegStatus::Failed => "Prediction failed",
            EegStatus::Pending | EegStatus::Processing => "Processing prediction",
        }
    }

    pub fn status_text(&self) -> String {
        match self.status {
            EegStatus::Pending => "Queued for processing".to_string(),
            EegStatus::Processing => "Processing EEG file with the inference model".to_string(),
            EegStatus::Processed => "Analysis completed successfully".to_string(),
            EegStatus::Failed => match self.retry_attempt {
                Some(attempt) if attempt > 0 && attempt < RETRY_LIMIT => {
                    format!("Error - retrying ({}/{})", attempt, RETRY_LIMIT)
                }
                _ => "Error - retry limit reached".to_string(),
            },
        }
    }

    /// Processing time as seconds with two decimals, once processed.
    pub fn elapsed(&self) -> Option<String> {
        match (self.status, self.processing_time_ms) {
            (EegStatus::Processed, Some(ms)) if ms > 0 => {
                Some(format!("{:.2}s", ms as f64 / 1000.0))
            }
            _ => None,
        }
    }

    /// Error text, only for failed entries.
    pub fn error(&self) -> Option<&str> {
        match self.status {
            EegStatus::Failed => self.error_msg.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] {}", self.status, self.headline())?;
        writeln!(f, "    {} • {}", self.file_name, self.patient_name)?;
        write!(f, "    {}", self.status_text())?;
        if let Some(error) = self.error() {
            write!(f, "\n    Error: {}", error)?;
        }
        if let Some(elapsed) = self.elapsed() {
            write!(f, "\n    Time: {}", elapsed)?;
        }
        Ok(())
    }
}

/// Partial update merged into an existing entry; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationUpdate {
    pub status: Option<EegStatus>,
    pub error_msg: Option<String>,
    pub processing_time_ms: Option<u64>,
    pub retry_attempt: Option<u32>,
}

impl NotificationUpdate {
    pub fn from_record(record: &EegRecord) -> Self {
        Self {
            status: Some(record.status),
            error_msg: record.error_msg.clone(),
            processing_time_ms: record.processing_time_ms,
            retry_attempt: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(EegStatus::Failed),
            error_msg: Some(error.into()),
            ..Default::default()
        }
    }

    fn apply(self, entry: &mut NotificationEntry) {
        if let Some(status) = self.status {
            entry.status = status;
        }
        if let Some(error_msg) = self.error_msg {
            entry.error_msg = Some(error_msg);
        }
        if let Some(ms) = self.processing_time_ms {
            entry.processing_time_ms = Some(ms);
        }
        if let Some(attempt) = self.retry_attempt {
            entry.retry_attempt = Some(attempt);
        }
    }
}

/// Upload notifications in insertion order, at most one per record id.
///
/// Entries stay until dismissed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationRegistry {
    entries: Vec<NotificationEntry>,
    revision: u64,
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `entry`, or replaces the entry with the same id in place.
    pub fn add(&mut self, entry: NotificationEntry) {
        match self.position(&entry.id) {
            Some(index) => self.entries[index] = entry,
            None => self.entries.push(entry),
        }
        self.revision += 1;
    }

    /// Returns `false` (and changes nothing) when `id` is unknown.
    pub fn update(&mut self, id: &str, update: NotificationUpdate) -> bool {
        match self.position(id) {
            Some(index) => {
                update.apply(&mut self.entries[index]);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn dismiss(&mut self, id: &str) -> Option<NotificationEntry> {
        let index = self.position(id)?;
        self.revision += 1;
        Some(self.entries.remove(index))
    }

    /// Number of mutations applied so far; no-op updates do not count.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: &str) -> Option<&NotificationEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn entries(&self) -> &[NotificationEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &NotificationEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }
}

impl fmt::Display for NotificationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", entry)?;
        }
        Ok(())
    }
}
