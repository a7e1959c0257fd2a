use crate::records::EegStatus;

/// A typed set of list filters that can be sent as a query string.
pub trait QueryFilter {
    /// The set fields, in a stable order. Unset fields are left out.
    fn query_pairs(&self) -> Vec<(&'static str, String)>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientFilter {
    pub identification_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub has_eeg_records: Option<bool>,
    pub has_pending_eeg: Option<bool>,
}

impl QueryFilter for PatientFilter {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "identification_number", self.identification_number.as_ref());
        push(&mut pairs, "first_name", self.first_name.as_ref());
        push(&mut pairs, "last_name", self.last_name.as_ref());
        push(&mut pairs, "has_eeg_records", self.has_eeg_records.as_ref());
        push(&mut pairs, "has_pending_eeg", self.has_pending_eeg.as_ref());
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EegRecordFilter {
    pub patient_id: Option<String>,
    pub status: Option<EegStatus>,
}

impl QueryFilter for EegRecordFilter {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push(&mut pairs, "patient_id", self.patient_id.as_ref());
        push(&mut pairs, "status", self.status.as_ref());
        pairs
    }
}

/// Filterless listings.
impl QueryFilter for () {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

fn push<T: ToString>(pairs: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<&T>) {
    if let Some(value) = value {
        pairs.push((key, value.to_string()));
    }
}
