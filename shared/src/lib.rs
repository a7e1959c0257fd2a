pub mod filters;
pub mod ids;
pub mod patients;
pub mod records;
pub mod users;

pub use filters::{EegRecordFilter, PatientFilter, QueryFilter};
pub use patients::{CreatePatientRequest, Patient, UpdatePatientRequest};
pub use records::{
    Classification, EegRecord, EegStatus, EegStatusSummary, FileType, PredictionResult,
};
pub use users::{
    AppUser, AuthResponse, CreateUserRequest, CurrentUser, LoginRequest, Role, UpdateUserRequest,
};
