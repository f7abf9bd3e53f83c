//! Front Desk Core Library
//!
//! Appointment and patient record engine behind a voice-driven dental front
//! desk. The dialogue layer calls the operations exported here; everything
//! with state lives in this crate.
//!
//! # Architecture
//!
//! ```text
//! Voice session ──▶ tool call ──▶ FrontDeskCore (operation layer)
//!                                   │          │            │
//!                                   ▼          ▼            ▼
//!                          AppointmentStore  PatientStore  KnowledgeBase
//!                                   │          │         (read-only)
//!                                   ▼          ▼
//!                            appointments.json patients.json
//!                         (temp file + atomic rename per mutation)
//! ```
//!
//! # Core Principle
//!
//! **A slot holds at most one appointment.** The conflict check and the write
//! happen under one lock, so concurrent sessions can never double-book.
//!
//! # Modules
//!
//! - [`store`]: Durable record store, appointment and patient stores
//! - [`models`]: Domain types (Patient, Appointment, Slot) and input validation
//! - [`knowledge`]: Clinic catalogs and opening hours
//! - [`config`]: Runtime configuration
//! - [`clock`]: Source of "today" for past-date checks

pub mod clock;
pub mod config;
pub mod knowledge;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use crate::config::{load_config, DeskConfig};
pub use knowledge::KnowledgeBase;
pub use models::{Appointment, NewAppointment, Patient, Slot};
pub use store::{AppointmentStore, PatientStore, RecordStore};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
#[uniffi(flat_error)]
pub enum FrontDeskError {
    #[error("Date is in the past: {0}")]
    PastDate(String),

    #[error("Slot already booked: {0}")]
    SlotConflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Corrupt store: {0}")]
    CorruptStore(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<store::StoreError> for FrontDeskError {
    fn from(e: store::StoreError) -> Self {
        if e.is_corrupt() {
            FrontDeskError::CorruptStore(e.to_string())
        } else {
            FrontDeskError::Storage(e.to_string())
        }
    }
}

impl From<store::AppointmentError> for FrontDeskError {
    fn from(e: store::AppointmentError) -> Self {
        use store::AppointmentError;
        match e {
            AppointmentError::PastDate(date) => FrontDeskError::PastDate(date.to_string()),
            AppointmentError::SlotConflict(slot) => FrontDeskError::SlotConflict(slot.to_string()),
            AppointmentError::NotFound(what) => FrontDeskError::NotFound(what),
            AppointmentError::Validation(e) => e.into(),
            AppointmentError::Store(e) => e.into(),
            AppointmentError::IdCollision(id) => {
                FrontDeskError::Storage(format!("generated appointment id {} already exists", id))
            }
        }
    }
}

impl From<store::PatientError> for FrontDeskError {
    fn from(e: store::PatientError) -> Self {
        match e {
            store::PatientError::Validation(e) => e.into(),
            store::PatientError::Store(e) => e.into(),
        }
    }
}

impl From<models::ValidationError> for FrontDeskError {
    fn from(e: models::ValidationError) -> Self {
        FrontDeskError::Validation(e.to_string())
    }
}

impl From<crate::config::ConfigError> for FrontDeskError {
    fn from(e: crate::config::ConfigError) -> Self {
        FrontDeskError::Config(e.to_string())
    }
}

impl From<knowledge::KnowledgeError> for FrontDeskError {
    fn from(e: knowledge::KnowledgeError) -> Self {
        FrontDeskError::Config(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open the front desk with default settings rooted at `data_dir`.
#[uniffi::export]
pub fn open_front_desk(data_dir: String) -> Result<Arc<FrontDeskCore>, FrontDeskError> {
    FrontDeskCore::open(&DeskConfig::in_dir(data_dir), Arc::new(SystemClock))
}

/// Open the front desk from a configuration file and `FRONT_DESK__*` variables.
#[uniffi::export]
pub fn open_front_desk_with_config(
    config_path: Option<String>,
) -> Result<Arc<FrontDeskCore>, FrontDeskError> {
    let config = load_config(config_path.as_deref().map(Path::new))?;
    FrontDeskCore::open(&config, Arc::new(SystemClock))
}

/// Install a log subscriber. `RUST_LOG` overrides `filter`; later calls do nothing.
#[uniffi::export]
pub fn init_logging(filter: String) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
}

// =========================================================================
// Main API Object
// =========================================================================

/// The operations a voice session may invoke. Safe to share across sessions.
#[derive(uniffi::Object)]
pub struct FrontDeskCore {
    appointments: AppointmentStore,
    patients: PatientStore,
    knowledge: KnowledgeBase,
    slot_minutes: u32,
}

impl FrontDeskCore {
    /// Open both stores and the catalog described by `config`.
    pub fn open(config: &DeskConfig, clock: Arc<dyn Clock>) -> Result<Arc<Self>, FrontDeskError> {
        config.validate()?;
        let knowledge = match &config.knowledge_file {
            Some(path) => KnowledgeBase::from_file(path)?,
            None => KnowledgeBase::builtin()?,
        };
        let appointments = AppointmentStore::open(config.appointments_path(), clock)?;
        let patients = PatientStore::open(config.patients_path())?;

        tracing::info!(data_dir = %config.data_dir.display(), "Front desk ready");
        Ok(Arc::new(Self {
            appointments,
            patients,
            knowledge,
            slot_minutes: config.slot_minutes,
        }))
    }

    fn to_ffi(&self, appointment: Appointment) -> FfiAppointment {
        let type_name = self
            .knowledge
            .appointment_type(&appointment.appointment_type)
            .map(|kind| kind.name.clone());
        FfiAppointment {
            id: appointment.id,
            patient_name: appointment.patient_name,
            phone: appointment.phone,
            date: appointment.date.format("%Y-%m-%d").to_string(),
            time: appointment.time.format("%H:%M").to_string(),
            appointment_type: appointment.appointment_type,
            type_name,
            notes: appointment.notes,
            created_at: appointment.created_at,
        }
    }
}

#[uniffi::export]
impl FrontDeskCore {
    // =========================================================================
    // Scheduling Operations
    // =========================================================================

    /// Whether a slot can be booked.
    pub fn check_availability(
        &self,
        date: String,
        time: String,
    ) -> Result<FfiAvailability, FrontDeskError> {
        let slot = Slot::parse(&date, &time)?;
        match self.appointments.check_availability(slot) {
            Ok(true) => Ok(FfiAvailability::Available),
            Ok(false) => Ok(FfiAvailability::Occupied),
            Err(store::AppointmentError::PastDate(_)) => Ok(FfiAvailability::PastDate),
            Err(e) => Err(e.into()),
        }
    }

    /// Unbooked slot start times (`HH:MM`) within opening hours on `date`.
    pub fn free_slots(&self, date: String) -> Result<Vec<String>, FrontDeskError> {
        let date = models::validation::parse_date(&date)?;
        let candidates = self.knowledge.hours.slot_starts(date, self.slot_minutes);
        let free = self.appointments.free_slots(date, candidates)?;
        Ok(free
            .into_iter()
            .map(|time| time.format("%H:%M").to_string())
            .collect())
    }

    /// Book an appointment.
    pub fn book_appointment(
        &self,
        patient_name: String,
        phone: String,
        date: String,
        time: String,
        appointment_type: String,
        notes: Option<String>,
    ) -> Result<FfiAppointment, FrontDeskError> {
        let slot = Slot::parse(&date, &time)?;
        if self.knowledge.appointment_type(&appointment_type).is_none() {
            tracing::warn!(%appointment_type, "Booking with an appointment type outside the catalog");
        }

        let mut request = NewAppointment::new(patient_name, phone, slot, appointment_type);
        request.notes = notes;
        let appointment = self.appointments.book(request)?;
        Ok(self.to_ffi(appointment))
    }

    /// Cancel the appointment matching name, phone, date and time exactly.
    pub fn cancel_appointment(
        &self,
        patient_name: String,
        phone: String,
        date: String,
        time: String,
    ) -> Result<(), FrontDeskError> {
        let slot = Slot::parse(&date, &time)?;
        if self.appointments.cancel(&patient_name, &phone, slot)? {
            Ok(())
        } else {
            Err(FrontDeskError::NotFound(format!("{} at {}", patient_name.trim(), slot)))
        }
    }

    /// Move an appointment. On failure the original booking is untouched.
    pub fn reschedule_appointment(
        &self,
        patient_name: String,
        phone: String,
        old_date: String,
        old_time: String,
        new_date: String,
        new_time: String,
    ) -> Result<FfiAppointment, FrontDeskError> {
        let from = Slot::parse(&old_date, &old_time)?;
        let to = Slot::parse(&new_date, &new_time)?;
        let moved = self.appointments.reschedule(&patient_name, &phone, from, to)?;
        Ok(self.to_ffi(moved))
    }

    /// Active appointments for a phone number, earliest first.
    pub fn list_appointments(&self, phone: String) -> Result<Vec<FfiAppointment>, FrontDeskError> {
        let list = self.appointments.list_for(&phone)?;
        Ok(list.into_iter().map(|a| self.to_ffi(a)).collect())
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Register a patient, replacing any record with the same phone number.
    pub fn upsert_patient(&self, patient: FfiPatient) -> Result<FfiPatient, FrontDeskError> {
        let stored = self.patients.upsert(patient.into())?;
        Ok(stored.into())
    }

    /// Get a patient by phone number.
    pub fn get_patient(&self, phone: String) -> Result<Option<FfiPatient>, FrontDeskError> {
        let patient = self.patients.get(&phone)?;
        Ok(patient.map(|p| p.into()))
    }

    // =========================================================================
    // Knowledge Operations
    // =========================================================================

    /// Answer an informational question from the clinic catalogs.
    pub fn lookup(&self, category: String, key: String) -> Option<String> {
        self.knowledge.lookup(&category, &key)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// Outcome of an availability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiAvailability {
    Available,
    Occupied,
    PastDate,
}

/// FFI-safe appointment.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiAppointment {
    pub id: String,
    pub patient_name: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub appointment_type: String,
    /// Display name from the catalog; `None` for types outside it
    pub type_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

/// FFI-safe patient.
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiPatient {
    pub phone: String,
    pub name: String,
    pub email: Option<String>,
    pub birth_date: Option<String>,
    pub medical_conditions: Option<String>,
    pub medications: Option<String>,
    pub allergies: Option<String>,
    pub previous_dentist: Option<String>,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            phone: patient.phone,
            name: patient.name,
            email: patient.email,
            birth_date: patient.birth_date,
            medical_conditions: patient.medical_conditions,
            medications: patient.medications,
            allergies: patient.allergies,
            previous_dentist: patient.previous_dentist,
        }
    }
}

impl From<FfiPatient> for Patient {
    fn from(patient: FfiPatient) -> Self {
        Patient {
            phone: patient.phone,
            name: patient.name,
            email: patient.email,
            birth_date: patient.birth_date,
            medical_conditions: patient.medical_conditions,
            medications: patient.medications,
            allergies: patient.allergies,
            previous_dentist: patient.previous_dentist,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn open_core(dir: &Path) -> Arc<FrontDeskCore> {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        FrontDeskCore::open(&DeskConfig::in_dir(dir), Arc::new(FixedClock::on(today))).unwrap()
    }

    #[test]
    fn test_error_mapping() {
        let corrupt = store::StoreError::Inconsistent {
            path: "appointments.json".into(),
            message: "duplicate slot".into(),
        };
        assert!(matches!(FrontDeskError::from(corrupt), FrontDeskError::CorruptStore(_)));

        let poisoned = store::StoreError::Poisoned("lock".into());
        assert!(matches!(FrontDeskError::from(poisoned), FrontDeskError::Storage(_)));

        let past = store::AppointmentError::PastDate(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(matches!(FrontDeskError::from(past), FrontDeskError::PastDate(d) if d == "2024-01-01"));
    }

    #[test]
    fn test_availability_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let core = open_core(dir.path());

        let check = |date: &str| core.check_availability(date.into(), "10:00".into()).unwrap();
        assert_eq!(check("2024-01-09"), FfiAvailability::PastDate);
        assert_eq!(check("2024-01-15"), FfiAvailability::Available);

        core.book_appointment(
            "Mario Rossi".into(),
            "+39 333 1234567".into(),
            "2024-01-15".into(),
            "10:00".into(),
            "visita_controllo".into(),
            None,
        )
        .unwrap();
        assert_eq!(check("2024-01-15"), FfiAvailability::Occupied);

        assert!(matches!(
            core.check_availability("15/01/2024".into(), "10:00".into()),
            Err(FrontDeskError::Validation(_))
        ));
    }

    #[test]
    fn test_type_name_from_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let core = open_core(dir.path());

        let known = core
            .book_appointment(
                "Mario Rossi".into(),
                "+39 333 1234567".into(),
                "2024-01-15".into(),
                "10:00".into(),
                "visita_controllo".into(),
                None,
            )
            .unwrap();
        assert_eq!(known.type_name.as_deref(), Some("Visita di Controllo"));

        let unknown = core
            .book_appointment(
                "Mario Rossi".into(),
                "+39 333 1234567".into(),
                "2024-01-15".into(),
                "11:00".into(),
                "sbiancamento_express".into(),
                Some("  ".into()),
            )
            .unwrap();
        assert_eq!(unknown.appointment_type, "sbiancamento_express");
        assert_eq!(unknown.type_name, None);
        assert_eq!(unknown.notes, None);
    }

    #[test]
    fn test_cancel_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let core = open_core(dir.path());
        let result = core.cancel_appointment(
            "Mario Rossi".into(),
            "+39 333 1234567".into(),
            "2024-01-15".into(),
            "10:00".into(),
        );
        assert!(matches!(result, Err(FrontDeskError::NotFound(_))));
    }

    #[test]
    fn test_patient_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let core = open_core(dir.path());

        let patient = FfiPatient {
            phone: "+39 333 1234567".into(),
            name: "Mario Rossi".into(),
            email: None,
            birth_date: Some("1980-05-02".into()),
            medical_conditions: None,
            medications: None,
            allergies: Some("Lattice".into()),
            previous_dentist: None,
        };
        let stored = core.upsert_patient(patient).unwrap();
        assert_eq!(stored.phone, "+393331234567");
        assert_eq!(core.get_patient("+393331234567".into()).unwrap(), Some(stored));
        assert_eq!(core.get_patient("+39 000 0000000".into()).unwrap(), None);
    }

    #[test]
    fn test_lookup_and_free_slots() {
        let dir = tempfile::tempdir().unwrap();
        let core = open_core(dir.path());
        assert!(core.lookup("services".into(), "ortodonzia".into()).is_some());

        // 2024-01-13 is a Saturday: 09:00-13:00 in 30 minute slots
        let slots = core.free_slots("2024-01-13".into()).unwrap();
        assert_eq!(slots.len(), 8);
        assert_eq!(slots.first().map(String::as_str), Some("09:00"));
        assert_eq!(slots.last().map(String::as_str), Some("12:30"));
        assert!(core.free_slots("2024-01-14".into()).unwrap().is_empty());
    }
}
