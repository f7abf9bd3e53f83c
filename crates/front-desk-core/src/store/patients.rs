//! Patient registry keyed by normalized phone number.

use std::path::Path;
use std::sync::RwLock;

use thiserror::Error;

use super::{RecordStore, StoreError};
use crate::models::validation::{self, ValidationError};
use crate::models::Patient;

/// Patient registry errors.
#[derive(Error, Debug)]
pub enum PatientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<T> From<std::sync::PoisonError<T>> for PatientError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PatientError::Store(e.into())
    }
}

pub type PatientResult<T> = Result<T, PatientError>;

/// Patients, at most one per phone number. Later registrations overwrite earlier ones.
pub struct PatientStore {
    inner: RwLock<RecordStore<Patient>>,
}

impl PatientStore {
    /// Load the registry from its backing file.
    pub fn open<P: AsRef<Path>>(path: P) -> PatientResult<Self> {
        let records = RecordStore::load(path)?;
        check_keys(&records)?;
        tracing::info!(
            path = %records.path().display(),
            patients = records.len(),
            "Opened patient store"
        );
        Ok(Self {
            inner: RwLock::new(records),
        })
    }

    /// Register or replace the patient with this phone number.
    ///
    /// Fields are not merged: the new record replaces the old one, keeping only
    /// the original registration time.
    pub fn upsert(&self, patient: Patient) -> PatientResult<Patient> {
        let mut patient = patient.validated()?;

        let mut records = self.inner.write()?;
        let now = chrono::Utc::now().to_rfc3339();
        patient.created_at = records
            .get(&patient.phone)
            .map(|existing| existing.created_at.clone())
            .filter(|created_at| !created_at.is_empty())
            .unwrap_or_else(|| now.clone());
        patient.updated_at = now;

        let replaced = records.put(patient.phone.clone(), patient.clone())?;
        tracing::info!(existing = replaced.is_some(), "Registered patient");
        Ok(patient)
    }

    /// Fetch a patient by phone number in any formatting.
    pub fn get(&self, phone: &str) -> PatientResult<Option<Patient>> {
        let Ok(phone) = validation::normalize_phone(phone) else {
            return Ok(None);
        };
        Ok(self.inner.read()?.get(&phone).cloned())
    }

    /// Number of registered patients.
    pub fn len(&self) -> PatientResult<usize> {
        Ok(self.inner.read()?.len())
    }

    pub fn is_empty(&self) -> PatientResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Every record must sit under its own normalized phone, or lookups miss it.
fn check_keys(records: &RecordStore<Patient>) -> Result<(), StoreError> {
    for (key, patient) in records.iter() {
        let canonical = validation::normalize_phone(&patient.phone).ok();
        if canonical.as_deref() != Some(key.as_str()) {
            return Err(StoreError::Inconsistent {
                path: records.path().to_path_buf(),
                message: format!(
                    "patient under key {} has phone '{}'",
                    key, patient.phone
                ),
            });
        }
    }
    Ok(())
}
