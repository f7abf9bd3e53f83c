//! Appointment store with slot-conflict enforcement.
//!
//! Every mutation runs under one write lock spanning the whole store, so the
//! conflict check and the insert form a single critical section.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use uuid::Uuid;

use super::{RecordStore, StoreError, StoreResult};
use crate::clock::Clock;
use crate::models::validation::{self, ValidationError};
use crate::models::{Appointment, NewAppointment, Slot};

/// Scheduling errors.
#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Date {0} is in the past")]
    PastDate(NaiveDate),

    #[error("Slot {0} is already booked")]
    SlotConflict(Slot),

    #[error("No appointment found for {0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Generated appointment id {0} already exists")]
    IdCollision(String),
}

impl<T> From<std::sync::PoisonError<T>> for AppointmentError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        AppointmentError::Store(e.into())
    }
}

pub type AppointmentResult<T> = Result<T, AppointmentError>;

/// Records plus the derived slot index.
struct Schedule {
    records: RecordStore<Appointment>,
    slots: HashMap<Slot, String>,
}

impl Schedule {
    /// Rebuild the slot index, refusing files that break the store invariants.
    fn index(records: RecordStore<Appointment>) -> StoreResult<Self> {
        let mut slots = HashMap::with_capacity(records.len());
        for (id, appointment) in records.iter() {
            if *id != appointment.id {
                return Err(StoreError::Inconsistent {
                    path: records.path().to_path_buf(),
                    message: format!("record key {} holds appointment {}", id, appointment.id),
                });
            }
            if validation::normalize_phone(&appointment.phone).ok().as_deref()
                != Some(appointment.phone.as_str())
            {
                return Err(StoreError::Inconsistent {
                    path: records.path().to_path_buf(),
                    message: format!(
                        "appointment {} has non-canonical phone '{}'",
                        id, appointment.phone
                    ),
                });
            }
            if let Some(other) = slots.insert(appointment.slot(), id.clone()) {
                return Err(StoreError::Inconsistent {
                    path: records.path().to_path_buf(),
                    message: format!(
                        "appointments {} and {} share slot {}",
                        other,
                        id,
                        appointment.slot()
                    ),
                });
            }
        }
        Ok(Self { records, slots })
    }

    fn occupant(&self, slot: Slot) -> Option<&Appointment> {
        self.slots.get(&slot).and_then(|id| self.records.get(id))
    }

    /// The active appointment at `slot` booked by this patient, if any.
    fn find(&self, patient_name: &str, phone: &str, slot: Slot) -> Option<&Appointment> {
        self.occupant(slot)
            .filter(|appointment| appointment.belongs_to(patient_name, phone))
    }

    fn next_id(&self) -> AppointmentResult<String> {
        let id = format!("APT-{}", Uuid::now_v7().simple());
        if self.records.contains_key(&id) {
            return Err(AppointmentError::IdCollision(id));
        }
        Ok(id)
    }

    fn insert(&mut self, appointment: Appointment) -> StoreResult<()> {
        let slot = appointment.slot();
        let id = appointment.id.clone();
        self.records.put(id.clone(), appointment)?;
        self.slots.insert(slot, id);
        Ok(())
    }

    fn remove(&mut self, id: &str) -> StoreResult<Option<Appointment>> {
        let removed = self.records.remove(id)?;
        if let Some(appointment) = &removed {
            self.slots.remove(&appointment.slot());
        }
        Ok(removed)
    }

    fn replace(&mut self, old_id: &str, appointment: Appointment) -> StoreResult<()> {
        let slot = appointment.slot();
        let id = appointment.id.clone();
        if let Some(old) = self.records.swap(old_id, id.clone(), appointment)? {
            self.slots.remove(&old.slot());
        }
        self.slots.insert(slot, id);
        Ok(())
    }
}

/// Active appointments, keyed by id, at most one per slot.
pub struct AppointmentStore {
    inner: RwLock<Schedule>,
    clock: Arc<dyn Clock>,
}

impl AppointmentStore {
    /// Load the store from its backing file.
    pub fn open<P: AsRef<Path>>(path: P, clock: Arc<dyn Clock>) -> AppointmentResult<Self> {
        let schedule = Schedule::index(RecordStore::load(path)?)?;
        tracing::info!(
            path = %schedule.records.path().display(),
            appointments = schedule.records.len(),
            "Opened appointment store"
        );
        Ok(Self {
            inner: RwLock::new(schedule),
            clock,
        })
    }

    /// Produce a fresh appointment id.
    pub fn generate_id(&self) -> AppointmentResult<String> {
        self.inner.read()?.next_id()
    }

    fn ensure_not_past(&self, date: NaiveDate) -> AppointmentResult<()> {
        if date < self.clock.today() {
            return Err(AppointmentError::PastDate(date));
        }
        Ok(())
    }

    /// Whether `slot` can be booked. Past dates fail with [`AppointmentError::PastDate`].
    pub fn check_availability(&self, slot: Slot) -> AppointmentResult<bool> {
        self.ensure_not_past(slot.date)?;
        let schedule = self.inner.read()?;
        Ok(schedule.occupant(slot).is_none())
    }

    /// Book a new appointment.
    pub fn book(&self, request: NewAppointment) -> AppointmentResult<Appointment> {
        let request = request.validated()?;
        let slot = request.slot();
        self.ensure_not_past(slot.date)?;

        let mut schedule = self.inner.write()?;
        if let Some(existing) = schedule.occupant(slot) {
            tracing::debug!(%slot, existing = %existing.id, "Slot already taken");
            return Err(AppointmentError::SlotConflict(slot));
        }

        let appointment = request.into_appointment(schedule.next_id()?);
        schedule.insert(appointment.clone())?;
        tracing::info!(
            id = %appointment.id,
            %slot,
            appointment_type = %appointment.appointment_type,
            "Booked appointment"
        );
        Ok(appointment)
    }

    /// Cancel the appointment at `slot` booked under this name and phone.
    ///
    /// Returns `false` when no appointment matches all four fields.
    pub fn cancel(&self, patient_name: &str, phone: &str, slot: Slot) -> AppointmentResult<bool> {
        let patient_name = validation::require_text("patient_name", patient_name)?;
        let phone = validation::normalize_phone(phone)?;

        let mut schedule = self.inner.write()?;
        let Some(id) = schedule
            .find(&patient_name, &phone, slot)
            .map(|appointment| appointment.id.clone())
        else {
            tracing::debug!(%slot, "No matching appointment to cancel");
            return Ok(false);
        };

        let removed = schedule.remove(&id)?.is_some();
        tracing::info!(%id, %slot, "Cancelled appointment");
        Ok(removed)
    }

    /// Move an appointment to a new slot as one transaction.
    ///
    /// On any error the original appointment is left in place.
    pub fn reschedule(
        &self,
        patient_name: &str,
        phone: &str,
        from: Slot,
        to: Slot,
    ) -> AppointmentResult<Appointment> {
        let patient_name = validation::require_text("patient_name", patient_name)?;
        let phone = validation::normalize_phone(phone)?;

        let mut schedule = self.inner.write()?;
        let current = schedule
            .find(&patient_name, &phone, from)
            .cloned()
            .ok_or_else(|| AppointmentError::NotFound(format!("{} at {}", patient_name, from)))?;

        self.ensure_not_past(to.date)?;
        if let Some(occupant) = schedule.occupant(to) {
            if occupant.id != current.id {
                return Err(AppointmentError::SlotConflict(to));
            }
        }

        let moved = Appointment {
            id: schedule.next_id()?,
            date: to.date,
            time: to.time,
            created_at: chrono::Utc::now().to_rfc3339(),
            ..current.clone()
        };
        schedule.replace(&current.id, moved.clone())?;
        tracing::info!(old_id = %current.id, new_id = %moved.id, %from, %to, "Rescheduled appointment");
        Ok(moved)
    }

    /// Active appointments for a phone number, ordered by date then time.
    pub fn list_for(&self, phone: &str) -> AppointmentResult<AppointmentList> {
        let phone = validation::normalize_phone(phone)?;
        let schedule = self.inner.read()?;
        let mut items: Vec<Appointment> = schedule
            .records
            .values()
            .filter(|appointment| appointment.phone == phone)
            .cloned()
            .collect();
        items.sort_by_key(Appointment::slot);
        Ok(AppointmentList { items })
    }

    /// Filter candidate start times on `date` down to the unoccupied ones.
    pub fn free_slots<I>(&self, date: NaiveDate, candidates: I) -> AppointmentResult<Vec<NaiveTime>>
    where
        I: IntoIterator<Item = NaiveTime>,
    {
        self.ensure_not_past(date)?;
        let schedule = self.inner.read()?;
        Ok(candidates
            .into_iter()
            .filter(|time| schedule.occupant(Slot::new(date, *time)).is_none())
            .collect())
    }

    /// Look up an appointment by id.
    pub fn get(&self, id: &str) -> AppointmentResult<Option<Appointment>> {
        Ok(self.inner.read()?.records.get(id).cloned())
    }

    /// Number of active appointments.
    pub fn len(&self) -> AppointmentResult<usize> {
        Ok(self.inner.read()?.records.len())
    }

    pub fn is_empty(&self) -> AppointmentResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// A snapshot of one caller's appointments. Iterate it as many times as needed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentList {
    items: Vec<Appointment>,
}

impl AppointmentList {
    pub fn iter(&self) -> std::slice::Iter<'_, Appointment> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a AppointmentList {
    type Item = &'a Appointment;
    type IntoIter = std::slice::Iter<'a, Appointment>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for AppointmentList {
    type Item = Appointment;
    type IntoIter = std::vec::IntoIter<Appointment>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
