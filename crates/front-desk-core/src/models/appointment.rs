//! Appointment models and the scheduling slot.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::validation::{self, hhmm, ValidationError};

/// A `(date, time)` pair; the unit of scheduling exclusivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl Slot {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            date,
            time: validation::truncate_to_minute(time),
        }
    }

    /// Parse a slot from ISO date and `HH:MM` strings.
    pub fn parse(date: &str, time: &str) -> Result<Self, ValidationError> {
        Ok(Self::new(
            validation::parse_date(date)?,
            validation::parse_time(time)?,
        ))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date.format("%Y-%m-%d"), self.time.format("%H:%M"))
    }
}

/// An active appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    /// System-generated identifier, immutable once assigned
    pub id: String,
    pub patient_name: String,
    /// Normalized phone number
    pub phone: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    /// Key into the appointment type catalog (stored as given)
    #[serde(alias = "type")]
    pub appointment_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: String,
}

impl Appointment {
    pub fn slot(&self) -> Slot {
        Slot::new(self.date, self.time)
    }

    /// Whether this appointment was booked under the given name and normalized phone.
    ///
    /// Names compare case-insensitively after trimming.
    pub fn belongs_to(&self, patient_name: &str, phone: &str) -> bool {
        self.phone == phone
            && self.patient_name.trim().to_lowercase() == patient_name.trim().to_lowercase()
    }
}

/// A booking request, before an id has been allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub patient_name: String,
    pub phone: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub appointment_type: String,
    pub notes: Option<String>,
}

impl NewAppointment {
    pub fn new(
        patient_name: impl Into<String>,
        phone: impl Into<String>,
        slot: Slot,
        appointment_type: impl Into<String>,
    ) -> Self {
        Self {
            patient_name: patient_name.into(),
            phone: phone.into(),
            date: slot.date,
            time: slot.time,
            appointment_type: appointment_type.into(),
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn slot(&self) -> Slot {
        Slot::new(self.date, self.time)
    }

    /// Trim and normalize every field, rejecting missing identity or type.
    pub fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self {
            patient_name: validation::require_text("patient_name", &self.patient_name)?,
            phone: validation::normalize_phone(&self.phone)?,
            date: self.date,
            time: validation::truncate_to_minute(self.time),
            appointment_type: validation::require_text("appointment_type", &self.appointment_type)?,
            notes: validation::optional_text(self.notes),
        })
    }

    /// Attach an id and creation timestamp.
    pub(crate) fn into_appointment(self, id: String) -> Appointment {
        Appointment {
            id,
            patient_name: self.patient_name,
            phone: self.phone,
            date: self.date,
            time: self.time,
            appointment_type: self.appointment_type,
            notes: self.notes,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
