//! Patient models.

use serde::{Deserialize, Serialize};

use super::validation::{self, ValidationError};

/// A patient record, keyed by normalized phone number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Normalized phone number - primary key
    pub phone: String,
    /// Full name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Date of birth as given by the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_conditions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medications: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_dentist: Option<String>,
    /// First registration timestamp
    #[serde(default)]
    pub created_at: String,
    /// Last registration timestamp
    #[serde(default)]
    pub updated_at: String,
}

impl Patient {
    /// Create a new patient with required fields.
    pub fn new(name: String, phone: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            phone,
            name,
            email: None,
            birth_date: None,
            medical_conditions: None,
            medications: None,
            allergies: None,
            previous_dentist: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Normalize the phone, trim every field and reject missing identity.
    pub fn validated(self) -> Result<Self, ValidationError> {
        let name = validation::require_text("name", &self.name)?;
        let phone = validation::normalize_phone(&self.phone)?;
        let email = validation::optional_text(self.email);
        if let Some(email) = &email {
            if !email.contains('@') {
                return Err(ValidationError::new(
                    "email",
                    format!("'{}' is not an email address", email),
                ));
            }
        }

        Ok(Self {
            phone,
            name,
            email,
            birth_date: validation::optional_text(self.birth_date),
            medical_conditions: validation::optional_text(self.medical_conditions),
            medications: validation::optional_text(self.medications),
            allergies: validation::optional_text(self.allergies),
            previous_dentist: validation::optional_text(self.previous_dentist),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_patient() {
        let patient = Patient::new("Giulia Bianchi".into(), "+39 333 7654321".into());
        assert_eq!(patient.name, "Giulia Bianchi");
        assert_eq!(patient.created_at, patient.updated_at);
        assert!(patient.allergies.is_none());
    }

    #[test]
    fn test_validated_normalizes() {
        let mut patient = Patient::new("  Giulia Bianchi ".into(), "+39 333 7654321".into());
        patient.allergies = Some(" Penicillina ".into());
        patient.medications = Some("".into());

        let patient = patient.validated().unwrap();
        assert_eq!(patient.name, "Giulia Bianchi");
        assert_eq!(patient.phone, "+393337654321");
        assert_eq!(patient.allergies, Some("Penicillina".into()));
        assert_eq!(patient.medications, None);
    }

    #[test]
    fn test_validated_rejects_missing_name() {
        let patient = Patient::new(" ".into(), "+39 333 7654321".into());
        assert_eq!(patient.validated().unwrap_err().field, "name");
    }

    #[test]
    fn test_validated_rejects_bad_email() {
        let mut patient = Patient::new("Giulia".into(), "+39 333 7654321".into());
        patient.email = Some("giulia.email.com".into());
        assert_eq!(patient.validated().unwrap_err().field, "email");
    }

    #[test]
    fn test_deserialize_without_timestamps() {
        let json = r#"{"phone": "+393331234567", "name": "Mario Rossi", "email": "mario@test.com"}"#;
        let patient: Patient = serde_json::from_str(json).unwrap();
        assert_eq!(patient.email, Some("mario@test.com".into()));
        assert!(patient.created_at.is_empty());
    }
}
