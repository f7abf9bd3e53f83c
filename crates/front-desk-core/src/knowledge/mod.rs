//! Read-only clinic catalogs.
//!
//! The tables answer informational questions (services, prices, opening hours,
//! FAQ, insurers, payment) and classify appointment types. They never change
//! at runtime.

mod hours;
mod matcher;

pub use hours::*;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Weekday;
use serde::Deserialize;
use thiserror::Error;

/// Catalog shipped with the library.
const BUILTIN_CATALOG: &str = include_str!("../../data/clinic.json");

/// Knowledge base errors.
#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Cannot read catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Contact and practical details of the clinic.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClinicInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub emergency_hours: String,
    pub parking: String,
    pub accessibility: String,
}

impl ClinicInfo {
    fn fields(&self) -> [(&'static str, &str); 8] {
        [
            ("name", &self.name),
            ("address", &self.address),
            ("phone", &self.phone),
            ("email", &self.email),
            ("website", &self.website),
            ("emergency_hours", &self.emergency_hours),
            ("parking", &self.parking),
            ("accessibility", &self.accessibility),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Service {
    pub name: String,
    pub description: String,
    pub duration: String,
    pub price_range: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StaffMember {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub specializations: Vec<String>,
    pub experience: String,
    #[serde(default)]
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

/// A bookable appointment category.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppointmentType {
    pub name: String,
    pub duration_minutes: u32,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct InsuranceInfo {
    pub accepted: Vec<String>,
    pub coverage_info: String,
    pub direct_billing: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PaymentInfo {
    pub methods: Vec<String>,
    pub installments: String,
    pub receipts: String,
}

/// Lookup categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Clinic,
    Hours,
    Services,
    Staff,
    Faq,
    Insurance,
    Payment,
    AppointmentTypes,
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match matcher::normalize_key(s).as_str() {
            "clinic" | "clinic_info" | "info" => Ok(Category::Clinic),
            "hours" | "opening_hours" => Ok(Category::Hours),
            "services" | "service" => Ok(Category::Services),
            "staff" => Ok(Category::Staff),
            "faq" => Ok(Category::Faq),
            "insurance" | "insurances" => Ok(Category::Insurance),
            "payment" | "payments" => Ok(Category::Payment),
            "appointment_types" | "appointment_type" => Ok(Category::AppointmentTypes),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

/// All clinic catalogs.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeBase {
    pub clinic: ClinicInfo,
    pub hours: OpeningHours,
    pub services: BTreeMap<String, Service>,
    pub staff: BTreeMap<String, StaffMember>,
    pub faq: BTreeMap<String, FaqEntry>,
    pub appointment_types: BTreeMap<String, AppointmentType>,
    pub insurance: InsuranceInfo,
    pub payment: PaymentInfo,
}

/// Keys meaning "everything in this category".
fn is_listing(key: &str) -> bool {
    key.is_empty() || key == "all"
}

impl KnowledgeBase {
    /// The catalog embedded in the library.
    pub fn builtin() -> Result<Self, KnowledgeError> {
        Ok(serde_json::from_str(BUILTIN_CATALOG)?)
    }

    /// Load a replacement catalog with the same shape as the embedded one.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, KnowledgeError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Catalog entry for an appointment type key.
    pub fn appointment_type(&self, key: &str) -> Option<&AppointmentType> {
        self.appointment_types.get(&matcher::normalize_key(key))
    }

    /// Answer `key` within `category`. An empty key or `all` lists the whole category.
    pub fn lookup(&self, category: &str, key: &str) -> Option<String> {
        let category = match category.parse::<Category>() {
            Ok(category) => category,
            Err(e) => {
                tracing::debug!(error = %e, "Lookup in unknown category");
                return None;
            }
        };
        let key = matcher::normalize_key(key);

        match category {
            Category::Clinic => self.lookup_clinic(&key),
            Category::Hours => self.lookup_hours(&key),
            Category::Services => lookup_table(&self.services, &key, |s| vec![s.name.as_str()], render_service),
            Category::Staff => lookup_table(
                &self.staff,
                &key,
                |m| vec![m.name.as_str(), m.title.as_str()],
                render_staff,
            ),
            Category::Faq => lookup_table(&self.faq, &key, |f| vec![f.question.as_str()], |f| f.answer.clone()),
            Category::AppointmentTypes => lookup_table(
                &self.appointment_types,
                &key,
                |t| vec![t.name.as_str()],
                render_appointment_type,
            ),
            Category::Insurance => self.lookup_insurance(&key),
            Category::Payment => self.lookup_payment(&key),
        }
    }

    fn lookup_clinic(&self, key: &str) -> Option<String> {
        let fields = self.clinic.fields();
        if is_listing(key) {
            return Some(
                fields
                    .iter()
                    .map(|(name, value)| format!("{}: {}", name, value))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        fields
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.to_string())
    }

    fn lookup_hours(&self, key: &str) -> Option<String> {
        if is_listing(key) {
            let week = [
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ];
            return Some(
                week.iter()
                    .map(|day| format!("{}: {}", day, self.hours.describe(*day)))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        parse_weekday(key).map(|day| self.hours.describe(day))
    }

    fn lookup_insurance(&self, key: &str) -> Option<String> {
        if is_listing(key) {
            return Some(self.insurance.accepted.join(", "));
        }
        let insurer = self
            .insurance
            .accepted
            .iter()
            .find(|name| matcher::normalize_key(name) == key)
            .or_else(|| {
                matcher::best_match(
                    key,
                    self.insurance.accepted.iter().map(|name| (name, vec![name.as_str()])),
                )
            })?;
        Some(format!(
            "{}: {} {}",
            insurer, self.insurance.coverage_info, self.insurance.direct_billing
        ))
    }

    fn lookup_payment(&self, key: &str) -> Option<String> {
        let payment = &self.payment;
        match key {
            k if is_listing(k) => Some(format!(
                "{}\n{}\n{}",
                payment.methods.join(", "),
                payment.installments,
                payment.receipts
            )),
            "methods" => Some(payment.methods.join(", ")),
            "installments" => Some(payment.installments.clone()),
            "receipts" => Some(payment.receipts.clone()),
            _ => None,
        }
    }
}

/// Exact key, then substring, then fuzzy match over key and searchable text.
fn lookup_table<T>(
    table: &BTreeMap<String, T>,
    key: &str,
    searchable: impl Fn(&T) -> Vec<&str>,
    render: impl Fn(&T) -> String,
) -> Option<String> {
    if is_listing(key) {
        return Some(table.values().map(&render).collect::<Vec<_>>().join("\n"));
    }
    if let Some(entry) = table.get(key) {
        return Some(render(entry));
    }
    let needle = key.replace('_', " ");
    if needle.chars().count() >= 3 {
        let hit = table.iter().find(|(k, entry)| {
            k.contains(key)
                || searchable(entry)
                    .iter()
                    .any(|text| text.to_lowercase().contains(&needle))
        });
        if let Some((_, entry)) = hit {
            return Some(render(entry));
        }
    }
    let entry = matcher::best_match(
        key,
        table.iter().map(|(k, entry)| {
            let mut haystacks = vec![k.as_str()];
            haystacks.extend(searchable(entry));
            (entry, haystacks)
        }),
    )?;
    Some(render(entry))
}

fn render_service(service: &Service) -> String {
    format!(
        "{}: {} ({}, {})",
        service.name, service.description, service.duration, service.price_range
    )
}

fn render_staff(member: &StaffMember) -> String {
    let mut text = format!("{}, {}, {}", member.name, member.title, member.experience);
    if !member.specializations.is_empty() {
        text.push_str(&format!(" [{}]", member.specializations.join(", ")));
    }
    text
}

fn render_appointment_type(kind: &AppointmentType) -> String {
    format!("{} ({} min): {}", kind.name, kind.duration_minutes, kind.description)
}
