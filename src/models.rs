// 🏥 Domain records - read-only snapshots supplied by the store
//
// Patients, appointments and billing rows exactly as the persistence layer
// hands them over. Dates stay as text; the analytics core parses them
// through `crate::dates` and tolerates malformed values.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PATIENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Stable identity (UUID) - filled in on import when missing
    #[serde(default = "default_uuid", deserialize_with = "id_or_new")]
    pub id: String,

    pub first_name: String,
    pub last_name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub phone: String,

    /// Calendar date, normally `YYYY-MM-DD`
    pub date_of_birth: String,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub medical_history: String,

    #[serde(default = "default_timestamp")]
    pub created_at: String,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ============================================================================
// APPOINTMENT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(default = "default_uuid", deserialize_with = "id_or_new")]
    pub id: String,

    pub patient_id: String,

    /// Date-time with or without offset (see `dates::parse_date_time`)
    pub appointment_date: String,

    #[serde(default = "default_duration")]
    pub duration_minutes: u32,

    /// Free-form label: "Checkup", "Follow-up", "Consultation", ...
    pub appointment_type: String,

    pub status: AppointmentStatus,

    #[serde(default)]
    pub notes: String,

    #[serde(default = "default_timestamp")]
    pub created_at: String,
}

// ============================================================================
// BILLING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingStatus {
    Pending,
    Paid,
    Overdue,
}

impl BillingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingStatus::Pending => "pending",
            BillingStatus::Paid => "paid",
            BillingStatus::Overdue => "overdue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Billing {
    #[serde(default = "default_uuid", deserialize_with = "id_or_new")]
    pub id: String,

    pub patient_id: String,

    #[serde(default, deserialize_with = "optional_text")]
    pub appointment_id: Option<String>,

    /// Non-negative amount in the clinic's currency
    pub amount: f64,

    #[serde(default)]
    pub description: String,

    pub status: BillingStatus,

    pub due_date: String,

    #[serde(default, deserialize_with = "optional_text")]
    pub paid_date: Option<String>,

    /// Creation timestamp - drives the revenue window
    #[serde(default = "default_timestamp")]
    pub created_at: String,
}

// ============================================================================
// STATUS PARSING (store columns hold the textual form)
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "no-show" | "no_show" | "noshow" => Ok(AppointmentStatus::NoShow),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl FromStr for BillingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(BillingStatus::Pending),
            "paid" => Ok(BillingStatus::Paid),
            "overdue" => Ok(BillingStatus::Overdue),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BillingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Helper functions for serde defaults
fn default_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_timestamp() -> String {
    Utc::now().to_rfc3339()
}

fn default_duration() -> u32 {
    30
}

/// CSV cells are empty strings rather than absent, so an empty id gets a
/// fresh UUID too.
fn id_or_new<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(match raw {
        Some(id) if !id.trim().is_empty() => id,
        _ => default_uuid(),
    })
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}
