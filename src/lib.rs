// Clinic Analytics - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod dashboard;
pub mod dates;
pub mod db;
pub mod models;
pub mod revenue;
pub mod risk;
pub mod trends;
pub mod window;

// Re-export commonly used types
pub use config::{init_logging, AppConfig};
pub use dashboard::{upcoming_risks, ClinicSnapshot, Dashboard, RiskAssessment};
pub use dates::{parse_birth_date, parse_date_time, parse_instant, DateParseError};
pub use db::{
    insert_appointments, insert_billing, insert_patients, load_appointments, load_billing,
    load_csv, load_patients, load_snapshot, read_csv, setup_database, verify_counts,
};
pub use models::{Appointment, AppointmentStatus, Billing, BillingStatus, Patient, UnknownStatus};
pub use revenue::{RevenueAggregator, RevenueSummary};
pub use risk::{NoShowPrediction, PatientHistory, RiskLevel, RiskScorer};
pub use trends::{TrendAggregator, TrendSummary, TypeCount};
pub use window::{RollingWindow, WindowPosition};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
