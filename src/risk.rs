// 🎯 No-Show Risk Scorer
// Additive point score over an appointment, its patient and the clinic's
// appointment history, mapped to a capped probability and a risk band.
//
//   history no-show rate * 40
// + Monday +10, hour outside 09:00-16:59 +15, booked > 30 days ahead +20
// + Consultation +5, Follow-up -10 (floored at 0)
// + patient under 30 +10, over 60 -5 (floored at 0)
//
// probability = clamp(score / 100, 0, 0.95)

use crate::dates::{parse_birth_date, parse_date_time};
use crate::models::{Appointment, AppointmentStatus, Patient};
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const MAX_PROBABILITY: f64 = 0.95;
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.30;
pub const HIGH_RISK_THRESHOLD: f64 = 0.60;

pub const NO_FACTORS: &str = "No significant risk factors identified";
pub const FACTOR_MONDAY: &str = "Monday appointment (higher no-show risk)";
pub const FACTOR_OFF_HOURS: &str = "Early morning or late afternoon appointment";
pub const FACTOR_FAR_AHEAD: &str = "Appointment scheduled far in advance";
pub const FACTOR_YOUNGER: &str = "Younger patient demographic";

const HISTORY_WEIGHT: f64 = 40.0;
const HISTORY_FACTOR_RATE: f64 = 0.30;
const MONDAY_POINTS: f64 = 10.0;
const OFF_HOURS_POINTS: f64 = 15.0;
const FAR_AHEAD_POINTS: f64 = 20.0;
const FAR_AHEAD_DAYS: i64 = 30;
const FOLLOW_UP_POINTS: f64 = 10.0;
const CONSULTATION_POINTS: f64 = 5.0;
const YOUNGER_POINTS: f64 = 10.0;
const OLDER_POINTS: f64 = 5.0;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

// ============================================================================
// PREDICTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability < MEDIUM_RISK_THRESHOLD {
            RiskLevel::Low
        } else if probability < HIGH_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoShowPrediction {
    pub appointment_id: String,
    pub probability: f64,
    pub risk_level: RiskLevel,
    /// Human-readable reasons, in evaluation order. Never empty.
    pub factors: Vec<String>,
}

impl NoShowPrediction {
    pub fn summary(&self) -> String {
        format!(
            "{}: {:.0}% ({}) - {}",
            self.appointment_id,
            self.probability * 100.0,
            self.risk_level.as_str(),
            self.factors.join("; ")
        )
    }

    pub fn is_at_risk(&self) -> bool {
        self.risk_level != RiskLevel::Low
    }
}

// ============================================================================
// PATIENT HISTORY INDEX
// ============================================================================

/// Appointments grouped by patient id, built once per snapshot so batch
/// scoring doesn't rescan the whole history for every appointment.
#[derive(Debug, Default)]
pub struct PatientHistory<'a> {
    by_patient: HashMap<&'a str, Vec<&'a Appointment>>,
}

impl<'a> PatientHistory<'a> {
    pub fn index(appointments: &'a [Appointment]) -> Self {
        let mut by_patient: HashMap<&str, Vec<&Appointment>> = HashMap::new();
        for apt in appointments {
            by_patient.entry(apt.patient_id.as_str()).or_default().push(apt);
        }
        PatientHistory { by_patient }
    }

    pub fn for_patient(&self, patient_id: &str) -> &[&'a Appointment] {
        self.by_patient
            .get(patient_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn patient_count(&self) -> usize {
        self.by_patient.len()
    }
}

// ============================================================================
// RISK SCORER
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct RiskScorer {
    /// Reference time for lead-time and age terms
    now: DateTime<Utc>,
}

impl RiskScorer {
    pub fn new(now: DateTime<Utc>) -> Self {
        RiskScorer { now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Score one appointment against the full appointment list.
    pub fn score(
        &self,
        appointment: &Appointment,
        patient: &Patient,
        all_appointments: &[Appointment],
    ) -> NoShowPrediction {
        let history: Vec<&Appointment> = all_appointments
            .iter()
            .filter(|apt| apt.patient_id == patient.id)
            .collect();

        self.score_with_history(appointment, patient, &history)
    }

    /// Score against a pre-grouped history. The slice may contain the target
    /// appointment and other patients' rows; both are filtered out.
    pub fn score_with_history(
        &self,
        appointment: &Appointment,
        patient: &Patient,
        history: &[&Appointment],
    ) -> NoShowPrediction {
        let mut factors = Vec::new();
        let mut score = 0.0;

        // 1. Historical no-show rate
        let prior: Vec<&&Appointment> = history
            .iter()
            .filter(|apt| apt.patient_id == patient.id && apt.id != appointment.id)
            .collect();

        if !prior.is_empty() {
            let no_shows = prior
                .iter()
                .filter(|apt| apt.status == AppointmentStatus::NoShow)
                .count();
            let rate = no_shows as f64 / prior.len() as f64;
            score += rate * HISTORY_WEIGHT;

            if rate > HISTORY_FACTOR_RATE {
                factors.push(format!(
                    "High historical no-show rate ({}%)",
                    (rate * 100.0).round() as i64
                ));
            }
        }

        // 2-4. Calendar terms - skipped entirely when the date is unreadable
        match parse_date_time(&appointment.appointment_date) {
            Ok(when) => {
                if when.weekday() == Weekday::Mon {
                    score += MONDAY_POINTS;
                    factors.push(FACTOR_MONDAY.to_string());
                }

                let hour = when.hour();
                if hour < 9 || hour > 16 {
                    score += OFF_HOURS_POINTS;
                    factors.push(FACTOR_OFF_HOURS.to_string());
                }

                let lead = when.with_timezone(&Utc) - self.now;
                let days_until = lead.num_milliseconds().div_euclid(MILLIS_PER_DAY);
                if days_until > FAR_AHEAD_DAYS {
                    score += FAR_AHEAD_POINTS;
                    factors.push(FACTOR_FAR_AHEAD.to_string());
                }
            }
            Err(e) => {
                tracing::warn!(
                    appointment_id = %appointment.id,
                    "skipping calendar risk terms: {}",
                    e
                );
            }
        }

        // 5. Appointment type
        match appointment.appointment_type.as_str() {
            "Follow-up" => score = f64::max(score - FOLLOW_UP_POINTS, 0.0),
            "Consultation" => score += CONSULTATION_POINTS,
            _ => {}
        }

        // 6. Age (calendar-year difference)
        match parse_birth_date(&patient.date_of_birth) {
            Ok(born) => {
                let age = self.now.year() - born.year();
                if age < 30 {
                    score += YOUNGER_POINTS;
                    factors.push(FACTOR_YOUNGER.to_string());
                } else if age > 60 {
                    score = f64::max(score - OLDER_POINTS, 0.0);
                }
            }
            Err(e) => {
                tracing::warn!(patient_id = %patient.id, "skipping age risk term: {}", e);
            }
        }

        let probability = (score / 100.0).clamp(0.0, MAX_PROBABILITY);

        if factors.is_empty() {
            factors.push(NO_FACTORS.to_string());
        }

        NoShowPrediction {
            appointment_id: appointment.id.clone(),
            probability,
            risk_level: RiskLevel::from_probability(probability),
            factors,
        }
    }

    /// Score many appointments in parallel.
    ///
    /// Appointments whose patient is not in `patients` are skipped. Output
    /// keeps the order of `targets`.
    pub fn score_batch(
        &self,
        targets: &[Appointment],
        patients: &[Patient],
        all_appointments: &[Appointment],
    ) -> Vec<NoShowPrediction> {
        let history = PatientHistory::index(all_appointments);
        let patients_by_id: HashMap<&str, &Patient> =
            patients.iter().map(|p| (p.id.as_str(), p)).collect();

        targets
            .par_iter()
            .filter_map(|apt| match patients_by_id.get(apt.patient_id.as_str()) {
                Some(patient) => Some(self.score_with_history(
                    apt,
                    patient,
                    history.for_patient(&patient.id),
                )),
                None => {
                    tracing::debug!(
                        appointment_id = %apt.id,
                        patient_id = %apt.patient_id,
                        "no patient for appointment, not scored"
                    );
                    None
                }
            })
            .collect()
    }
}
