// 📊 Dashboard - one analytics pass over a clinic snapshot
//
// Composes the three independent calculators for the CLI report and the
// HTTP API. Every render gets the whole snapshot and an explicit time.

use crate::models::{Appointment, AppointmentStatus, Billing, Patient};
use crate::revenue::{RevenueAggregator, RevenueSummary};
use crate::risk::{NoShowPrediction, PatientHistory, RiskScorer};
use crate::trends::{TrendAggregator, TrendSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Everything the store holds, loaded into memory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicSnapshot {
    pub patients: Vec<Patient>,
    pub appointments: Vec<Appointment>,
    pub billing: Vec<Billing>,
}

impl ClinicSnapshot {
    pub fn find_patient(&self, patient_id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == patient_id)
    }

    pub fn find_appointment(&self, appointment_id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == appointment_id)
    }

    /// Score a single appointment by id. `None` when the appointment or its
    /// patient is not in the snapshot.
    pub fn predict(&self, appointment_id: &str, now: DateTime<Utc>) -> Option<NoShowPrediction> {
        let appointment = self.find_appointment(appointment_id)?;
        let patient = self.find_patient(&appointment.patient_id)?;
        Some(RiskScorer::new(now).score(appointment, patient, &self.appointments))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub appointment_id: String,
    pub appointment_date: String,
    pub appointment_type: String,
    pub patient_id: String,
    pub patient_name: String,
    pub prediction: NoShowPrediction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub total_patients: usize,
    pub trends: TrendSummary,
    pub revenue: RevenueSummary,
    pub upcoming_risks: Vec<RiskAssessment>,
}

impl Dashboard {
    pub fn build(snapshot: &ClinicSnapshot, now: DateTime<Utc>) -> Self {
        Dashboard {
            generated_at: now,
            total_patients: snapshot.patients.len(),
            trends: TrendAggregator::new().trends(&snapshot.appointments, now),
            revenue: RevenueAggregator::new().revenue(&snapshot.billing, now),
            upcoming_risks: upcoming_risks(snapshot, now),
        }
    }

    pub fn high_risk_count(&self) -> usize {
        self.upcoming_risks
            .iter()
            .filter(|r| r.prediction.risk_level == crate::risk::RiskLevel::High)
            .count()
    }
}

/// Scheduled appointments at medium or high risk, most likely no-show first.
pub fn upcoming_risks(snapshot: &ClinicSnapshot, now: DateTime<Utc>) -> Vec<RiskAssessment> {
    let scorer = RiskScorer::new(now);
    let history = PatientHistory::index(&snapshot.appointments);
    let patients: HashMap<&str, &Patient> = snapshot
        .patients
        .iter()
        .map(|p| (p.id.as_str(), p))
        .collect();

    let mut risks: Vec<RiskAssessment> = snapshot
        .appointments
        .iter()
        .filter(|apt| apt.status == AppointmentStatus::Scheduled)
        .filter_map(|apt| {
            let patient = patients.get(apt.patient_id.as_str())?;
            let prediction =
                scorer.score_with_history(apt, patient, history.for_patient(&patient.id));

            prediction.is_at_risk().then(|| RiskAssessment {
                appointment_id: apt.id.clone(),
                appointment_date: apt.appointment_date.clone(),
                appointment_type: apt.appointment_type.clone(),
                patient_id: patient.id.clone(),
                patient_name: patient.full_name(),
                prediction,
            })
        })
        .collect();

    // stable: ties keep snapshot order
    risks.sort_by(|a, b| b.prediction.probability.total_cmp(&a.prediction.probability));
    risks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BillingStatus;
    use crate::risk::RiskLevel;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap()
    }

    fn patient(id: &str, born: &str) -> Patient {
        Patient {
            id: id.to_string(),
            first_name: "Pat".to_string(),
            last_name: id.to_uppercase(),
            email: String::new(),
            phone: String::new(),
            date_of_birth: born.to_string(),
            address: String::new(),
            medical_history: String::new(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn appointment(id: &str, patient_id: &str, date: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: id.to_string(),
            patient_id: patient_id.to_string(),
            appointment_date: date.to_string(),
            duration_minutes: 30,
            appointment_type: "Checkup".to_string(),
            status,
            notes: String::new(),
            created_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    fn snapshot() -> ClinicSnapshot {
        use AppointmentStatus::*;

        ClinicSnapshot {
            patients: vec![
                patient("young", "2001-04-02"),
                patient("middle", "1980-04-02"),
                patient("flaky", "1998-04-02"),
            ],
            appointments: vec![
                // young: Monday 08:00 -> 0.35 medium
                appointment("a1", "young", "2025-03-10T08:00:00Z", Scheduled),
                // middle: Wednesday 10:00 -> 0.0 low, filtered out
                appointment("a2", "middle", "2025-03-12T10:00:00Z", Scheduled),
                // flaky: 2 of 2 no-shows + Monday + 18:00 + young -> 0.75 high
                appointment("a3", "flaky", "2025-03-10T18:00:00Z", Scheduled),
                appointment("h1", "flaky", "2025-02-20T10:00:00Z", NoShow),
                appointment("h2", "flaky", "2025-02-25T10:00:00Z", NoShow),
                // completed appointments are never in the upcoming list
                appointment("c1", "young", "2025-03-03T08:00:00Z", Completed),
                // unknown patient
                appointment("x1", "ghost", "2025-03-10T08:00:00Z", Scheduled),
            ],
            billing: vec![Billing {
                id: "b1".to_string(),
                patient_id: "middle".to_string(),
                appointment_id: Some("a2".to_string()),
                amount: 150.0,
                description: "Checkup".to_string(),
                status: BillingStatus::Paid,
                due_date: "2025-03-20".to_string(),
                paid_date: Some("2025-03-01".to_string()),
                created_at: "2025-03-01T09:00:00Z".to_string(),
            }],
        }
    }

    #[test]
    fn test_upcoming_risks_sorted_and_filtered() {
        let risks = upcoming_risks(&snapshot(), now());

        let ids: Vec<&str> = risks.iter().map(|r| r.appointment_id.as_str()).collect();
        assert_eq!(ids, vec!["a3", "a1"]);

        assert_eq!(risks[0].prediction.risk_level, RiskLevel::High);
        assert!((risks[0].prediction.probability - 0.75).abs() < 1e-9);
        assert_eq!(risks[0].patient_name, "Pat FLAKY");

        assert_eq!(risks[1].prediction.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_build_dashboard() {
        let dashboard = Dashboard::build(&snapshot(), now());

        assert_eq!(dashboard.total_patients, 3);
        assert_eq!(dashboard.generated_at, now());
        assert_eq!(dashboard.revenue.total_revenue, 150.0);
        assert_eq!(dashboard.revenue.collection_rate, 1.0);
        assert_eq!(dashboard.upcoming_risks.len(), 2);
        assert_eq!(dashboard.high_risk_count(), 1);
        // every appointment in the snapshot is inside the recent window
        assert_eq!(dashboard.trends.total_appointments, 7);
    }

    #[test]
    fn test_predict_by_id() {
        let snap = snapshot();

        let prediction = snap.predict("a1", now()).unwrap();
        assert_eq!(prediction.appointment_id, "a1");
        assert_eq!(prediction.risk_level, RiskLevel::Medium);

        assert!(snap.predict("missing", now()).is_none());
        assert!(snap.predict("x1", now()).is_none());
    }
}
