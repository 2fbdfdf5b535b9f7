// 📈 Appointment Trends
// Volume, completion and no-show rates over the recent window, compared
// against the window before it.

use crate::dates::parse_instant;
use crate::models::{Appointment, AppointmentStatus};
use crate::window::{rate, RollingWindow, WindowPosition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    pub appointment_type: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub total_appointments: usize,
    pub no_show_rate: f64,
    pub previous_no_show_rate: f64,
    /// `no_show_rate - previous_no_show_rate`; negative means improvement
    pub no_show_rate_change: f64,
    pub completion_rate: f64,
    /// Recent appointments per type, in first-seen order
    pub appointments_by_type: Vec<TypeCount>,
}

impl TrendSummary {
    pub fn count_for(&self, appointment_type: &str) -> usize {
        self.appointments_by_type
            .iter()
            .find(|t| t.appointment_type == appointment_type)
            .map(|t| t.count)
            .unwrap_or(0)
    }

    /// Share of recent appointments with this type, 0 when there are none
    pub fn type_share(&self, appointment_type: &str) -> f64 {
        rate(self.count_for(appointment_type), self.total_appointments)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} appointments, {:.0}% completed, no-show {:.1}% ({:+.1}% vs last period)",
            self.total_appointments,
            self.completion_rate * 100.0,
            self.no_show_rate * 100.0,
            self.no_show_rate_change * 100.0
        )
    }
}

pub struct TrendAggregator {
    window: RollingWindow,
}

impl TrendAggregator {
    pub fn new() -> Self {
        TrendAggregator {
            window: RollingWindow::new(),
        }
    }

    pub fn with_window_days(days: i64) -> Self {
        TrendAggregator {
            window: RollingWindow::days(days),
        }
    }

    pub fn trends(
        &self,
        appointments: &[Appointment],
        reference_time: DateTime<Utc>,
    ) -> TrendSummary {
        let mut recent: Vec<&Appointment> = Vec::new();
        let mut previous: Vec<&Appointment> = Vec::new();

        for apt in appointments {
            let when = match parse_instant(&apt.appointment_date) {
                Ok(when) => when,
                Err(e) => {
                    tracing::warn!(appointment_id = %apt.id, "excluded from trends: {}", e);
                    continue;
                }
            };

            match self.window.position(when, reference_time) {
                WindowPosition::Recent => recent.push(apt),
                WindowPosition::Previous => previous.push(apt),
                WindowPosition::Older => {}
            }
        }

        let no_show_rate = status_rate(&recent, AppointmentStatus::NoShow);
        let previous_no_show_rate = status_rate(&previous, AppointmentStatus::NoShow);

        TrendSummary {
            total_appointments: recent.len(),
            no_show_rate,
            previous_no_show_rate,
            no_show_rate_change: no_show_rate - previous_no_show_rate,
            completion_rate: status_rate(&recent, AppointmentStatus::Completed),
            appointments_by_type: count_by_type(&recent),
        }
    }
}

impl Default for TrendAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn status_rate(appointments: &[&Appointment], status: AppointmentStatus) -> f64 {
    let matching = appointments.iter().filter(|apt| apt.status == status).count();
    rate(matching, appointments.len())
}

fn count_by_type(appointments: &[&Appointment]) -> Vec<TypeCount> {
    let mut counts: Vec<TypeCount> = Vec::new();

    for apt in appointments {
        match counts
            .iter_mut()
            .find(|t| t.appointment_type == apt.appointment_type)
        {
            Some(entry) => entry.count += 1,
            None => counts.push(TypeCount {
                appointment_type: apt.appointment_type.clone(),
                count: 1,
            }),
        }
    }

    counts
}
