// 💰 Revenue Analytics
// Collected / pending / overdue totals for billing created in the recent
// window, plus the collection rate.
//
// Amounts are f64, the same as the store's REAL column. Fine for dashboard
// figures; not a ledger.

use crate::dates::parse_instant;
use crate::models::{Billing, BillingStatus};
use crate::window::RollingWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueSummary {
    /// Paid
    pub total_revenue: f64,
    pub pending_revenue: f64,
    pub overdue_revenue: f64,
    pub collection_rate: f64,
    pub record_count: usize,
}

impl RevenueSummary {
    pub fn billed_total(&self) -> f64 {
        self.total_revenue + self.pending_revenue + self.overdue_revenue
    }

    pub fn outstanding(&self) -> f64 {
        self.pending_revenue + self.overdue_revenue
    }

    pub fn summary(&self) -> String {
        format!(
            "Collected ${:.2}, pending ${:.2}, overdue ${:.2}, collection rate {:.0}%",
            self.total_revenue,
            self.pending_revenue,
            self.overdue_revenue,
            self.collection_rate * 100.0
        )
    }
}

pub struct RevenueAggregator {
    window: RollingWindow,
}

impl RevenueAggregator {
    pub fn new() -> Self {
        RevenueAggregator {
            window: RollingWindow::new(),
        }
    }

    pub fn with_window_days(days: i64) -> Self {
        RevenueAggregator {
            window: RollingWindow::days(days),
        }
    }

    pub fn revenue(&self, billing: &[Billing], reference_time: DateTime<Utc>) -> RevenueSummary {
        let mut summary = RevenueSummary::default();

        for bill in billing {
            let created = match parse_instant(&bill.created_at) {
                Ok(created) => created,
                Err(e) => {
                    tracing::warn!(billing_id = %bill.id, "excluded from revenue: {}", e);
                    continue;
                }
            };

            if !self.window.is_recent(created, reference_time) {
                continue;
            }

            summary.record_count += 1;
            match bill.status {
                BillingStatus::Paid => summary.total_revenue += bill.amount,
                BillingStatus::Pending => summary.pending_revenue += bill.amount,
                BillingStatus::Overdue => summary.overdue_revenue += bill.amount,
            }
        }

        let billed = summary.billed_total();
        summary.collection_rate = if billed > 0.0 {
            summary.total_revenue / billed
        } else {
            0.0
        };

        summary
    }
}

impl Default for RevenueAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap()
    }

    fn bill(id: &str, amount: f64, status: BillingStatus, days_ago: i64) -> Billing {
        Billing {
            id: id.to_string(),
            patient_id: "p1".to_string(),
            appointment_id: None,
            amount,
            description: "Visit".to_string(),
            status,
            due_date: "2025-04-01".to_string(),
            paid_date: None,
            created_at: (reference() - Duration::days(days_ago)).to_rfc3339(),
        }
    }

    #[test]
    fn test_empty_is_zero() {
        let summary = RevenueAggregator::new().revenue(&[], reference());

        assert_eq!(summary, RevenueSummary::default());
        assert_eq!(summary.collection_rate, 0.0);
    }

    #[test]
    fn test_collection_rate() {
        let billing = vec![
            bill("b1", 600.0, BillingStatus::Paid, 2),
            bill("b2", 400.0, BillingStatus::Paid, 10),
            bill("b3", 500.0, BillingStatus::Pending, 20),
        ];

        let summary = RevenueAggregator::new().revenue(&billing, reference());

        assert_eq!(summary.total_revenue, 1000.0);
        assert_eq!(summary.pending_revenue, 500.0);
        assert_eq!(summary.overdue_revenue, 0.0);
        assert!((summary.collection_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.record_count, 3);

        println!("✅ Revenue: {}", summary.summary());
    }

    #[test]
    fn test_window_excludes_old_billing() {
        let billing = vec![
            bill("recent", 100.0, BillingStatus::Overdue, 5),
            bill("boundary", 1000.0, BillingStatus::Paid, 30),
            bill("old", 1000.0, BillingStatus::Paid, 45),
        ];

        let summary = RevenueAggregator::new().revenue(&billing, reference());

        assert_eq!(summary.total_revenue, 0.0);
        assert_eq!(summary.overdue_revenue, 100.0);
        assert_eq!(summary.outstanding(), 100.0);
        assert_eq!(summary.collection_rate, 0.0);
        assert_eq!(summary.record_count, 1);
    }

    #[test]
    fn test_zero_amounts_are_empty_safe() {
        let billing = vec![bill("free", 0.0, BillingStatus::Paid, 1)];
        let summary = RevenueAggregator::new().revenue(&billing, reference());

        assert_eq!(summary.collection_rate, 0.0);
        assert_eq!(summary.record_count, 1);
    }

    #[test]
    fn test_malformed_created_at_excluded() {
        let mut broken = bill("bad", 250.0, BillingStatus::Paid, 1);
        broken.created_at = "last tuesday".to_string();

        let billing = vec![broken, bill("ok", 50.0, BillingStatus::Pending, 1)];
        let summary = RevenueAggregator::new().revenue(&billing, reference());

        assert_eq!(summary.total_revenue, 0.0);
        assert_eq!(summary.pending_revenue, 50.0);
    }

    #[test]
    fn test_custom_window() {
        let billing = vec![
            bill("a", 100.0, BillingStatus::Paid, 3),
            bill("b", 100.0, BillingStatus::Paid, 10),
        ];

        let summary = RevenueAggregator::with_window_days(7).revenue(&billing, reference());
        assert_eq!(summary.total_revenue, 100.0);
        assert_eq!(summary.collection_rate, 1.0);
    }
}
