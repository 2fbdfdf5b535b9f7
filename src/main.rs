use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use std::env;
use std::path::Path;

use clinic_analytics::{
    init_logging, insert_appointments, insert_billing, insert_patients, load_csv, load_snapshot,
    setup_database, verify_counts, AppConfig, Appointment, Billing, Dashboard, Patient,
};

const USAGE: &str = "Usage:
  clinic-analytics import <dir>     Load patients.csv, appointments.csv, billing.csv
  clinic-analytics report [--json]  Print the analytics dashboard";

fn main() -> Result<()> {
    init_logging();
    let config = AppConfig::from_env();
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let dir = args.get(2).context(USAGE)?;
            run_import(&config, Path::new(dir))
        }
        Some("report") => {
            let json = args.iter().skip(2).any(|a| a == "--json");
            run_report(&config, json)
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

fn run_import(config: &AppConfig, dir: &Path) -> Result<()> {
    println!("🗄️  Clinic Import - CSV → SQLite + WAL");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if !dir.is_dir() {
        bail!("Import directory not found: {}", dir.display());
    }

    let conn = Connection::open(config.db_path())
        .with_context(|| format!("Failed to open database {}", config.db_path().display()))?;
    setup_database(&conn)?;
    println!("✓ Database ready: {}", config.db_path().display());

    let patients_csv = dir.join("patients.csv");
    if patients_csv.exists() {
        let patients: Vec<Patient> = load_csv(&patients_csv)?;
        let inserted = insert_patients(&conn, &patients)?;
        println!("✓ Patients: {} loaded, {} new", patients.len(), inserted);
    }

    let appointments_csv = dir.join("appointments.csv");
    if appointments_csv.exists() {
        let appointments: Vec<Appointment> = load_csv(&appointments_csv)?;
        let inserted = insert_appointments(&conn, &appointments)?;
        println!("✓ Appointments: {} loaded, {} new", appointments.len(), inserted);
    }

    let billing_csv = dir.join("billing.csv");
    if billing_csv.exists() {
        let billing: Vec<Billing> = load_csv(&billing_csv)?;
        let inserted = insert_billing(&conn, &billing)?;
        println!("✓ Billing: {} loaded, {} new", billing.len(), inserted);
    }

    let (patients, appointments, billing) = verify_counts(&conn)?;
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "✅ Database holds {} patients, {} appointments, {} billing records",
        patients, appointments, billing
    );

    Ok(())
}

fn run_report(config: &AppConfig, json: bool) -> Result<()> {
    let db_path = config.db_path();
    if !db_path.exists() {
        bail!(
            "Database not found at {} (run `clinic-analytics import <dir>` first)",
            db_path.display()
        );
    }

    let conn = Connection::open(db_path)?;
    let snapshot = load_snapshot(&conn)?;
    let dashboard = Dashboard::build(&snapshot, Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
        return Ok(());
    }

    print_dashboard(&dashboard);
    Ok(())
}

fn print_dashboard(dashboard: &Dashboard) {
    let trends = &dashboard.trends;
    let revenue = &dashboard.revenue;

    println!("📊 Clinic Dashboard ({})", dashboard.generated_at.format("%Y-%m-%d %H:%M UTC"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Patients:            {}", dashboard.total_patients);
    println!(
        "Appointments (30d):  {} ({:.0}% completion rate)",
        trends.total_appointments,
        trends.completion_rate * 100.0
    );
    println!(
        "No-show rate:        {:.1}% ({} {:.1}% vs last period)",
        trends.no_show_rate * 100.0,
        if trends.no_show_rate_change < 0.0 { "↓" } else { "↑" },
        trends.no_show_rate_change.abs() * 100.0
    );
    println!(
        "Revenue (30d):       ${:.0} ({:.0}% collection rate)",
        revenue.total_revenue,
        revenue.collection_rate * 100.0
    );

    println!("\n📅 Appointment distribution");
    for entry in &trends.appointments_by_type {
        println!(
            "   {:<20} {:>4} ({:.0}%)",
            entry.appointment_type,
            entry.count,
            trends.type_share(&entry.appointment_type) * 100.0
        );
    }

    println!("\n💰 Revenue breakdown");
    println!("   Collected  ${:.2}", revenue.total_revenue);
    println!("   Pending    ${:.2}", revenue.pending_revenue);
    println!("   Overdue    ${:.2}", revenue.overdue_revenue);

    println!("\n⚠️  No-show risk - upcoming appointments");
    if dashboard.upcoming_risks.is_empty() {
        println!("   No medium or high risk appointments");
    }
    for risk in &dashboard.upcoming_risks {
        println!(
            "   {:>3.0}% {:<6} {} - {} ({})",
            risk.prediction.probability * 100.0,
            risk.prediction.risk_level.as_str(),
            risk.appointment_date,
            risk.patient_name,
            risk.appointment_type
        );
        for factor in &risk.prediction.factors {
            println!("         • {}", factor);
        }
    }
}
