use crate::dashboard::ClinicSnapshot;
use crate::models::{Appointment, AppointmentStatus, Billing, BillingStatus, Patient};
use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery (in-memory databases report "memory")
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

    // ==========================================================================
    // Patients
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS patients (
            id TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            date_of_birth TEXT NOT NULL,
            address TEXT NOT NULL DEFAULT '',
            medical_history TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Appointments
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS appointments (
            id TEXT PRIMARY KEY,
            patient_id TEXT NOT NULL,
            appointment_date TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL DEFAULT 30 CHECK (duration_minutes >= 1),
            appointment_type TEXT NOT NULL,
            status TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Billing
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS billing (
            id TEXT PRIMARY KEY,
            patient_id TEXT NOT NULL,
            appointment_id TEXT,
            amount REAL NOT NULL CHECK (amount >= 0),
            description TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL,
            due_date TEXT NOT NULL,
            paid_date TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_appointments_date ON appointments(appointment_date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_billing_patient ON billing(patient_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_billing_created ON billing(created_at)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// CSV IMPORT
// ============================================================================

/// Load a CSV export whose headers are the record's field names.
pub fn load_csv<T: DeserializeOwned>(csv_path: &Path) -> Result<Vec<T>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    read_csv(file).with_context(|| format!("Failed to read {}", csv_path.display()))
}

pub fn read_csv<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut records = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let record: T = result.with_context(|| format!("Failed to deserialize row {}", line + 1))?;
        records.push(record);
    }

    Ok(records)
}

// ============================================================================
// INSERTS (rows whose id already exists are skipped)
// ============================================================================

fn is_duplicate(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
            && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn count_insert(result: rusqlite::Result<usize>, inserted: &mut usize, duplicates: &mut usize) -> Result<()> {
    match result {
        Ok(_) => *inserted += 1,
        Err(e) if is_duplicate(&e) => *duplicates += 1,
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn insert_patients(conn: &Connection, patients: &[Patient]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    let mut stmt = conn.prepare(
        "INSERT INTO patients (
            id, first_name, last_name, email, phone, date_of_birth,
            address, medical_history, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;

    for p in patients {
        let result = stmt.execute(params![
            p.id,
            p.first_name,
            p.last_name,
            p.email,
            p.phone,
            p.date_of_birth,
            p.address,
            p.medical_history,
            p.created_at,
        ]);
        count_insert(result, &mut inserted, &mut duplicates)?;
    }

    tracing::info!(inserted, duplicates, "patients imported");
    Ok(inserted)
}

pub fn insert_appointments(conn: &Connection, appointments: &[Appointment]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    let mut stmt = conn.prepare(
        "INSERT INTO appointments (
            id, patient_id, appointment_date, duration_minutes, appointment_type,
            status, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;

    for apt in appointments {
        let result = stmt.execute(params![
            apt.id,
            apt.patient_id,
            apt.appointment_date,
            apt.duration_minutes,
            apt.appointment_type,
            apt.status.as_str(),
            apt.notes,
            apt.created_at,
        ]);
        count_insert(result, &mut inserted, &mut duplicates)?;
    }

    tracing::info!(inserted, duplicates, "appointments imported");
    Ok(inserted)
}

pub fn insert_billing(conn: &Connection, billing: &[Billing]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    let mut stmt = conn.prepare(
        "INSERT INTO billing (
            id, patient_id, appointment_id, amount, description, status,
            due_date, paid_date, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;

    for bill in billing {
        let result = stmt.execute(params![
            bill.id,
            bill.patient_id,
            bill.appointment_id,
            bill.amount,
            bill.description,
            bill.status.as_str(),
            bill.due_date,
            bill.paid_date,
            bill.created_at,
        ]);
        count_insert(result, &mut inserted, &mut duplicates)?;
    }

    tracing::info!(inserted, duplicates, "billing records imported");
    Ok(inserted)
}

// ============================================================================
// LOADERS
// ============================================================================

/// Read a status column through its `FromStr` impl
fn status_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn load_patients(conn: &Connection) -> Result<Vec<Patient>> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, email, phone, date_of_birth,
                address, medical_history, created_at
         FROM patients
         ORDER BY created_at DESC",
    )?;

    let patients = stmt
        .query_map([], |row| {
            Ok(Patient {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                email: row.get(3)?,
                phone: row.get(4)?,
                date_of_birth: row.get(5)?,
                address: row.get(6)?,
                medical_history: row.get(7)?,
                created_at: row.get(8)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to load patients")?;

    Ok(patients)
}

pub fn load_appointments(conn: &Connection) -> Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, appointment_date, duration_minutes, appointment_type,
                status, notes, created_at
         FROM appointments
         ORDER BY appointment_date DESC",
    )?;

    let appointments = stmt
        .query_map([], |row| {
            Ok(Appointment {
                id: row.get(0)?,
                patient_id: row.get(1)?,
                appointment_date: row.get(2)?,
                duration_minutes: row.get(3)?,
                appointment_type: row.get(4)?,
                status: status_column::<AppointmentStatus>(row, 5)?,
                notes: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to load appointments")?;

    Ok(appointments)
}

pub fn load_billing(conn: &Connection) -> Result<Vec<Billing>> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, appointment_id, amount, description, status,
                due_date, paid_date, created_at
         FROM billing
         ORDER BY created_at DESC",
    )?;

    let billing = stmt
        .query_map([], |row| {
            Ok(Billing {
                id: row.get(0)?,
                patient_id: row.get(1)?,
                appointment_id: row.get(2)?,
                amount: row.get(3)?,
                description: row.get(4)?,
                status: status_column::<BillingStatus>(row, 5)?,
                due_date: row.get(6)?,
                paid_date: row.get(7)?,
                created_at: row.get(8)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to load billing")?;

    Ok(billing)
}

pub fn load_snapshot(conn: &Connection) -> Result<ClinicSnapshot> {
    Ok(ClinicSnapshot {
        patients: load_patients(conn)?,
        appointments: load_appointments(conn)?,
        billing: load_billing(conn)?,
    })
}

/// Row counts per table: (patients, appointments, billing)
pub fn verify_counts(conn: &Connection) -> Result<(i64, i64, i64)> {
    let count = |table: &str| -> Result<i64> {
        let n = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(n)
    };

    Ok((count("patients")?, count("appointments")?, count("billing")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    const PATIENTS_CSV: &str = "\
id,first_name,last_name,email,phone,date_of_birth,address,medical_history,created_at
p1,Ada,Lovelace,ada@example.com,555-0101,1990-12-10,,,2024-01-01T00:00:00Z
,Alan,Turing,,,1954-06-23,,Asthma,2024-02-01T00:00:00Z
";

    const APPOINTMENTS_CSV: &str = "\
id,patient_id,appointment_date,duration_minutes,appointment_type,status,notes,created_at
a1,p1,2025-03-10T08:00:00Z,30,Checkup,scheduled,,2025-02-01T00:00:00Z
a2,p1,2025-02-10T10:00:00Z,45,Follow-up,no-show,missed,2025-01-15T00:00:00Z
";

    const BILLING_CSV: &str = "\
id,patient_id,appointment_id,amount,description,status,due_date,paid_date,created_at
b1,p1,a2,120.50,Follow-up visit,paid,2025-03-01,2025-02-20,2025-02-11T09:00:00Z
b2,p1,,80,Lab work,pending,2025-03-15,,2025-02-12T09:00:00Z
";

    #[test]
    fn test_read_csv_records() {
        let patients: Vec<Patient> = read_csv(PATIENTS_CSV.as_bytes()).unwrap();
        assert_eq!(patients.len(), 2);
        assert_eq!(patients[0].id, "p1");
        // empty id replaced by a generated UUID
        assert!(uuid::Uuid::parse_str(&patients[1].id).is_ok());
        assert_eq!(patients[1].medical_history, "Asthma");

        let appointments: Vec<Appointment> = read_csv(APPOINTMENTS_CSV.as_bytes()).unwrap();
        assert_eq!(appointments[1].status, AppointmentStatus::NoShow);
        assert_eq!(appointments[1].duration_minutes, 45);

        let billing: Vec<Billing> = read_csv(BILLING_CSV.as_bytes()).unwrap();
        assert_eq!(billing[0].appointment_id.as_deref(), Some("a2"));
        assert_eq!(billing[1].appointment_id, None);
        assert_eq!(billing[1].paid_date, None);
        assert_eq!(billing[1].amount, 80.0);
    }

    #[test]
    fn test_read_csv_reports_bad_rows() {
        let bad = "id,patient_id,appointment_date,duration_minutes,appointment_type,status,notes,created_at\n\
                   a1,p1,2025-03-10T08:00:00Z,30,Checkup,rescheduled,,2025-02-01T00:00:00Z\n";
        let result: Result<Vec<Appointment>> = read_csv(bad.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let conn = memory_db();

        let patients: Vec<Patient> = read_csv(PATIENTS_CSV.as_bytes()).unwrap();
        let appointments: Vec<Appointment> = read_csv(APPOINTMENTS_CSV.as_bytes()).unwrap();
        let billing: Vec<Billing> = read_csv(BILLING_CSV.as_bytes()).unwrap();

        assert_eq!(insert_patients(&conn, &patients).unwrap(), 2);
        assert_eq!(insert_appointments(&conn, &appointments).unwrap(), 2);
        assert_eq!(insert_billing(&conn, &billing).unwrap(), 2);

        let snapshot = load_snapshot(&conn).unwrap();
        assert_eq!(snapshot.patients.len(), 2);
        assert_eq!(snapshot.appointments.len(), 2);
        assert_eq!(snapshot.billing.len(), 2);

        // newest appointment first
        assert_eq!(snapshot.appointments[0], appointments[0]);
        assert_eq!(snapshot.appointments[1], appointments[1]);

        let b2 = snapshot.billing.iter().find(|b| b.id == "b2").unwrap();
        assert_eq!(b2, &billing[1]);

        assert_eq!(verify_counts(&conn).unwrap(), (2, 2, 2));
    }

    #[test]
    fn test_duplicate_ids_skipped() {
        let conn = memory_db();
        let appointments: Vec<Appointment> = read_csv(APPOINTMENTS_CSV.as_bytes()).unwrap();

        assert_eq!(insert_appointments(&conn, &appointments).unwrap(), 2);
        assert_eq!(insert_appointments(&conn, &appointments).unwrap(), 0);
        assert_eq!(verify_counts(&conn).unwrap(), (0, 2, 0));
    }

    #[test]
    fn test_unknown_status_in_store_is_an_error() {
        let conn = memory_db();
        conn.execute(
            "INSERT INTO billing (id, patient_id, amount, status, due_date, created_at)
             VALUES ('b9', 'p1', 10.0, 'refunded', '2025-03-01', '2025-02-01T00:00:00Z')",
            [],
        )
        .unwrap();

        assert!(load_billing(&conn).is_err());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let conn = memory_db();
        let mut billing: Vec<Billing> = read_csv(BILLING_CSV.as_bytes()).unwrap();
        billing[0].amount = -5.0;

        assert!(insert_billing(&conn, &billing[..1]).is_err());
    }
}
