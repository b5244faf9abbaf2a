//! EHR rows. One per appointment.

use crate::db::{parse_column, parse_optional_column};
use crate::models::Ehr;
use crate::{AppointmentStatus, EhrStatus, HospitalError, HospitalResult, RecordId};
use rusqlite::{params, Connection, OptionalExtension, Row};

const COLUMNS: &str = "id, appointment_id, patient_id, doctor_id, nurse_id, temperature, \
                       blood_pressure, heart_rate, diagnosis, prescription, further_tests, \
                       status, created_at, updated_at";

fn ehr_from_row(row: &Row<'_>) -> rusqlite::Result<Ehr> {
    Ok(Ehr {
        id: parse_column(row, 0)?,
        appointment_id: parse_column(row, 1)?,
        patient_id: parse_column(row, 2)?,
        doctor_id: parse_optional_column(row, 3)?,
        nurse_id: parse_optional_column(row, 4)?,
        temperature: row.get(5)?,
        blood_pressure: row.get(6)?,
        heart_rate: row.get(7)?,
        diagnosis: row.get(8)?,
        prescription: row.get(9)?,
        further_tests: row.get(10)?,
        status: parse_column(row, 11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn find_where(conn: &Connection, column: &str, value: RecordId) -> HospitalResult<Option<Ehr>> {
    let ehr = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM ehrs WHERE {column} = ?1"),
            params![value.to_string()],
            ehr_from_row,
        )
        .optional()?;
    Ok(ehr)
}

fn list_where(conn: &Connection, filter: &str, args: impl rusqlite::Params) -> HospitalResult<Vec<Ehr>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM ehrs WHERE {filter} ORDER BY created_at"
    ))?;
    let rows = stmt.query_map(args, ehr_from_row)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

pub fn insert(conn: &Connection, ehr: &Ehr) -> HospitalResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO ehrs ({COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        ),
        params![
            ehr.id.to_string(),
            ehr.appointment_id.to_string(),
            ehr.patient_id.to_string(),
            ehr.doctor_id.map(|id| id.to_string()),
            ehr.nurse_id.map(|id| id.to_string()),
            ehr.temperature,
            ehr.blood_pressure,
            ehr.heart_rate,
            ehr.diagnosis,
            ehr.prescription,
            ehr.further_tests,
            ehr.status.as_str(),
            ehr.created_at,
            ehr.updated_at,
        ],
    )
    .map_err(|e| {
        if super::is_constraint_violation(&e) {
            HospitalError::validation("Appointment already has an EHR")
        } else {
            HospitalError::Database(e)
        }
    })?;
    Ok(())
}

/// Write back every mutable column of `ehr`.
pub fn save(conn: &Connection, ehr: &Ehr) -> HospitalResult<()> {
    let updated = conn.execute(
        "UPDATE ehrs
         SET doctor_id = ?1, nurse_id = ?2, temperature = ?3, blood_pressure = ?4,
             heart_rate = ?5, diagnosis = ?6, prescription = ?7, further_tests = ?8,
             status = ?9, updated_at = ?10
         WHERE id = ?11",
        params![
            ehr.doctor_id.map(|id| id.to_string()),
            ehr.nurse_id.map(|id| id.to_string()),
            ehr.temperature,
            ehr.blood_pressure,
            ehr.heart_rate,
            ehr.diagnosis,
            ehr.prescription,
            ehr.further_tests,
            ehr.status.as_str(),
            ehr.updated_at,
            ehr.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(HospitalError::not_found("EHR record not found"));
    }
    Ok(())
}

pub fn find(conn: &Connection, id: RecordId) -> HospitalResult<Option<Ehr>> {
    find_where(conn, "id", id)
}

pub fn find_by_appointment(conn: &Connection, appointment_id: RecordId) -> HospitalResult<Option<Ehr>> {
    find_where(conn, "appointment_id", appointment_id)
}

pub fn list_for_patient(conn: &Connection, patient_id: RecordId) -> HospitalResult<Vec<Ehr>> {
    list_where(conn, "patient_id = ?1", params![patient_id.to_string()])
}

pub fn list_for_doctor(conn: &Connection, doctor_id: RecordId) -> HospitalResult<Vec<Ehr>> {
    list_where(conn, "doctor_id = ?1", params![doctor_id.to_string()])
}

/// EHRs assigned to `doctor_id` with vitals recorded and no diagnosis yet. Records whose
/// appointment is closed are left out.
pub fn list_pending_for_doctor(conn: &Connection, doctor_id: RecordId) -> HospitalResult<Vec<Ehr>> {
    list_where(
        conn,
        "doctor_id = ?1 AND status = ?2 AND appointment_id IN (
             SELECT id FROM appointments WHERE status NOT IN (?3, ?4))",
        params![
            doctor_id.to_string(),
            EhrStatus::VitalsRecorded.as_str(),
            AppointmentStatus::Completed.as_str(),
            AppointmentStatus::Canceled.as_str(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::appointments::{self, fixtures};
    use crate::Database;
    use chrono::{TimeZone, Utc};

    fn ehr_for(appointment_id: RecordId, patient_id: RecordId) -> Ehr {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        Ehr {
            id: RecordId::new(),
            appointment_id,
            patient_id,
            doctor_id: None,
            nurse_id: None,
            temperature: Some(36.9),
            blood_pressure: Some("120/80".into()),
            heart_rate: Some(70),
            diagnosis: None,
            prescription: None,
            further_tests: None,
            status: EhrStatus::VitalsRecorded,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_one_ehr_per_appointment() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let p = fixtures::patient(conn, "PAT-1");
            let appt = fixtures::appointment(p, fixtures::at(1, 9));
            appointments::insert(conn, &appt)?;

            let first = ehr_for(appt.id, p);
            insert(conn, &first)?;
            assert_eq!(find_by_appointment(conn, appt.id)?, Some(first));

            let second = insert(conn, &ehr_for(appt.id, p));
            assert!(matches!(second, Err(HospitalError::Validation(_))));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_deleting_appointment_removes_ehr() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let p = fixtures::patient(conn, "PAT-1");
            let appt = fixtures::appointment(p, fixtures::at(1, 9));
            appointments::insert(conn, &appt)?;
            let ehr = ehr_for(appt.id, p);
            insert(conn, &ehr)?;

            appointments::delete(conn, appt.id)?;
            assert!(find(conn, ehr.id)?.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_pending_skips_closed_appointments() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let p = fixtures::patient(conn, "PAT-1");
            let doctor = fixtures::doctor(conn, "DOC-1");
            let mut open = fixtures::appointment(p, fixtures::at(1, 9));
            let mut closed = fixtures::appointment(p, fixtures::at(1, 10));
            open.status = AppointmentStatus::VitalsRecorded;
            closed.status = AppointmentStatus::Canceled;
            appointments::insert(conn, &open)?;
            appointments::insert(conn, &closed)?;

            let waiting = Ehr {
                doctor_id: Some(doctor),
                ..ehr_for(open.id, p)
            };
            insert(conn, &waiting)?;
            insert(conn, &Ehr {
                doctor_id: Some(doctor),
                ..ehr_for(closed.id, p)
            })?;

            assert_eq!(list_pending_for_doctor(conn, doctor)?, vec![waiting]);
            assert_eq!(list_for_doctor(conn, doctor)?.len(), 2);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_patient_listing_and_save() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            let p = fixtures::patient(conn, "PAT-1");
            let appt = fixtures::appointment(p, fixtures::at(1, 9));
            appointments::insert(conn, &appt)?;
            let mut ehr = ehr_for(appt.id, p);
            insert(conn, &ehr)?;

            ehr.diagnosis = Some("Seasonal flu".into());
            ehr.status = EhrStatus::Diagnosed;
            save(conn, &ehr)?;

            let listed = list_for_patient(conn, p)?;
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].diagnosis.as_deref(), Some("Seasonal flu"));
            assert_eq!(listed[0].status, EhrStatus::Diagnosed);
            Ok(())
        })
        .unwrap();
    }
}
