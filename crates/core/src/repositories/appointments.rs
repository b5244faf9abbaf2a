//! Appointment rows.

use crate::db::{parse_column, parse_optional_column};
use crate::models::Appointment;
use crate::{AppointmentStatus, HospitalError, HospitalResult, RecordId};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

const COLUMNS: &str = "id, patient_id, doctor_id, scheduled_time, duration_minutes, status, \
                       urgency_level, appointment_type, location, description, created_at, updated_at";

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: parse_column(row, 0)?,
        patient_id: parse_column(row, 1)?,
        doctor_id: parse_optional_column(row, 2)?,
        scheduled_time: row.get(3)?,
        duration_minutes: row.get(4)?,
        status: parse_column(row, 5)?,
        urgency_level: parse_column(row, 6)?,
        appointment_type: parse_column(row, 7)?,
        location: row.get(8)?,
        description: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn collect(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> HospitalResult<Vec<Appointment>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, appointment_from_row)?;

    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(row?);
    }
    Ok(appointments)
}

pub fn insert(conn: &Connection, appt: &Appointment) -> HospitalResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO appointments ({COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            appt.doctor_id.map(|id| id.to_string()),
            appt.scheduled_time,
            appt.duration_minutes,
            appt.status.as_str(),
            appt.urgency_level.as_str(),
            appt.appointment_type.as_str(),
            appt.location,
            appt.description,
            appt.created_at,
            appt.updated_at,
        ],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, id: RecordId) -> HospitalResult<Option<Appointment>> {
    let appt = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM appointments WHERE id = ?1"),
            params![id.to_string()],
            appointment_from_row,
        )
        .optional()?;
    Ok(appt)
}

/// Fetch an appointment only if `party` is its patient or doctor.
pub fn find_owned(
    conn: &Connection,
    party: RecordId,
    id: RecordId,
) -> HospitalResult<Option<Appointment>> {
    Ok(find(conn, id)?.filter(|appt| appt.involves(party)))
}

/// Every appointment where `party` is the patient or the doctor, earliest first.
pub fn list_for_party(conn: &Connection, party: RecordId) -> HospitalResult<Vec<Appointment>> {
    collect(
        conn,
        &format!(
            "SELECT {COLUMNS} FROM appointments
             WHERE patient_id = ?1 OR doctor_id = ?1
             ORDER BY scheduled_time"
        ),
        params![party.to_string()],
    )
}

/// Appointments scheduled in `[day_start, day_end)` plus every earlier one not yet completed.
pub fn list_due(
    conn: &Connection,
    day_start: NaiveDateTime,
    day_end: NaiveDateTime,
) -> HospitalResult<Vec<Appointment>> {
    collect(
        conn,
        &format!(
            "SELECT {COLUMNS} FROM appointments
             WHERE (scheduled_time >= ?1 AND scheduled_time < ?2)
                OR (scheduled_time < ?1 AND status != ?3)
             ORDER BY scheduled_time"
        ),
        params![day_start, day_end, AppointmentStatus::Completed.as_str()],
    )
}

/// Write back every mutable column of `appt`.
pub fn save(conn: &Connection, appt: &Appointment) -> HospitalResult<()> {
    let updated = conn.execute(
        "UPDATE appointments
         SET doctor_id = ?1, scheduled_time = ?2, duration_minutes = ?3, status = ?4,
             urgency_level = ?5, location = ?6, description = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            appt.doctor_id.map(|id| id.to_string()),
            appt.scheduled_time,
            appt.duration_minutes,
            appt.status.as_str(),
            appt.urgency_level.as_str(),
            appt.location,
            appt.description,
            appt.updated_at,
            appt.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(HospitalError::not_found("Appointment not found"));
    }
    Ok(())
}

/// Hard-delete an appointment. Its EHR goes with it.
pub fn delete(conn: &Connection, id: RecordId) -> HospitalResult<()> {
    let deleted = conn.execute(
        "DELETE FROM appointments WHERE id = ?1",
        params![id.to_string()],
    )?;
    if deleted == 0 {
        return Err(HospitalError::not_found("Appointment not found"));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{Appointment, Doctor, Patient, PatientDetails, User};
    use crate::repositories::identity;
    use crate::{
        AppointmentStatus, AppointmentType, DoctorStatus, EmailAddress, RecordId, Role,
        UrgencyLevel,
    };
    use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
    use rusqlite::Connection;

    pub fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn user(username: &str, role: Role) -> User {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        User {
            id: RecordId::new(),
            username: username.into(),
            email: EmailAddress::parse(format!("{username}@example.org")).unwrap(),
            role,
            password_hash: "hash".into(),
            otp: None,
            otp_expiry: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Insert a patient (and its user) and return the patient profile id.
    pub fn patient(conn: &Connection, username: &str) -> RecordId {
        let user = user(username, Role::Patient);
        let patient = Patient {
            id: RecordId::new(),
            user_id: user.id,
            full_name: username.into(),
            details: PatientDetails::default(),
        };
        identity::insert_user(conn, &user).unwrap();
        identity::insert_patient(conn, &patient).unwrap();
        patient.id
    }

    pub fn doctor(conn: &Connection, username: &str) -> RecordId {
        let user = user(username, Role::Doctor);
        let doctor = Doctor {
            id: RecordId::new(),
            user_id: user.id,
            full_name: username.into(),
            status: DoctorStatus::Active,
        };
        identity::insert_user(conn, &user).unwrap();
        identity::insert_doctor(conn, &doctor).unwrap();
        doctor.id
    }

    pub fn appointment(patient_id: RecordId, when: NaiveDateTime) -> Appointment {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        Appointment {
            id: RecordId::new(),
            patient_id,
            doctor_id: None,
            scheduled_time: when,
            duration_minutes: 30,
            status: AppointmentStatus::Pending,
            urgency_level: UrgencyLevel::Low,
            appointment_type: AppointmentType::Consultation,
            location: None,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}
