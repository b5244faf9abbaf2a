//! Users and their role profiles.

use super::is_constraint_violation;
use crate::db::parse_column;
use crate::models::{Doctor, Nurse, Patient, PatientDetails, Profile, User};
use crate::{DoctorStatus, EmailAddress, HospitalError, HospitalResult, RecordId, Role};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_COLUMNS: &str =
    "id, username, email, role, password_hash, otp, otp_expiry, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_column(row, 0)?,
        username: row.get(1)?,
        email: parse_column(row, 2)?,
        role: parse_column(row, 3)?,
        password_hash: row.get(4)?,
        otp: row.get(5)?,
        otp_expiry: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn doctor_from_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: parse_column(row, 0)?,
        user_id: parse_column(row, 1)?,
        full_name: row.get(2)?,
        status: parse_column(row, 3)?,
    })
}

fn nurse_from_row(row: &Row<'_>) -> rusqlite::Result<Nurse> {
    Ok(Nurse {
        id: parse_column(row, 0)?,
        user_id: parse_column(row, 1)?,
        full_name: row.get(2)?,
    })
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: parse_column(row, 0)?,
        user_id: parse_column(row, 1)?,
        full_name: row.get(2)?,
        details: PatientDetails {
            age: row.get(3)?,
            gender: row.get(4)?,
            weight_kg: row.get(5)?,
            height_cm: row.get(6)?,
            hospital_card_id: row.get(7)?,
        },
    })
}

/// Insert a user row.
///
/// # Errors
///
/// `DuplicateIdentity` if the email or username is already taken.
pub fn insert_user(conn: &Connection, user: &User) -> HospitalResult<()> {
    conn.execute(
        &format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            user.id.to_string(),
            user.username,
            user.email.as_str(),
            user.role.as_str(),
            user.password_hash,
            user.otp,
            user.otp_expiry,
            user.created_at,
            user.updated_at,
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            HospitalError::DuplicateIdentity("Email or identification number already registered".into())
        } else {
            HospitalError::Database(e)
        }
    })?;
    Ok(())
}

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> HospitalResult<()> {
    conn.execute(
        "INSERT INTO doctors (id, user_id, full_name, status) VALUES (?1, ?2, ?3, ?4)",
        params![
            doctor.id.to_string(),
            doctor.user_id.to_string(),
            doctor.full_name,
            doctor.status.as_str(),
        ],
    )?;
    Ok(())
}

pub fn insert_nurse(conn: &Connection, nurse: &Nurse) -> HospitalResult<()> {
    conn.execute(
        "INSERT INTO nurses (id, user_id, full_name) VALUES (?1, ?2, ?3)",
        params![nurse.id.to_string(), nurse.user_id.to_string(), nurse.full_name],
    )?;
    Ok(())
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> HospitalResult<()> {
    let d = &patient.details;
    conn.execute(
        "INSERT INTO patients (id, user_id, full_name, age, gender, weight_kg, height_cm, hospital_card_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            patient.id.to_string(),
            patient.user_id.to_string(),
            patient.full_name,
            d.age,
            d.gender,
            d.weight_kg,
            d.height_cm,
            d.hospital_card_id,
        ],
    )?;
    Ok(())
}

/// Insert the role row for `profile`. Admins have no role row.
pub fn insert_profile(conn: &Connection, profile: &Profile) -> HospitalResult<()> {
    match profile {
        Profile::Admin => Ok(()),
        Profile::Doctor(d) => insert_doctor(conn, d),
        Profile::Nurse(n) => insert_nurse(conn, n),
        Profile::Patient(p) => insert_patient(conn, p),
    }
}

pub fn find_user(conn: &Connection, id: RecordId) -> HospitalResult<Option<User>> {
    find_user_where(conn, "id", &id.to_string())
}

pub fn find_user_by_email(conn: &Connection, email: &EmailAddress) -> HospitalResult<Option<User>> {
    find_user_where(conn, "email", email.as_str())
}

pub fn find_user_by_username(conn: &Connection, username: &str) -> HospitalResult<Option<User>> {
    find_user_where(conn, "username", username)
}

fn find_user_where(conn: &Connection, column: &str, value: &str) -> HospitalResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
            params![value],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn list_users(conn: &Connection) -> HospitalResult<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, username"
    ))?;
    let rows = stmt.query_map([], user_from_row)?;

    let mut users = Vec::new();
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

/// Load the role profile belonging to `user`.
///
/// # Errors
///
/// `NotFound` if a non-admin user has no matching role row.
pub fn find_profile(conn: &Connection, user: &User) -> HospitalResult<Profile> {
    let user_id = user.id.to_string();
    let profile = match user.role {
        Role::Admin => Some(Profile::Admin),
        Role::Doctor => conn
            .query_row(
                "SELECT id, user_id, full_name, status FROM doctors WHERE user_id = ?1",
                params![user_id],
                doctor_from_row,
            )
            .optional()?
            .map(Profile::Doctor),
        Role::Nurse => conn
            .query_row(
                "SELECT id, user_id, full_name FROM nurses WHERE user_id = ?1",
                params![user_id],
                nurse_from_row,
            )
            .optional()?
            .map(Profile::Nurse),
        Role::Patient => conn
            .query_row(
                "SELECT id, user_id, full_name, age, gender, weight_kg, height_cm, hospital_card_id
                 FROM patients WHERE user_id = ?1",
                params![user_id],
                patient_from_row,
            )
            .optional()?
            .map(Profile::Patient),
    };

    profile.ok_or_else(|| HospitalError::not_found(format!("{} profile not found", user.role)))
}

pub fn find_doctor(conn: &Connection, id: RecordId) -> HospitalResult<Option<Doctor>> {
    let doctor = conn
        .query_row(
            "SELECT id, user_id, full_name, status FROM doctors WHERE id = ?1",
            params![id.to_string()],
            doctor_from_row,
        )
        .optional()?;
    Ok(doctor)
}

pub fn find_nurse(conn: &Connection, id: RecordId) -> HospitalResult<Option<Nurse>> {
    let nurse = conn
        .query_row(
            "SELECT id, user_id, full_name FROM nurses WHERE id = ?1",
            params![id.to_string()],
            nurse_from_row,
        )
        .optional()?;
    Ok(nurse)
}

pub fn find_patient(conn: &Connection, id: RecordId) -> HospitalResult<Option<Patient>> {
    let patient = conn
        .query_row(
            "SELECT id, user_id, full_name, age, gender, weight_kg, height_cm, hospital_card_id
             FROM patients WHERE id = ?1",
            params![id.to_string()],
            patient_from_row,
        )
        .optional()?;
    Ok(patient)
}

/// Resolve a profile id (doctor, nurse or patient row) to the owning user id.
pub fn user_id_for_profile(conn: &Connection, profile_id: RecordId) -> HospitalResult<Option<RecordId>> {
    let user_id = conn
        .query_row(
            "SELECT user_id FROM doctors WHERE id = ?1
             UNION ALL SELECT user_id FROM nurses WHERE id = ?1
             UNION ALL SELECT user_id FROM patients WHERE id = ?1",
            params![profile_id.to_string()],
            |row| parse_column::<RecordId>(row, 0),
        )
        .optional()?;
    Ok(user_id)
}

/// List doctors, optionally only those currently active.
pub fn list_doctors(conn: &Connection, only_active: bool) -> HospitalResult<Vec<Doctor>> {
    let sql = if only_active {
        "SELECT id, user_id, full_name, status FROM doctors WHERE status = 'active' ORDER BY full_name"
    } else {
        "SELECT id, user_id, full_name, status FROM doctors ORDER BY full_name"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], doctor_from_row)?;

    let mut doctors = Vec::new();
    for row in rows {
        doctors.push(row?);
    }
    Ok(doctors)
}

pub fn set_doctor_status(
    conn: &Connection,
    doctor_id: RecordId,
    status: DoctorStatus,
) -> HospitalResult<()> {
    let updated = conn.execute(
        "UPDATE doctors SET status = ?1 WHERE id = ?2",
        params![status.as_str(), doctor_id.to_string()],
    )?;
    if updated == 0 {
        return Err(HospitalError::not_found("Doctor not found"));
    }
    Ok(())
}

/// Store a one-time code and its expiry on the user.
pub fn set_otp(
    conn: &Connection,
    user_id: RecordId,
    code: &str,
    expiry: DateTime<Utc>,
    now: DateTime<Utc>,
) -> HospitalResult<()> {
    let updated = conn.execute(
        "UPDATE users SET otp = ?1, otp_expiry = ?2, updated_at = ?3 WHERE id = ?4",
        params![code, expiry, now, user_id.to_string()],
    )?;
    if updated == 0 {
        return Err(HospitalError::not_found("User not found"));
    }
    Ok(())
}

/// Replace the password hash and clear any outstanding one-time code.
pub fn update_password(
    conn: &Connection,
    user_id: RecordId,
    password_hash: &str,
    now: DateTime<Utc>,
) -> HospitalResult<()> {
    let updated = conn.execute(
        "UPDATE users SET password_hash = ?1, otp = NULL, otp_expiry = NULL, updated_at = ?2
         WHERE id = ?3",
        params![password_hash, now, user_id.to_string()],
    )?;
    if updated == 0 {
        return Err(HospitalError::not_found("User not found"));
    }
    Ok(())
}
