//! Appointment booking and lifecycle.

use crate::clock::Clock;
use crate::constants::DEFAULT_APPOINTMENT_DURATION_MINUTES;
use crate::models::Appointment;
use crate::notifications::{Notification, NotificationBroadcaster, Priority};
use crate::repositories::{appointments, identity};
use crate::validation::parse_schedule;
use crate::{
    AppointmentStatus, AppointmentType, Database, HospitalError, HospitalResult, RecordId,
    UrgencyLevel,
};
use chrono::{Duration, SubsecRound};
use std::sync::Arc;

/// Fields a participant may change on an appointment. Date and time travel together.
#[derive(Clone, Debug, Default)]
pub struct AppointmentUpdate {
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Clone)]
pub struct AppointmentService {
    db: Database,
    broadcaster: NotificationBroadcaster,
    clock: Arc<dyn Clock>,
}

impl AppointmentService {
    pub fn new(db: Database, broadcaster: NotificationBroadcaster, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            broadcaster,
            clock,
        }
    }

    /// Books a consultation for `patient_id` at `date` (`YYYY-MM-DD`) and `time` (`HH:MM`).
    ///
    /// The appointment starts PENDING with LOW urgency. Clinical staff are notified.
    pub fn book(&self, patient_id: RecordId, date: &str, time: &str) -> HospitalResult<Appointment> {
        let scheduled_time = parse_schedule(date, time)?;
        let now = self.clock.now();

        let appt = Appointment {
            id: RecordId::new(),
            patient_id,
            doctor_id: None,
            scheduled_time,
            duration_minutes: DEFAULT_APPOINTMENT_DURATION_MINUTES,
            status: AppointmentStatus::Pending,
            urgency_level: UrgencyLevel::Low,
            appointment_type: AppointmentType::Consultation,
            location: None,
            description: None,
            created_at: now,
            updated_at: now,
        };

        self.db.with_conn(|conn| {
            identity::find_patient(conn, patient_id)?
                .ok_or_else(|| HospitalError::not_found("Patient not found"))?;
            appointments::insert(conn, &appt)
        })?;

        tracing::info!(appointment_id = %appt.id, %patient_id, %scheduled_time, "appointment booked");
        self.broadcaster.publish(
            Notification::AppointmentBooked {
                patient_id,
                appointment_id: appt.id,
                time: scheduled_time,
            },
            Priority::Normal,
        );
        Ok(appt)
    }

    /// Raises an emergency for `patient_id`, scheduled now. Every connected client is notified.
    pub fn request_emergency(
        &self,
        patient_id: RecordId,
        location: &str,
        description: &str,
        urgency: UrgencyLevel,
    ) -> HospitalResult<Appointment> {
        let location = location.trim();
        if location.is_empty() {
            return Err(HospitalError::validation("Location is required"));
        }
        let now = self.clock.now();
        let scheduled_time = self.clock.wall_clock().trunc_subsecs(0);

        let appt = Appointment {
            id: RecordId::new(),
            patient_id,
            doctor_id: None,
            scheduled_time,
            duration_minutes: DEFAULT_APPOINTMENT_DURATION_MINUTES,
            status: AppointmentStatus::Pending,
            urgency_level: urgency,
            appointment_type: AppointmentType::Emergency,
            location: Some(location.to_string()),
            description: Some(description.trim().to_string()),
            created_at: now,
            updated_at: now,
        };

        self.db.with_conn(|conn| {
            identity::find_patient(conn, patient_id)?
                .ok_or_else(|| HospitalError::not_found("Patient not found"))?;
            appointments::insert(conn, &appt)
        })?;

        tracing::info!(appointment_id = %appt.id, %patient_id, %urgency, "emergency requested");
        self.broadcaster.publish(
            Notification::EmergencyRequest {
                urgency,
                patient_id,
                location: location.to_string(),
                description: description.trim().to_string(),
                appointment_id: appt.id,
                time: scheduled_time,
            },
            Priority::High,
        );
        Ok(appt)
    }

    /// Appointments where `party` is the patient or the doctor, earliest first.
    pub fn list(&self, party: RecordId) -> HospitalResult<Vec<Appointment>> {
        self.db.with_conn(|conn| appointments::list_for_party(conn, party))
    }

    /// Today's appointments plus any earlier ones not yet completed, earliest first.
    pub fn list_due_for_nurse(&self) -> HospitalResult<Vec<Appointment>> {
        let day_start = self.clock.wall_clock().date().and_time(chrono::NaiveTime::MIN);
        let day_end = day_start + Duration::days(1);
        self.db
            .with_conn(|conn| appointments::list_due(conn, day_start, day_end))
    }

    /// Reschedules and/or cancels an appointment `party` is on.
    ///
    /// Setting the current status again is accepted as a no-op. The only other status a caller
    /// may set here is CANCELED; the clinical stages are driven by [`EhrService`] so the
    /// appointment and its EHR move together. Canceling leaves the EHR at its last stage.
    ///
    /// # Errors
    ///
    /// - [`HospitalError::NotFound`] if the appointment does not exist or `party` is not on it.
    /// - [`HospitalError::Validation`] for a half-given schedule, a malformed date or time, a
    ///   clinical status, or canceling a closed appointment.
    ///
    /// [`EhrService`]: crate::services::EhrService
    pub fn update(
        &self,
        party: RecordId,
        appointment_id: RecordId,
        update: AppointmentUpdate,
    ) -> HospitalResult<Appointment> {
        let reschedule = match (&update.appointment_date, &update.appointment_time) {
            (Some(date), Some(time)) => Some(parse_schedule(date, time)?),
            (None, None) => None,
            _ => {
                return Err(HospitalError::validation(
                    "Appointment date and time must be provided together",
                ))
            }
        };

        let appt = self.db.with_conn(|conn| {
            let mut appt = appointments::find_owned(conn, party, appointment_id)?
                .ok_or_else(|| {
                    tracing::debug!(%party, %appointment_id, "appointment not visible to caller");
                    HospitalError::not_found("Appointment not found")
                })?;

            if let Some(next) = update.status {
                if next != appt.status {
                    if next != AppointmentStatus::Canceled {
                        return Err(HospitalError::validation(format!(
                            "Appointment status {next} is set by the EHR workflow"
                        )));
                    }
                    if !appt.status.can_transition_to(next) {
                        return Err(HospitalError::validation(format!(
                            "Cannot move appointment from {} to {}",
                            appt.status, next
                        )));
                    }
                    appt.status = next;
                }
            }
            if let Some(at) = reschedule {
                appt.scheduled_time = at;
            }

            appt.updated_at = self.clock.now();
            appointments::save(conn, &appt)?;
            Ok(appt)
        })?;

        tracing::info!(appointment_id = %appt.id, status = %appt.status, "appointment updated");
        Ok(appt)
    }

    /// Deletes an appointment `party` is on, along with its EHR.
    pub fn delete(&self, party: RecordId, appointment_id: RecordId) -> HospitalResult<()> {
        self.db.with_conn(|conn| {
            appointments::find_owned(conn, party, appointment_id)?.ok_or_else(|| {
                tracing::debug!(%party, %appointment_id, "appointment not visible to caller");
                HospitalError::not_found("Appointment not found")
            })?;
            appointments::delete(conn, appointment_id)
        })?;

        tracing::info!(%appointment_id, "appointment deleted");
        Ok(())
    }
}
