//! EHR progression: vitals, doctor assignment, diagnosis, completion.
//!
//! Every mutation writes the EHR and its appointment in the same transaction, so the two
//! statuses never disagree. Notifications go out only after the transaction commits.

use crate::clock::Clock;
use crate::models::{Appointment, Diagnosis, Ehr, Identity, Profile, Vitals};
use crate::notifications::{Notification, NotificationBroadcaster, Priority};
use crate::repositories::{appointments, ehr, identity};
use crate::validation::validate_vitals;
use crate::{
    AppointmentStatus, Database, EhrStatus, HospitalError, HospitalResult, RecordId,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::sync::Arc;

const NOT_ASSIGNED: &str = "EHR record not found or you're not the assigned doctor";

#[derive(Clone)]
pub struct EhrService {
    db: Database,
    broadcaster: NotificationBroadcaster,
    clock: Arc<dyn Clock>,
}

impl EhrService {
    pub fn new(db: Database, broadcaster: NotificationBroadcaster, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            broadcaster,
            clock,
        }
    }

    /// Open the EHR for an appointment and move the appointment to IN_PROGRESS.
    ///
    /// Returns the existing EHR unchanged if one is already open.
    pub fn initiate(&self, appointment_id: RecordId, nurse_id: RecordId) -> HospitalResult<Ehr> {
        let now = self.clock.now();

        let (record, created) = self.db.transaction(|tx| {
            let mut appt = find_appointment(tx, appointment_id)?;
            if let Some(existing) = ehr::find_by_appointment(tx, appointment_id)? {
                return Ok((existing, false));
            }

            transition(&mut appt, AppointmentStatus::InProgress, now)?;
            let record = Ehr {
                nurse_id: Some(nurse_id),
                ..blank_ehr(&appt, EhrStatus::InProgress, now)
            };
            ehr::insert(tx, &record)?;
            appointments::save(tx, &appt)?;
            Ok((record, true))
        })?;

        if created {
            tracing::info!(ehr_id = %record.id, %appointment_id, "EHR initiated");
        }
        Ok(record)
    }

    /// Record vital signs, creating the EHR if needed, and advance the appointment to
    /// VITALS_RECORDED. The assigned doctor, if any, is notified.
    ///
    /// # Errors
    ///
    /// - [`HospitalError::Validation`] for out-of-range vitals or if the appointment is past
    ///   the vitals stage.
    /// - [`HospitalError::NotFound`] if the appointment does not exist.
    pub fn record_vitals(
        &self,
        appointment_id: RecordId,
        vitals: Vitals,
        nurse_id: RecordId,
    ) -> HospitalResult<Ehr> {
        validate_vitals(&vitals)?;
        let now = self.clock.now();

        let record = self.db.transaction(|tx| {
            let mut appt = find_appointment(tx, appointment_id)?;
            transition(&mut appt, AppointmentStatus::VitalsRecorded, now)?;

            let existing = ehr::find_by_appointment(tx, appointment_id)?;
            let is_new = existing.is_none();
            let mut record =
                existing.unwrap_or_else(|| blank_ehr(&appt, EhrStatus::VitalsRecorded, now));

            record.nurse_id = Some(nurse_id);
            record.temperature = Some(vitals.temperature);
            record.blood_pressure = Some(vitals.blood_pressure.trim().to_string());
            record.heart_rate = Some(vitals.heart_rate);
            record.status = EhrStatus::VitalsRecorded;
            record.updated_at = now;

            if is_new {
                ehr::insert(tx, &record)?;
            } else {
                ehr::save(tx, &record)?;
            }
            appointments::save(tx, &appt)?;
            Ok(record)
        })?;

        tracing::info!(ehr_id = %record.id, %appointment_id, "vitals recorded");
        if let Some(doctor_id) = record.doctor_id {
            self.notify_vitals(doctor_id, &record);
        }
        Ok(record)
    }

    /// Put `doctor_id` on an appointment and its EHR.
    ///
    /// If vitals are already recorded the doctor is notified straight away.
    pub fn assign_doctor(&self, doctor_id: RecordId, appointment_id: RecordId) -> HospitalResult<Ehr> {
        let now = self.clock.now();

        let record = self.db.transaction(|tx| {
            identity::find_doctor(tx, doctor_id)?
                .ok_or_else(|| HospitalError::not_found("Doctor not found"))?;
            let mut appt = find_appointment(tx, appointment_id)?;
            if appt.status.is_terminal() {
                return Err(HospitalError::validation(format!(
                    "Cannot assign a doctor to a {} appointment",
                    appt.status
                )));
            }
            let mut record = ehr::find_by_appointment(tx, appointment_id)?
                .ok_or_else(|| HospitalError::not_found("EHR record not found"))?;

            appt.doctor_id = Some(doctor_id);
            appt.updated_at = now;
            record.doctor_id = Some(doctor_id);
            record.updated_at = now;

            appointments::save(tx, &appt)?;
            ehr::save(tx, &record)?;
            Ok(record)
        })?;

        tracing::info!(ehr_id = %record.id, %doctor_id, "doctor assigned");
        if record.status == EhrStatus::VitalsRecorded {
            self.notify_vitals(doctor_id, &record);
        }
        Ok(record)
    }

    /// Record (or amend) the diagnosis. Only the assigned doctor may do this.
    ///
    /// # Errors
    ///
    /// - [`HospitalError::NotFound`] if the EHR does not exist or `doctor_id` is not assigned.
    /// - [`HospitalError::Validation`] if the diagnosis is blank or vitals are not recorded yet.
    pub fn update_diagnosis(
        &self,
        ehr_id: RecordId,
        doctor_id: RecordId,
        diagnosis: Diagnosis,
    ) -> HospitalResult<Ehr> {
        if diagnosis.diagnosis.trim().is_empty() {
            return Err(HospitalError::validation("Diagnosis is required"));
        }
        let now = self.clock.now();

        let record = self.db.transaction(|tx| {
            let mut record = find_assigned(tx, ehr_id, doctor_id)?;
            let mut appt = find_appointment(tx, record.appointment_id)?;
            transition(&mut appt, AppointmentStatus::Diagnosed, now)?;

            record.diagnosis = Some(diagnosis.diagnosis.trim().to_string());
            record.prescription = diagnosis.prescription;
            record.further_tests = diagnosis.further_tests;
            record.status = EhrStatus::Diagnosed;
            record.updated_at = now;

            ehr::save(tx, &record)?;
            appointments::save(tx, &appt)?;
            Ok(record)
        })?;

        tracing::info!(%ehr_id, %doctor_id, "diagnosis updated");
        self.broadcaster.publish(
            Notification::DiagnosisUpdated {
                recipient_id: record.patient_id,
                ehr_id: record.id,
                appointment_id: record.appointment_id,
            },
            Priority::Normal,
        );
        Ok(record)
    }

    /// Close a diagnosed EHR and its appointment. Only the assigned doctor may do this.
    pub fn complete(&self, ehr_id: RecordId, doctor_id: RecordId) -> HospitalResult<Ehr> {
        let now = self.clock.now();

        let record = self.db.transaction(|tx| {
            let mut record = find_assigned(tx, ehr_id, doctor_id)?;
            let mut appt = find_appointment(tx, record.appointment_id)?;
            if record.status != EhrStatus::Diagnosed {
                return Err(HospitalError::validation(
                    "EHR must be diagnosed before it can be completed",
                ));
            }
            transition(&mut appt, AppointmentStatus::Completed, now)?;

            record.status = EhrStatus::Completed;
            record.updated_at = now;

            ehr::save(tx, &record)?;
            appointments::save(tx, &appt)?;
            Ok(record)
        })?;

        tracing::info!(%ehr_id, %doctor_id, "EHR completed");
        self.broadcaster.publish(
            Notification::EhrCompleted {
                recipient_id: record.patient_id,
                ehr_id: record.id,
                appointment_id: record.appointment_id,
            },
            Priority::Normal,
        );
        Ok(record)
    }

    pub fn get(&self, viewer: &Identity, ehr_id: RecordId) -> HospitalResult<Ehr> {
        self.db
            .with_conn(|conn| ehr::find(conn, ehr_id))?
            .filter(|record| can_view(viewer, record.patient_id))
            .ok_or_else(|| HospitalError::not_found("EHR record not found"))
    }

    pub fn get_by_appointment(&self, viewer: &Identity, appointment_id: RecordId) -> HospitalResult<Ehr> {
        self.db
            .with_conn(|conn| ehr::find_by_appointment(conn, appointment_id))?
            .filter(|record| can_view(viewer, record.patient_id))
            .ok_or_else(|| HospitalError::not_found("EHR record not found"))
    }

    /// All EHRs for a patient. Patients may only list their own.
    pub fn list_for_patient(&self, viewer: &Identity, patient_id: RecordId) -> HospitalResult<Vec<Ehr>> {
        if !can_view(viewer, patient_id) {
            tracing::debug!(viewer = %viewer.user.id, %patient_id, "patient records hidden from caller");
            return Err(HospitalError::not_found("Patient not found"));
        }
        self.db.with_conn(|conn| ehr::list_for_patient(conn, patient_id))
    }

    pub fn list_for_doctor(&self, doctor_id: RecordId) -> HospitalResult<Vec<Ehr>> {
        self.db.with_conn(|conn| ehr::list_for_doctor(conn, doctor_id))
    }

    /// EHRs assigned to the doctor with vitals recorded and awaiting diagnosis.
    pub fn pending_for_doctor(&self, doctor_id: RecordId) -> HospitalResult<Vec<Ehr>> {
        self.db
            .with_conn(|conn| ehr::list_pending_for_doctor(conn, doctor_id))
    }

    fn notify_vitals(&self, doctor_id: RecordId, record: &Ehr) {
        self.broadcaster.publish(
            Notification::PatientVitalsRecorded {
                recipient_id: doctor_id,
                patient_id: record.patient_id,
                appointment_id: record.appointment_id,
                ehr_id: record.id,
            },
            Priority::Normal,
        );
    }
}

fn find_appointment(conn: &Connection, id: RecordId) -> HospitalResult<Appointment> {
    appointments::find(conn, id)?.ok_or_else(|| HospitalError::not_found("Appointment not found"))
}

fn find_assigned(conn: &Connection, ehr_id: RecordId, doctor_id: RecordId) -> HospitalResult<Ehr> {
    ehr::find(conn, ehr_id)?
        .filter(|record| record.is_assigned_to(doctor_id))
        .ok_or_else(|| {
            tracing::debug!(%ehr_id, %doctor_id, "EHR not assigned to caller");
            HospitalError::not_found(NOT_ASSIGNED)
        })
}

fn transition(appt: &mut Appointment, next: AppointmentStatus, now: DateTime<Utc>) -> HospitalResult<()> {
    if !appt.status.can_transition_to(next) {
        return Err(HospitalError::validation(format!(
            "Cannot move appointment from {} to {}",
            appt.status, next
        )));
    }
    appt.status = next;
    appt.updated_at = now;
    Ok(())
}

fn blank_ehr(appt: &Appointment, status: EhrStatus, now: DateTime<Utc>) -> Ehr {
    Ehr {
        id: RecordId::new(),
        appointment_id: appt.id,
        patient_id: appt.patient_id,
        doctor_id: appt.doctor_id,
        nurse_id: None,
        temperature: None,
        blood_pressure: None,
        heart_rate: None,
        diagnosis: None,
        prescription: None,
        further_tests: None,
        status,
        created_at: now,
        updated_at: now,
    }
}

fn can_view(viewer: &Identity, patient_id: RecordId) -> bool {
    match &viewer.profile {
        Profile::Patient(patient) => patient.id == patient_id,
        Profile::Doctor(_) | Profile::Nurse(_) | Profile::Admin => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{Doctor, Nurse, User};
    use crate::notifications::StreamItem;
    use crate::repositories::appointments::fixtures;
    use crate::services::{AppointmentService, AppointmentUpdate};
    use crate::{DoctorStatus, EmailAddress, Role};
    use chrono::TimeZone;

    struct Harness {
        db: Database,
        broadcaster: NotificationBroadcaster,
        appointments: AppointmentService,
        service: EhrService,
        patient: RecordId,
        nurse: RecordId,
        doctor: RecordId,
    }

    fn staff_user(conn: &Connection, username: &str, role: Role) -> RecordId {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let user = User {
            id: RecordId::new(),
            username: username.into(),
            email: EmailAddress::parse(format!("{username}@example.org")).unwrap(),
            role,
            password_hash: "hash".into(),
            otp: None,
            otp_expiry: None,
            created_at: now,
            updated_at: now,
        };
        identity::insert_user(conn, &user).unwrap();
        let profile_id = RecordId::new();
        let profile = match role {
            Role::Doctor => Profile::Doctor(Doctor {
                id: profile_id,
                user_id: user.id,
                full_name: username.into(),
                status: DoctorStatus::Active,
            }),
            _ => Profile::Nurse(Nurse {
                id: profile_id,
                user_id: user.id,
                full_name: username.into(),
            }),
        };
        identity::insert_profile(conn, &profile).unwrap();
        profile_id
    }

    fn harness() -> Harness {
        let db = Database::open_in_memory().unwrap();
        let broadcaster = NotificationBroadcaster::new();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
        ));
        let (patient, nurse, doctor) = db
            .with_conn(|conn| {
                Ok((
                    fixtures::patient(conn, "PAT-1"),
                    staff_user(conn, "NSC-1", Role::Nurse),
                    staff_user(conn, "DOC-1", Role::Doctor),
                ))
            })
            .unwrap();

        Harness {
            appointments: AppointmentService::new(db.clone(), broadcaster.clone(), clock.clone()),
            service: EhrService::new(db.clone(), broadcaster.clone(), clock),
            db,
            broadcaster,
            patient,
            nurse,
            doctor,
        }
    }

    fn vitals() -> Vitals {
        Vitals {
            temperature: 37.2,
            blood_pressure: "120/80".into(),
            heart_rate: 72,
        }
    }

    fn diagnosis() -> Diagnosis {
        Diagnosis {
            diagnosis: "Seasonal flu".into(),
            prescription: Some("Rest and fluids".into()),
            further_tests: None,
        }
    }

    fn appointment_status(h: &Harness, id: RecordId) -> AppointmentStatus {
        h.db.with_conn(|conn| find_appointment(conn, id)).unwrap().status
    }

    fn viewer(h: &Harness, patient_id: RecordId) -> Identity {
        h.db.with_conn(|conn| {
            let patient = identity::find_patient(conn, patient_id)?.expect("patient exists");
            let user = identity::find_user(conn, patient.user_id)?.expect("user exists");
            Ok(Identity {
                user,
                profile: Profile::Patient(patient),
            })
        })
        .unwrap()
    }

    #[test]
    fn test_full_workflow_drives_appointment_status() {
        let h = harness();
        let appt = h.appointments.book(h.patient, "2025-06-01", "09:00").unwrap();

        let opened = h.service.initiate(appt.id, h.nurse).expect("initiate");
        assert_eq!(opened.status, EhrStatus::InProgress);
        assert_eq!(appointment_status(&h, appt.id), AppointmentStatus::InProgress);
        assert_eq!(h.service.initiate(appt.id, h.nurse).unwrap().id, opened.id);

        let record = h.service.record_vitals(appt.id, vitals(), h.nurse).expect("vitals");
        assert_eq!(record.id, opened.id);
        assert_eq!(appointment_status(&h, appt.id), AppointmentStatus::VitalsRecorded);

        h.service.assign_doctor(h.doctor, appt.id).expect("assign");
        assert_eq!(h.service.pending_for_doctor(h.doctor).unwrap().len(), 1);

        let diagnosed = h
            .service
            .update_diagnosis(record.id, h.doctor, diagnosis())
            .expect("diagnose");
        assert_eq!(diagnosed.diagnosis.as_deref(), Some("Seasonal flu"));
        assert_eq!(appointment_status(&h, appt.id), AppointmentStatus::Diagnosed);
        assert!(h.service.pending_for_doctor(h.doctor).unwrap().is_empty());

        let completed = h.service.complete(record.id, h.doctor).expect("complete");
        assert_eq!(completed.status, EhrStatus::Completed);
        assert_eq!(appointment_status(&h, appt.id), AppointmentStatus::Completed);
        assert_eq!(h.service.list_for_doctor(h.doctor).unwrap().len(), 1);
    }

    #[test]
    fn test_record_vitals_without_initiate_creates_ehr() {
        let h = harness();
        let appt = h.appointments.book(h.patient, "2025-06-01", "09:00").unwrap();

        let record = h.service.record_vitals(appt.id, vitals(), h.nurse).unwrap();
        assert_eq!(record.status, EhrStatus::VitalsRecorded);
        assert_eq!(record.nurse_id, Some(h.nurse));
        assert_eq!(appointment_status(&h, appt.id), AppointmentStatus::VitalsRecorded);

        let again = h.service.record_vitals(appt.id, vitals(), h.nurse).expect("re-record");
        assert_eq!(again.id, record.id);
    }

    #[test]
    fn test_other_doctor_gets_not_found() {
        let h = harness();
        let appt = h.appointments.book(h.patient, "2025-06-01", "09:00").unwrap();
        let record = h.service.record_vitals(appt.id, vitals(), h.nurse).unwrap();
        h.service.assign_doctor(h.doctor, appt.id).unwrap();

        let other = h.db.with_conn(|conn| Ok(staff_user(conn, "DOC-2", Role::Doctor))).unwrap();
        let err = h
            .service
            .update_diagnosis(record.id, other, diagnosis())
            .expect_err("unassigned doctor");
        assert!(matches!(&err, HospitalError::NotFound(msg) if msg == NOT_ASSIGNED));
        assert!(matches!(
            h.service.complete(record.id, other),
            Err(HospitalError::NotFound(_))
        ));
    }

    #[test]
    fn test_complete_requires_diagnosis() {
        let h = harness();
        let appt = h.appointments.book(h.patient, "2025-06-01", "09:00").unwrap();
        let record = h.service.record_vitals(appt.id, vitals(), h.nurse).unwrap();
        h.service.assign_doctor(h.doctor, appt.id).unwrap();

        assert!(matches!(
            h.service.complete(record.id, h.doctor),
            Err(HospitalError::Validation(_))
        ));
        assert_eq!(appointment_status(&h, appt.id), AppointmentStatus::VitalsRecorded);
    }

    #[test]
    fn test_appointment_update_cannot_skip_clinical_stages() {
        let h = harness();
        let appt = h.appointments.book(h.patient, "2025-06-01", "09:00").unwrap();
        let record = h.service.record_vitals(appt.id, vitals(), h.nurse).unwrap();
        h.service.assign_doctor(h.doctor, appt.id).unwrap();

        for status in [AppointmentStatus::Diagnosed, AppointmentStatus::Completed] {
            let err = h
                .appointments
                .update(
                    h.patient,
                    appt.id,
                    AppointmentUpdate {
                        status: Some(status),
                        ..Default::default()
                    },
                )
                .expect_err("clinical stages belong to the EHR workflow");
            assert!(matches!(err, HospitalError::Validation(_)));
        }

        let stored = h.service.get(&viewer(&h, h.patient), record.id).unwrap();
        assert_eq!(stored.status, EhrStatus::VitalsRecorded);
        assert_eq!(appointment_status(&h, appt.id), AppointmentStatus::VitalsRecorded);

        let diagnosed = h
            .service
            .update_diagnosis(record.id, h.doctor, diagnosis())
            .expect("doctor can still diagnose");
        assert_eq!(diagnosed.status, EhrStatus::Diagnosed);
        assert_eq!(appointment_status(&h, appt.id), AppointmentStatus::Diagnosed);
    }

    #[test]
    fn test_canceled_appointment_leaves_pending_list() {
        let h = harness();
        let appt = h.appointments.book(h.patient, "2025-06-01", "09:00").unwrap();
        h.service.record_vitals(appt.id, vitals(), h.nurse).unwrap();
        h.service.assign_doctor(h.doctor, appt.id).unwrap();
        assert_eq!(h.service.pending_for_doctor(h.doctor).unwrap().len(), 1);

        let canceled = h
            .appointments
            .update(
                h.patient,
                appt.id,
                AppointmentUpdate {
                    status: Some(AppointmentStatus::Canceled),
                    ..Default::default()
                },
            )
            .expect("patient can cancel after vitals");
        assert_eq!(canceled.status, AppointmentStatus::Canceled);

        assert!(h.service.pending_for_doctor(h.doctor).unwrap().is_empty());
        assert_eq!(h.service.list_for_doctor(h.doctor).unwrap().len(), 1);
    }

    #[test]
    fn test_assign_doctor_failures() {
        let h = harness();
        let appt = h.appointments.book(h.patient, "2025-06-01", "09:00").unwrap();

        assert!(matches!(
            h.service.assign_doctor(RecordId::new(), appt.id),
            Err(HospitalError::NotFound(_))
        ));
        assert!(matches!(
            h.service.assign_doctor(h.doctor, RecordId::new()),
            Err(HospitalError::NotFound(_))
        ));
        assert!(matches!(
            h.service.assign_doctor(h.doctor, appt.id),
            Err(HospitalError::NotFound(msg)) if msg == "EHR record not found"
        ));
    }

    #[test]
    fn test_invalid_vitals_leave_no_trace() {
        let h = harness();
        let appt = h.appointments.book(h.patient, "2025-06-01", "09:00").unwrap();
        let bad = Vitals {
            temperature: 60.0,
            ..vitals()
        };

        assert!(matches!(
            h.service.record_vitals(appt.id, bad, h.nurse),
            Err(HospitalError::Validation(_))
        ));
        assert_eq!(appointment_status(&h, appt.id), AppointmentStatus::Pending);
        let someone = viewer(&h, h.patient);
        assert!(h.service.get_by_appointment(&someone, appt.id).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifications_follow_the_workflow() {
        let h = harness();
        let doctor = h.broadcaster.subscribe(&h.doctor.to_string(), "doctor");
        let patient = h.broadcaster.subscribe(&h.patient.to_string(), "patient");

        let appt = h.appointments.book(h.patient, "2025-06-01", "09:00").unwrap();
        assert!(matches!(
            doctor.next().await,
            Some(StreamItem::Event(Notification::AppointmentBooked { .. }))
        ));

        let record = h.service.record_vitals(appt.id, vitals(), h.nurse).unwrap();
        h.service.assign_doctor(h.doctor, appt.id).unwrap();
        assert!(matches!(
            doctor.next().await,
            Some(StreamItem::Event(Notification::PatientVitalsRecorded { recipient_id, .. }))
                if recipient_id == h.doctor
        ));

        h.service.update_diagnosis(record.id, h.doctor, diagnosis()).unwrap();
        assert!(matches!(
            patient.next().await,
            Some(StreamItem::Event(Notification::DiagnosisUpdated { ehr_id, .. })) if ehr_id == record.id
        ));

        h.service.complete(record.id, h.doctor).unwrap();
        assert!(matches!(
            patient.next().await,
            Some(StreamItem::Event(Notification::EhrCompleted { .. }))
        ));
    }

    #[test]
    fn test_patients_only_read_their_own_records() {
        let h = harness();
        let other_patient = h.db.with_conn(|conn| Ok(fixtures::patient(conn, "PAT-2"))).unwrap();
        let appt = h.appointments.book(h.patient, "2025-06-01", "09:00").unwrap();
        let record = h.service.record_vitals(appt.id, vitals(), h.nurse).unwrap();

        let owner = viewer(&h, h.patient);
        let stranger = viewer(&h, other_patient);

        assert_eq!(h.service.get(&owner, record.id).unwrap().id, record.id);
        assert_eq!(h.service.list_for_patient(&owner, h.patient).unwrap().len(), 1);
        assert!(matches!(
            h.service.get(&stranger, record.id),
            Err(HospitalError::NotFound(_))
        ));
        assert!(matches!(
            h.service.list_for_patient(&stranger, h.patient),
            Err(HospitalError::NotFound(_))
        ));
    }
}
