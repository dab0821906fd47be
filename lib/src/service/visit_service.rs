// lib/src/service/visit_service.rs

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use log::{error, info, warn};
use serde::Serialize;
use uuid::Uuid;

use models::errors::{FieldError, VisitError, VisitResult};
use models::medical::{
    Actor, AuditAction, AuditLogEntry, CheckInRequest, CheckOutRequest, DepartmentSummary,
    PatientSummary, Role, ScheduleConflict, StaffMember, Visit, VisitCreateRequest,
    VisitPriority, VisitStatus, VisitType, VisitUpdateRequest,
};

use super::queries::{list_visits, upcoming_visits, PageLimits, UpcomingVisits, VisitPage, VisitQuery};
use crate::audit::AuditLogger;
use crate::clock::Clock;
use crate::config::SchedulingConfig;
use crate::directory::Directory;
use crate::locks::{DimensionLocks, LockKey};
use crate::scheduling::validator::{non_blank, parse_field};
use crate::scheduling::{
    available_slots, check_placement, check_schedule, conflict_message, find_conflicts, validate,
    Candidate, ScheduleDraft, Slot,
};
use crate::storage_engine::{Stores, VisitStore};
use crate::workflow::{self, WorkflowCapabilities};

/// Result of a committed mutation: the stored visit, any conflicts an
/// emergency override let through, and the audit entry that recorded it.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub visit: Visit,
    pub conflicts: Vec<ScheduleConflict>,
    pub audit: AuditLogEntry,
}

/// A visit with its references expanded for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitDetails {
    #[serde(flatten)]
    pub visit: Visit,
    pub patient: Option<PatientSummary>,
    pub doctor: Option<StaffMember>,
    pub department: Option<DepartmentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub date: NaiveDate,
    pub duration: u32,
    pub available_slots: Vec<Slot>,
}

struct Inner {
    visits: Arc<dyn VisitStore>,
    audit: AuditLogger,
    directory: Directory,
    locks: DimensionLocks,
    clock: Arc<dyn Clock>,
    config: SchedulingConfig,
}

/// Orchestrates validation, conflict detection, workflow and audit around the
/// visit store. Every mutating verb is one unit of work: it runs on its own
/// task while holding the locks for every dimension it reads or writes, so a
/// caller that stops waiting cannot interrupt a half-finished commit.
#[derive(Clone)]
pub struct VisitService {
    inner: Arc<Inner>,
}

impl VisitService {
    pub async fn new(
        stores: Stores,
        directory: Directory,
        config: SchedulingConfig,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(anyhow::Error::msg)
            .context("invalid scheduling configuration")?;
        let audit = AuditLogger::new(stores.audit.clone())
            .await
            .context("opening audit log")?;
        info!("Visit service ready on {} storage", stores.visits.get_type());
        Ok(VisitService {
            inner: Arc::new(Inner {
                visits: stores.visits,
                audit,
                directory,
                locks: DimensionLocks::new(),
                clock,
                config,
            }),
        })
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.inner.config
    }

    async fn run<T, F, Fut>(&self, verb: &'static str, work: F) -> VisitResult<T>
    where
        F: FnOnce(Arc<Inner>) -> Fut,
        Fut: Future<Output = VisitResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(work(self.inner.clone())).await.map_err(|e| {
            error!("Visit {} task failed: {}", verb, e);
            VisitError::Internal("internal error".to_string())
        })?
    }

    pub async fn create(&self, request: VisitCreateRequest, actor: Actor) -> VisitResult<MutationOutcome> {
        self.run("create", move |inner| async move { inner.create(request, actor).await })
            .await
    }

    pub async fn update(
        &self,
        id: Uuid,
        patch: VisitUpdateRequest,
        actor: Actor,
    ) -> VisitResult<MutationOutcome> {
        self.run("update", move |inner| async move { inner.update(id, patch, actor).await })
            .await
    }

    pub async fn check_in(
        &self,
        id: Uuid,
        data: CheckInRequest,
        actor: Actor,
    ) -> VisitResult<MutationOutcome> {
        self.run("check-in", move |inner| async move { inner.check_in(id, data, actor).await })
            .await
    }

    pub async fn check_out(
        &self,
        id: Uuid,
        data: CheckOutRequest,
        actor: Actor,
    ) -> VisitResult<MutationOutcome> {
        self.run("check-out", move |inner| async move { inner.check_out(id, data, actor).await })
            .await
    }

    pub async fn delete(&self, id: Uuid, actor: Actor) -> VisitResult<MutationOutcome> {
        self.run("delete", move |inner| async move { inner.delete(id, actor).await })
            .await
    }

    pub async fn get(&self, id: Uuid) -> VisitResult<VisitDetails> {
        let inner = &self.inner;
        let visit = inner.load_live(id).await?;
        let patient = inner.expand("patient", inner.directory.patients.find(&visit.patient_id).await);
        let doctor = match visit.assigned_doctor_id.as_deref() {
            Some(doctor_id) => inner.expand("doctor", inner.directory.users.find(doctor_id).await),
            None => None,
        };
        let department = match visit.department_id.as_deref() {
            Some(department_id) => inner.expand(
                "department",
                inner.directory.departments.find(department_id).await,
            ),
            None => None,
        };
        Ok(VisitDetails {
            visit,
            patient,
            doctor,
            department,
        })
    }

    pub async fn list(&self, query: &VisitQuery, limits: PageLimits) -> VisitResult<VisitPage> {
        let visits = self.inner.visits.all().await?;
        list_visits(visits, query, &self.inner.config.offset(), limits).map_err(VisitError::Validation)
    }

    pub async fn upcoming(&self) -> VisitResult<UpcomingVisits> {
        let visits = self.inner.visits.all().await?;
        Ok(upcoming_visits(
            visits,
            self.inner.clock.now(),
            &self.inner.config.offset(),
        ))
    }

    /// Every live visit of a patient, most recently scheduled first.
    pub async fn patient_visits(&self, patient_id: &str) -> VisitResult<Vec<Visit>> {
        self.inner.ensure_patient(patient_id).await?;
        let mut visits: Vec<Visit> = self
            .inner
            .visits
            .all()
            .await?
            .into_iter()
            .filter(|v| v.patient_id == patient_id && !v.is_deleted())
            .collect();
        visits.sort_by(|a, b| {
            b.scheduled_date_time
                .cmp(&a.scheduled_date_time)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(visits)
    }

    pub async fn availability(
        &self,
        date: NaiveDate,
        duration: Option<u32>,
        doctor_id: Option<&str>,
        location: Option<&str>,
    ) -> VisitResult<Availability> {
        let config = &self.inner.config;
        let doctor_id = non_blank(doctor_id);
        let location = non_blank(location);
        let mut errors = Vec::new();
        if doctor_id.is_none() && location.is_none() {
            errors.push(FieldError::new("location", "location or doctorId is required"));
        }
        let duration = duration.unwrap_or(config.default_duration_minutes);
        if duration < config.min_duration_minutes || duration > config.max_duration_minutes {
            errors.push(FieldError::new(
                "duration",
                format!(
                    "duration must be between {} and {} minutes",
                    config.min_duration_minutes, config.max_duration_minutes
                ),
            ));
        }
        if !errors.is_empty() {
            return Err(VisitError::Validation(errors));
        }

        let active = self.inner.visits.active().await?;
        let slots = available_slots(
            date,
            duration,
            doctor_id.as_deref(),
            location.as_deref(),
            &active,
            self.inner.clock.now(),
            config,
        );
        Ok(Availability {
            date,
            duration,
            available_slots: slots,
        })
    }

    pub async fn workflow(&self, id: Uuid) -> VisitResult<WorkflowCapabilities> {
        let visit = self.inner.load_live(id).await?;
        Ok(workflow::capabilities(&visit))
    }

    pub async fn audit_trail(
        &self,
        visit_id: Option<Uuid>,
        action: Option<AuditAction>,
    ) -> VisitResult<Vec<AuditLogEntry>> {
        Ok(self.inner.audit.query(visit_id, action).await?)
    }
}

fn placement_keys(patient_id: &str, doctor_id: Option<&str>, location: Option<&str>) -> Vec<LockKey> {
    let mut keys = vec![LockKey::Patient(patient_id.to_string())];
    if let Some(doctor_id) = doctor_id {
        keys.push(LockKey::Doctor(doctor_id.to_string()));
    }
    if let Some(location) = location {
        keys.push(LockKey::location(location));
    }
    keys
}

fn visit_keys(visit: &Visit) -> Vec<LockKey> {
    placement_keys(
        &visit.patient_id,
        visit.assigned_doctor_id.as_deref(),
        visit.location.as_deref(),
    )
}

fn parse_opt<T>(errors: &mut Vec<FieldError>, field: &str, raw: Option<&str>) -> Option<T>
where
    T: FromStr<Err = String>,
{
    let raw = non_blank(raw)?;
    match parse_field::<T>(field, &raw) {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(e);
            None
        }
    }
}

fn directory_failure(err: anyhow::Error) -> VisitError {
    error!("Directory lookup failed: {:#}", err);
    VisitError::Internal("directory lookup failed".to_string())
}

impl Inner {
    async fn load_live(&self, id: Uuid) -> VisitResult<Visit> {
        match self.visits.get(&id).await? {
            Some(visit) if !visit.is_deleted() => Ok(visit),
            _ => Err(VisitError::NotFound(format!("visit {} not found", id))),
        }
    }

    fn expand<T>(&self, what: &str, found: anyhow::Result<Option<T>>) -> Option<T> {
        found.unwrap_or_else(|e| {
            warn!("Could not expand {}: {:#}", what, e);
            None
        })
    }

    async fn ensure_patient(&self, patient_id: &str) -> VisitResult<()> {
        let exists = self
            .directory
            .patients
            .exists(patient_id)
            .await
            .map_err(directory_failure)?;
        if exists {
            Ok(())
        } else {
            Err(VisitError::NotFound(format!("patient {} not found", patient_id)))
        }
    }

    async fn ensure_doctor(&self, doctor_id: &str) -> VisitResult<()> {
        let exists = self
            .directory
            .users
            .exists(doctor_id, Role::Doctor)
            .await
            .map_err(directory_failure)?;
        if exists {
            Ok(())
        } else {
            Err(VisitError::NotFound(format!("doctor {} not found", doctor_id)))
        }
    }

    /// Conflicts for a scheduled visit against the current active set. Blocks
    /// unless the visit is an emergency.
    async fn detect(&self, visit: &Visit) -> VisitResult<Vec<ScheduleConflict>> {
        let Some(candidate) = Candidate::from_visit(visit) else {
            return Ok(Vec::new());
        };
        let active = self.visits.active().await?;
        let conflicts = find_conflicts(&candidate, &active);
        if candidate.is_blocked_by(&conflicts) {
            let message = conflict_message(&conflicts);
            warn!("Visit {} rejected: {}", visit.id, message);
            return Err(VisitError::Conflict { message, conflicts });
        }
        if !conflicts.is_empty() {
            warn!(
                "Emergency visit {} overrides {} conflict(s)",
                visit.id,
                conflicts.len()
            );
        }
        Ok(conflicts)
    }

    /// Records the audit entry for a committed update, or puts `before` back
    /// if the audit trail cannot take it.
    async fn commit_audit(
        &self,
        actor: &Actor,
        action: AuditAction,
        before: &Visit,
        after: &Visit,
        now: DateTime<Utc>,
    ) -> VisitResult<AuditLogEntry> {
        match self
            .audit
            .record(actor, action, after.id, Some(before), Some(after), now)
            .await
        {
            Ok(entry) => Ok(entry),
            Err(err) => {
                error!("Audit append failed for visit {}; restoring previous state", after.id);
                if let Err(restore) = self.visits.update(before).await {
                    error!("Failed to restore visit {}: {}", after.id, restore);
                }
                Err(err.into())
            }
        }
    }

    async fn create(&self, request: VisitCreateRequest, actor: Actor) -> VisitResult<MutationOutcome> {
        let validated =
            validate(&request, self.clock.now(), &self.config).map_err(VisitError::Validation)?;

        let _locks = self
            .locks
            .acquire(placement_keys(
                &validated.patient_id,
                validated.assigned_doctor_id.as_deref(),
                validated.location.as_deref(),
            ))
            .await;

        let now = self.clock.now();
        let visit = Visit {
            id: Uuid::new_v4(),
            patient_id: validated.patient_id,
            assigned_doctor_id: validated.assigned_doctor_id,
            visit_type: validated.visit_type,
            priority: validated.priority,
            status: VisitStatus::Pending,
            scheduled_date_time: validated.scheduled_date_time,
            duration: validated.duration,
            location: validated.location,
            department_id: validated.department_id,
            check_in_date_time: None,
            check_out_date_time: None,
            reason_for_visit: validated.reason_for_visit,
            notes: validated.notes,
            vitals: None,
            outcome: None,
            follow_up_required: None,
            follow_up_date: None,
            discharge_instructions: None,
            created_at: now,
            updated_at: now,
            created_by: actor.id.clone(),
            updated_by: None,
            deleted_at: None,
        };

        let conflicts = self.detect(&visit).await?;
        self.ensure_patient(&visit.patient_id).await?;
        if let Some(doctor_id) = visit.assigned_doctor_id.as_deref() {
            self.ensure_doctor(doctor_id).await?;
        }

        self.visits.insert(&visit).await?;
        let audit = match self
            .audit
            .record(&actor, AuditAction::Create, visit.id, None, Some(&visit), now)
            .await
        {
            Ok(entry) => entry,
            Err(err) => {
                error!("Audit append failed for new visit {}; discarding it", visit.id);
                if let Err(discard) = self.visits.discard(&visit.id).await {
                    error!("Failed to discard visit {}: {}", visit.id, discard);
                }
                return Err(err.into());
            }
        };

        info!(
            "Visit {} created for patient {} by {}",
            visit.id, visit.patient_id, actor.id
        );
        Ok(MutationOutcome {
            visit,
            conflicts,
            audit,
        })
    }

    async fn update(
        &self,
        id: Uuid,
        patch: VisitUpdateRequest,
        actor: Actor,
    ) -> VisitResult<MutationOutcome> {
        let mut locks = self.locks.acquire([LockKey::Visit(id)]).await;
        let current = self.load_live(id).await?;
        if patch.is_empty() {
            return Err(VisitError::validation("body", "no updatable fields provided"));
        }
        let now = self.clock.now();

        let mut errors = Vec::new();
        let visit_type = parse_opt::<VisitType>(&mut errors, "visitType", patch.visit_type.as_deref());
        let priority = parse_opt::<VisitPriority>(&mut errors, "priority", patch.priority.as_deref());
        let status = parse_opt::<VisitStatus>(&mut errors, "status", patch.status.as_deref());
        if patch
            .reason_for_visit
            .as_deref()
            .is_some_and(|r| r.trim().is_empty())
        {
            errors.push(FieldError::new("reasonForVisit", "reasonForVisit cannot be empty"));
        }
        if !errors.is_empty() {
            return Err(VisitError::Validation(errors));
        }

        let mut next = current.clone();
        if let Some(visit_type) = visit_type {
            next.visit_type = visit_type;
        }
        if let Some(priority) = priority {
            next.priority = priority;
        }
        if let Some(reason) = non_blank(patch.reason_for_visit.as_deref()) {
            next.reason_for_visit = reason;
        }
        // A blank string clears an optional reference.
        if let Some(doctor_id) = patch.assigned_doctor_id.as_deref() {
            next.assigned_doctor_id = non_blank(Some(doctor_id));
        }
        if let Some(location) = patch.location.as_deref() {
            next.location = non_blank(Some(location));
        }
        if let Some(department_id) = patch.department_id.as_deref() {
            next.department_id = non_blank(Some(department_id));
        }
        if let Some(notes) = patch.notes.as_deref() {
            next.notes = non_blank(Some(notes));
        }
        if let Some(at) = patch.scheduled_date_time {
            next.scheduled_date_time = Some(at);
        }

        // Resending the stored slot is not a reschedule.
        let time_changed = next.scheduled_date_time != current.scheduled_date_time;
        let duration_changed = patch
            .duration
            .is_some_and(|d| Some(d) != current.duration.map(i64::from));
        let rescheduling = time_changed || duration_changed;
        let placement_changed = next.assigned_doctor_id != current.assigned_doctor_id
            || next.location != current.location
            || next.visit_type != current.visit_type;
        let leaves_emergency =
            current.visit_type.is_emergency() && !next.visit_type.is_emergency();
        let target = status.unwrap_or(current.status);

        if rescheduling {
            workflow::ensure_reschedulable(current.status)?;
            let duration = patch.duration.or(current.duration.map(i64::from));
            let errors = check_schedule(
                &ScheduleDraft {
                    visit_type: next.visit_type,
                    scheduled_date_time: next.scheduled_date_time,
                    duration,
                    location: next.location.as_deref(),
                    assigned_doctor_id: next.assigned_doctor_id.as_deref(),
                },
                now,
                &self.config,
            );
            if !errors.is_empty() {
                return Err(VisitError::Validation(errors));
            }
            next.duration = match duration {
                Some(minutes) => u32::try_from(minutes).ok(),
                None if next.scheduled_date_time.is_some() => {
                    Some(self.config.default_duration_minutes)
                }
                None => None,
            };
        } else if let Some(start) = next.scheduled_date_time {
            // A visit that loses its emergency exemption before it starts must
            // fit the regular calendar.
            let errors = if leaves_emergency
                && !target.is_terminal()
                && workflow::ensure_reschedulable(current.status).is_ok()
            {
                let minutes = next
                    .duration
                    .map_or(i64::from(self.config.default_duration_minutes), i64::from);
                check_placement(
                    &ScheduleDraft {
                        visit_type: next.visit_type,
                        scheduled_date_time: next.scheduled_date_time,
                        duration: Some(minutes),
                        location: next.location.as_deref(),
                        assigned_doctor_id: next.assigned_doctor_id.as_deref(),
                    },
                    start,
                    minutes,
                    &self.config,
                )
            } else if next.location.is_none() {
                vec![FieldError::new(
                    "location",
                    "location is required when a visit is scheduled",
                )]
            } else {
                Vec::new()
            };
            if !errors.is_empty() {
                return Err(VisitError::Validation(errors));
            }
        }

        locks
            .extend(visit_keys(&current).into_iter().chain(visit_keys(&next)))
            .await;

        // A visit leaving the calendar cannot collide with anything.
        let conflicts = if (rescheduling || placement_changed) && !target.is_terminal() {
            self.detect(&next).await?
        } else {
            Vec::new()
        };
        if next.assigned_doctor_id != current.assigned_doctor_id {
            if let Some(doctor_id) = next.assigned_doctor_id.as_deref() {
                self.ensure_doctor(doctor_id).await?;
            }
        }

        let next = match status {
            Some(to) if to != current.status => workflow::transition(&next, to, &actor.id, now)?,
            _ => {
                next.touch(&actor.id, now);
                next
            }
        };

        self.visits.update(&next).await?;
        let audit = self
            .commit_audit(&actor, AuditAction::Update, &current, &next, now)
            .await?;
        info!("Visit {} updated by {}", id, actor.id);
        Ok(MutationOutcome {
            visit: next,
            conflicts,
            audit,
        })
    }

    async fn check_in(
        &self,
        id: Uuid,
        data: CheckInRequest,
        actor: Actor,
    ) -> VisitResult<MutationOutcome> {
        let _locks = self.locks.acquire([LockKey::Visit(id)]).await;
        let current = self.load_live(id).await?;
        let now = self.clock.now();
        let next = workflow::check_in(&current, &data, &actor.id, now).inspect_err(|e| {
            warn!("Check-in of visit {} rejected: {}", id, e);
        })?;

        self.visits.update(&next).await?;
        let audit = self
            .commit_audit(&actor, AuditAction::CheckIn, &current, &next, now)
            .await?;
        info!("Visit {} checked in by {}", id, actor.id);
        Ok(MutationOutcome {
            visit: next,
            conflicts: Vec::new(),
            audit,
        })
    }

    async fn check_out(
        &self,
        id: Uuid,
        data: CheckOutRequest,
        actor: Actor,
    ) -> VisitResult<MutationOutcome> {
        let _locks = self.locks.acquire([LockKey::Visit(id)]).await;
        let current = self.load_live(id).await?;
        let now = self.clock.now();
        let next = workflow::check_out(&current, &data, &actor.id, now).inspect_err(|e| {
            warn!("Check-out of visit {} rejected: {}", id, e);
        })?;

        self.visits.update(&next).await?;
        let audit = self
            .commit_audit(&actor, AuditAction::CheckOut, &current, &next, now)
            .await?;
        info!("Visit {} checked out by {}", id, actor.id);
        Ok(MutationOutcome {
            visit: next,
            conflicts: Vec::new(),
            audit,
        })
    }

    async fn delete(&self, id: Uuid, actor: Actor) -> VisitResult<MutationOutcome> {
        let _locks = self.locks.acquire([LockKey::Visit(id)]).await;
        let current = self.load_live(id).await?;
        let now = self.clock.now();

        let mut next = current.clone();
        next.deleted_at = Some(now);
        next.touch(&actor.id, now);

        self.visits.update(&next).await?;
        let audit = self
            .commit_audit(&actor, AuditAction::Delete, &current, &next, now)
            .await?;
        info!("Visit {} deleted by {}", id, actor.id);
        Ok(MutationOutcome {
            visit: next,
            conflicts: Vec::new(),
            audit,
        })
    }
}
