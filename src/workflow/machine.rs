//! Approval state machine and lock overlay. Every transition is a
//! read-validate-CAS sequence: the lock flag is checked first, then the
//! stage/status preconditions, and the persisted update is conditioned on
//! the expected prior state so racing callers get exactly one winner.

use chrono::{NaiveDate, NaiveTime};

use crate::auth::context::ActorContext;
use crate::error::WorkflowError;
use crate::model::timecard::{ApprovalStage, CardKind, NewTimeCard, TimeCard, TimeCardStatus};
use crate::store::{LockUpdate, StageUpdate, StampField, TimeCardFilter};
use crate::workflow::stage::Transition;
use crate::workflow::{STANDARD_DAY_HOURS, WorkflowService};

/// A manually entered card, regular or substitute.
#[derive(Debug, Clone)]
pub struct ManualEntry {
    pub employee_id: u64,
    pub kind: CardKind,
    pub work_date: NaiveDate,
    pub clock_in: Option<NaiveTime>,
    pub clock_out: Option<NaiveTime>,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    pub total_hours: Option<f64>,
    pub notes: Option<String>,
}

impl WorkflowService {
    pub async fn create_time_card(
        &self,
        ctx: &ActorContext,
        entry: ManualEntry,
    ) -> Result<TimeCard, WorkflowError> {
        if let (Some(clock_in), Some(clock_out)) = (entry.clock_in, entry.clock_out) {
            if clock_out <= clock_in {
                return Err(WorkflowError::validation("clock_out must be after clock_in"));
            }
        }
        match (entry.break_start, entry.break_end) {
            (Some(break_start), Some(break_end)) if break_end <= break_start => {
                return Err(WorkflowError::validation(
                    "break_end must be after break_start",
                ));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(WorkflowError::validation(
                    "break_start and break_end must be provided together",
                ));
            }
            _ => {}
        }

        let employee = self
            .directory
            .get_employee(ctx.district_id, entry.employee_id)
            .await?
            .ok_or(WorkflowError::NotFound { entity: "employee" })?;

        let total_hours = entry.total_hours.unwrap_or_else(|| {
            worked_hours(
                entry.clock_in,
                entry.clock_out,
                entry.break_start,
                entry.break_end,
            )
        });
        if !(0.0..=24.0).contains(&total_hours) {
            return Err(WorkflowError::validation(
                "total_hours must be between 0 and 24",
            ));
        }

        let card = self
            .store
            .insert_time_card(NewTimeCard {
                district_id: ctx.district_id,
                employee_id: employee.id,
                kind: entry.kind,
                work_date: entry.work_date,
                clock_in: entry.clock_in,
                clock_out: entry.clock_out,
                break_start: entry.break_start,
                break_end: entry.break_end,
                total_hours,
                overtime_hours: (total_hours - STANDARD_DAY_HOURS).max(0.0),
                status: TimeCardStatus::Draft,
                stage: ApprovalStage::Secretary,
                leave_request_id: None,
                is_paid_leave: false,
                leave_type_name: None,
                preliminary_entry: false,
                approved: false,
                submitted_by: None,
                submitted_at: None,
                notes: entry.notes,
            })
            .await?;

        self.audit_event(ctx, "create_time_card", "time_card", card.id, "created as draft")
            .await;
        Ok(card)
    }

    pub async fn get_time_card(
        &self,
        ctx: &ActorContext,
        id: u64,
    ) -> Result<TimeCard, WorkflowError> {
        self.fetch_card(ctx, id).await
    }

    pub async fn list_time_cards(
        &self,
        ctx: &ActorContext,
        filter: &TimeCardFilter,
    ) -> Result<(Vec<TimeCard>, i64), WorkflowError> {
        self.store.list_time_cards(ctx.district_id, filter).await
    }

    pub async fn submit_for_approval(
        &self,
        ctx: &ActorContext,
        id: u64,
        notes: Option<String>,
    ) -> Result<TimeCard, WorkflowError> {
        self.transition(ctx, id, Transition::Submit, notes).await
    }

    pub async fn approve_by_employee(
        &self,
        ctx: &ActorContext,
        id: u64,
        notes: Option<String>,
    ) -> Result<TimeCard, WorkflowError> {
        self.transition(ctx, id, Transition::ApproveByEmployee, notes)
            .await
    }

    pub async fn approve_by_admin(
        &self,
        ctx: &ActorContext,
        id: u64,
        notes: Option<String>,
    ) -> Result<TimeCard, WorkflowError> {
        self.transition(ctx, id, Transition::ApproveByAdmin, notes)
            .await
    }

    /// Terminal: from here the hours are final payroll input.
    pub async fn process_by_payroll(
        &self,
        ctx: &ActorContext,
        id: u64,
        notes: Option<String>,
    ) -> Result<TimeCard, WorkflowError> {
        self.transition(ctx, id, Transition::ProcessByPayroll, notes)
            .await
    }

    pub async fn reject(
        &self,
        ctx: &ActorContext,
        id: u64,
        notes: Option<String>,
    ) -> Result<TimeCard, WorkflowError> {
        self.transition(ctx, id, Transition::Reject, notes).await
    }

    async fn transition(
        &self,
        ctx: &ActorContext,
        id: u64,
        transition: Transition,
        notes: Option<String>,
    ) -> Result<TimeCard, WorkflowError> {
        let action: &'static str = transition.into();
        let card = self.fetch_card(ctx, id).await?;

        if card.locked {
            return Err(WorkflowError::Locked {
                reason: card
                    .lock_reason
                    .unwrap_or_else(|| "administratively locked".to_string()),
            });
        }
        if card.status.is_terminal() {
            return Err(WorkflowError::InvalidState {
                action,
                expected: "a non-terminal status".to_string(),
                actual: format!("status {}", card.status),
            });
        }
        if let (Some(expected_status), Some(expected_stage)) =
            (transition.expected_status(), transition.expected_stage())
        {
            if card.status != expected_status || card.stage != expected_stage {
                return Err(WorkflowError::InvalidState {
                    action,
                    expected: format!("status {expected_status} at stage {expected_stage}"),
                    actual: format!("status {} at stage {}", card.status, card.stage),
                });
            }
        }

        let applied = match transition {
            Transition::Reject => {
                self.store
                    .apply_rejection(ctx.district_id, id, ctx.user_id, notes.as_deref())
                    .await?
            }
            _ => {
                let update = StageUpdate {
                    expect_status: card.status,
                    expect_stage: card.stage,
                    new_status: transition.resulting_status(),
                    new_stage: transition.resulting_stage(card.stage),
                    stamp: match transition {
                        Transition::Submit => StampField::Submitted,
                        Transition::ApproveByEmployee => StampField::EmployeeApproved,
                        Transition::ApproveByAdmin => StampField::AdminApproved,
                        Transition::ProcessByPayroll | Transition::Reject => {
                            StampField::PayrollProcessed
                        }
                    },
                    actor_id: ctx.user_id,
                    notes,
                    reconcile_preliminary: false,
                };
                self.store
                    .apply_stage_update(ctx.district_id, id, &update)
                    .await?
            }
        };

        // Precondition read passed but the conditional write lost: another
        // caller transitioned the record in between.
        if !applied {
            return Err(WorkflowError::Conflict);
        }

        self.audit_event(
            ctx,
            action,
            "time_card",
            id,
            &format!("{} -> {}", card.status, transition.resulting_status()),
        )
        .await;

        self.fetch_card(ctx, id).await
    }

    /// Idempotent administrative freeze. Re-locking refreshes the actor and
    /// reason without erroring; status and stage are untouched.
    pub async fn lock_card(
        &self,
        ctx: &ActorContext,
        id: u64,
        reason: String,
    ) -> Result<TimeCard, WorkflowError> {
        self.fetch_card(ctx, id).await?;
        self.store
            .set_lock(
                ctx.district_id,
                id,
                Some(LockUpdate {
                    locked_by: ctx.user_id,
                    reason: reason.clone(),
                }),
            )
            .await?;
        self.audit_event(ctx, "lock", "time_card", id, &reason).await;
        self.fetch_card(ctx, id).await
    }

    pub async fn unlock_card(
        &self,
        ctx: &ActorContext,
        id: u64,
    ) -> Result<TimeCard, WorkflowError> {
        self.fetch_card(ctx, id).await?;
        self.store.set_lock(ctx.district_id, id, None).await?;
        self.audit_event(ctx, "unlock", "time_card", id, "lock cleared")
            .await;
        self.fetch_card(ctx, id).await
    }
}

/// Hours between clock-in and clock-out, minus the break.
pub(crate) fn worked_hours(
    clock_in: Option<NaiveTime>,
    clock_out: Option<NaiveTime>,
    break_start: Option<NaiveTime>,
    break_end: Option<NaiveTime>,
) -> f64 {
    let Some((clock_in, clock_out)) = clock_in.zip(clock_out) else {
        return 0.0;
    };
    let mut minutes = (clock_out - clock_in).num_minutes();
    if let Some((break_start, break_end)) = break_start.zip(break_end) {
        minutes -= (break_end - break_start).num_minutes();
    }
    (minutes.max(0) as f64) / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn worked_hours_subtracts_the_break() {
        let hours = worked_hours(Some(t(8, 0)), Some(t(16, 30)), Some(t(12, 0)), Some(t(12, 30)));
        assert_eq!(hours, 8.0);
    }

    #[test]
    fn worked_hours_without_clock_times_is_zero() {
        assert_eq!(worked_hours(None, None, None, None), 0.0);
        assert_eq!(worked_hours(Some(t(8, 0)), None, None, None), 0.0);
    }
}
