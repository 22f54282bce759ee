//! Leave request lifecycle: pending -> approved | rejected, each closed
//! exactly once. Creation expands the date range into preliminary draft
//! time cards (weekdays only, one atomic batch); approval reconciles them
//! into the pipeline; rejection retracts the ones still preliminary.

use chrono::{Datelike, NaiveDate, Utc, Weekday};
use tracing::{info, warn};

use crate::auth::context::ActorContext;
use crate::error::WorkflowError;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::leave_type::LeaveType;
use crate::model::substitute::{NewSubstituteAssignment, SubstituteAssignment};
use crate::model::timecard::{ApprovalStage, CardKind, NewTimeCard, TimeCard, TimeCardStatus};
use crate::store::{LeaveFilter, StageUpdate, StampField};
use crate::workflow::{STANDARD_DAY_HOURS, WorkflowService};

#[derive(Debug, Clone)]
pub struct CreateLeaveInput {
    /// `None` means the caller files for their own employee record.
    pub employee_id: Option<u64>,
    pub leave_type_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    pub substitute_required: bool,
}

#[derive(Debug)]
pub struct CreatedLeave {
    pub request: LeaveRequest,
    pub time_cards: Vec<TimeCard>,
    pub assignment: Option<SubstituteAssignment>,
    /// Set when the recommendation step was skipped or failed; informational
    /// only, the request itself succeeded.
    pub recommendation_note: Option<String>,
}

#[derive(Debug)]
pub struct ApprovedLeave {
    pub request: LeaveRequest,
    pub time_cards: Vec<TimeCard>,
}

#[derive(Debug)]
pub struct RejectedLeave {
    pub request: LeaveRequest,
    pub removed_preliminary: u64,
}

impl WorkflowService {
    pub async fn create_leave_request(
        &self,
        ctx: &ActorContext,
        input: CreateLeaveInput,
    ) -> Result<CreatedLeave, WorkflowError> {
        // Resolve the caller's own employee record, falling back to the
        // directory when the token carries no employee link.
        let self_employee_id = match ctx.employee_id {
            Some(id) => Some(id),
            None => self
                .directory
                .get_employee_by_user(ctx.district_id, ctx.user_id)
                .await?
                .map(|e| e.id),
        };
        let employee_id = input
            .employee_id
            .or(self_employee_id)
            .ok_or_else(|| WorkflowError::validation("no employee profile for this user"))?;
        if !ctx.can_act_for(employee_id) && self_employee_id != Some(employee_id) {
            return Err(WorkflowError::validation(
                "cannot file a leave request for another employee",
            ));
        }

        if input.end_date < input.start_date {
            return Err(WorkflowError::validation(
                "end_date cannot be before start_date",
            ));
        }
        if (input.end_date - input.start_date).num_days() > 365 {
            return Err(WorkflowError::validation("leave range exceeds one year"));
        }

        let leave_type = self
            .store
            .leave_type(ctx.district_id, input.leave_type_id)
            .await?
            .ok_or_else(|| WorkflowError::validation("unknown leave type"))?;

        let employee = self
            .directory
            .get_employee(ctx.district_id, employee_id)
            .await?
            .ok_or(WorkflowError::NotFound { entity: "employee" })?;

        let request = self
            .store
            .insert_leave_request(NewLeaveRequest {
                district_id: ctx.district_id,
                employee_id: employee.id,
                leave_type_id: leave_type.id,
                start_date: input.start_date,
                end_date: input.end_date,
                reason: input.reason,
                substitute_required: input.substitute_required,
            })
            .await?;

        // One atomic batch: either every weekday card exists or none does.
        let cards = weekdays_in_range(request.start_date, request.end_date)
            .into_iter()
            .map(|day| preliminary_card(&request, Some(&leave_type), day))
            .collect();
        let time_cards = self.store.insert_time_cards(cards).await?;

        self.audit_event(
            ctx,
            "create_leave_request",
            "leave_request",
            request.id,
            &format!(
                "{} through {}, {} preliminary time cards",
                request.start_date,
                request.end_date,
                time_cards.len()
            ),
        )
        .await;

        let (assignment, recommendation_note) = if request.substitute_required {
            self.recommend_substitute(ctx, &request).await
        } else {
            (None, None)
        };

        Ok(CreatedLeave {
            request,
            time_cards,
            assignment,
            recommendation_note,
        })
    }

    /// Best-effort: every failure path returns a note instead of an error.
    async fn recommend_substitute(
        &self,
        ctx: &ActorContext,
        request: &LeaveRequest,
    ) -> (Option<SubstituteAssignment>, Option<String>) {
        let candidates = match self
            .directory
            .list_available_substitutes(request.district_id)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, leave_request_id = request.id, "Substitute pool lookup failed");
                return (None, Some("substitute recommendation unavailable".into()));
            }
        };
        if candidates.is_empty() {
            return (None, Some("no substitutes available in this district".into()));
        }

        let ranked = match tokio::time::timeout(
            self.recommend_timeout,
            self.recommender.rank(request, &candidates),
        )
        .await
        {
            Err(_) => {
                warn!(leave_request_id = request.id, "Substitute recommendation timed out");
                return (None, Some("substitute recommendation timed out".into()));
            }
            Ok(Err(e)) => {
                warn!(error = %e, leave_request_id = request.id, "Substitute recommendation failed");
                return (None, Some("substitute recommendation failed".into()));
            }
            Ok(Ok(ranked)) => ranked,
        };

        let top = ranked.into_iter().find(|m| {
            m.match_score > 0.0 && candidates.iter().any(|c| c.id == m.substitute_id)
        });
        let Some(top) = top else {
            return (None, Some("no suitable substitute recommended".into()));
        };

        match self
            .store
            .insert_substitute_assignment(NewSubstituteAssignment {
                district_id: request.district_id,
                leave_request_id: request.id,
                substitute_employee_id: top.substitute_id,
                assigned_date: request.start_date,
                status: "assigned".to_string(),
                match_score: Some(top.match_score),
                notes: (!top.reasons.is_empty()).then(|| top.reasons.join("; ")),
            })
            .await
        {
            Ok(assignment) => {
                info!(
                    leave_request_id = request.id,
                    substitute_employee_id = assignment.substitute_employee_id,
                    "Substitute auto-assigned"
                );
                self.audit_event(
                    ctx,
                    "assign_substitute",
                    "leave_request",
                    request.id,
                    &format!("substitute employee {}", assignment.substitute_employee_id),
                )
                .await;
                (Some(assignment), None)
            }
            Err(e) => {
                warn!(error = %e, leave_request_id = request.id, "Substitute assignment insert failed");
                (None, Some("substitute assignment could not be saved".into()))
            }
        }
    }

    pub async fn approve_leave_request(
        &self,
        ctx: &ActorContext,
        id: u64,
    ) -> Result<ApprovedLeave, WorkflowError> {
        let request = self.fetch_leave(ctx, id).await?;
        if request.status != LeaveStatus::Pending {
            return Err(WorkflowError::InvalidState {
                action: "approve_leave_request",
                expected: "status pending".to_string(),
                actual: format!("status {}", request.status),
            });
        }

        let won = self
            .store
            .close_leave_request(ctx.district_id, id, LeaveStatus::Approved, ctx.user_id)
            .await?;
        if !won {
            return Err(WorkflowError::Conflict);
        }

        let time_cards = self.ensure_timecards_for_leave_request(ctx, &request).await?;

        self.audit_event(
            ctx,
            "approve_leave_request",
            "leave_request",
            id,
            &format!("{} time cards advanced", time_cards.len()),
        )
        .await;

        let request = self.fetch_leave(ctx, id).await?;
        Ok(ApprovedLeave {
            request,
            time_cards,
        })
    }

    pub async fn reject_leave_request(
        &self,
        ctx: &ActorContext,
        id: u64,
    ) -> Result<RejectedLeave, WorkflowError> {
        let request = self.fetch_leave(ctx, id).await?;
        if request.status != LeaveStatus::Pending {
            return Err(WorkflowError::InvalidState {
                action: "reject_leave_request",
                expected: "status pending".to_string(),
                actual: format!("status {}", request.status),
            });
        }

        let won = self
            .store
            .close_leave_request(ctx.district_id, id, LeaveStatus::Rejected, ctx.user_id)
            .await?;
        if !won {
            return Err(WorkflowError::Conflict);
        }

        // Only cards still preliminary and in draft are retracted; anything
        // that advanced through a separate path survives.
        let removed_preliminary = self
            .store
            .delete_preliminary_cards(ctx.district_id, id)
            .await?;

        self.audit_event(
            ctx,
            "reject_leave_request",
            "leave_request",
            id,
            &format!("{removed_preliminary} preliminary time cards removed"),
        )
        .await;

        let request = self.fetch_leave(ctx, id).await?;
        Ok(RejectedLeave {
            request,
            removed_preliminary,
        })
    }

    /// Single reconciliation path for leave approval, safe to re-run.
    /// Existing draft cards are advanced in place; the weekday set is
    /// regenerated, already post-submission, only when the request has no
    /// cards at all.
    async fn ensure_timecards_for_leave_request(
        &self,
        ctx: &ActorContext,
        request: &LeaveRequest,
    ) -> Result<Vec<TimeCard>, WorkflowError> {
        let existing = self
            .store
            .cards_for_leave_request(ctx.district_id, request.id)
            .await?;

        if existing.is_empty() {
            let leave_type = self
                .store
                .leave_type(ctx.district_id, request.leave_type_id)
                .await?;
            let now = Utc::now();
            let cards = weekdays_in_range(request.start_date, request.end_date)
                .into_iter()
                .map(|day| {
                    let mut card = preliminary_card(request, leave_type.as_ref(), day);
                    card.status = TimeCardStatus::SecretarySubmitted;
                    card.stage = ApprovalStage::Employee;
                    card.preliminary_entry = false;
                    card.approved = true;
                    card.submitted_by = Some(ctx.user_id);
                    card.submitted_at = Some(now);
                    card
                })
                .collect();
            return self.store.insert_time_cards(cards).await;
        }

        let mut advanced = Vec::new();
        for card in existing {
            if card.status != TimeCardStatus::Draft
                || card.stage != ApprovalStage::Secretary
                || card.locked
            {
                continue;
            }
            let update = StageUpdate {
                expect_status: TimeCardStatus::Draft,
                expect_stage: ApprovalStage::Secretary,
                new_status: TimeCardStatus::SecretarySubmitted,
                new_stage: ApprovalStage::Employee,
                stamp: StampField::Submitted,
                actor_id: ctx.user_id,
                notes: None,
                reconcile_preliminary: true,
            };
            if self
                .store
                .apply_stage_update(ctx.district_id, card.id, &update)
                .await?
            {
                if let Some(card) = self.store.time_card(card.id).await? {
                    advanced.push(card);
                }
            }
        }
        Ok(advanced)
    }

    pub async fn get_leave_request(
        &self,
        ctx: &ActorContext,
        id: u64,
    ) -> Result<LeaveRequest, WorkflowError> {
        self.fetch_leave(ctx, id).await
    }

    pub async fn list_leave_requests(
        &self,
        ctx: &ActorContext,
        filter: &LeaveFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), WorkflowError> {
        self.store.list_leave_requests(ctx.district_id, filter).await
    }

    pub async fn list_leave_types(
        &self,
        ctx: &ActorContext,
    ) -> Result<Vec<LeaveType>, WorkflowError> {
        self.store.list_leave_types(ctx.district_id).await
    }
}

fn preliminary_card(
    request: &LeaveRequest,
    leave_type: Option<&LeaveType>,
    day: NaiveDate,
) -> NewTimeCard {
    NewTimeCard {
        district_id: request.district_id,
        employee_id: request.employee_id,
        kind: CardKind::Regular,
        work_date: day,
        clock_in: None,
        clock_out: None,
        break_start: None,
        break_end: None,
        total_hours: STANDARD_DAY_HOURS,
        overtime_hours: 0.0,
        status: TimeCardStatus::Draft,
        stage: ApprovalStage::Secretary,
        leave_request_id: Some(request.id),
        is_paid_leave: leave_type.is_some_and(|t| t.is_paid),
        leave_type_name: leave_type.map(|t| t.name.clone()),
        preliminary_entry: true,
        approved: false,
        submitted_by: None,
        submitted_at: None,
        notes: None,
    }
}

/// Every day in the inclusive range that is not a Saturday or Sunday.
fn weekdays_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn full_week_yields_five_weekdays() {
        // Mon Jan 1 2024 through Sun Jan 7 2024
        let days = weekdays_in_range(d(2024, 1, 1), d(2024, 1, 7));
        assert_eq!(
            days,
            vec![
                d(2024, 1, 1),
                d(2024, 1, 2),
                d(2024, 1, 3),
                d(2024, 1, 4),
                d(2024, 1, 5),
            ]
        );
    }

    #[test]
    fn weekend_only_range_yields_nothing() {
        assert!(weekdays_in_range(d(2024, 1, 6), d(2024, 1, 7)).is_empty());
    }

    #[test]
    fn single_weekday_range_yields_that_day() {
        assert_eq!(weekdays_in_range(d(2024, 1, 3), d(2024, 1, 3)), vec![d(2024, 1, 3)]);
    }

    #[test]
    fn range_spanning_weekend_skips_it() {
        let days = weekdays_in_range(d(2024, 1, 5), d(2024, 1, 9));
        assert_eq!(days, vec![d(2024, 1, 5), d(2024, 1, 8), d(2024, 1, 9)]);
    }
}
