//! In-memory store with the same conditional-update semantics as the MySQL
//! store. Backs the test suites; all checks and writes for one call happen
//! under a single lock, so racing transitions still get exactly one winner.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::WorkflowError;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::leave_type::LeaveType;
use crate::model::substitute::{NewSubstituteAssignment, SubstituteAssignment};
use crate::model::timecard::{NewTimeCard, TimeCard, TimeCardStatus};

use super::{LeaveFilter, LockUpdate, StageUpdate, StampField, TimeCardFilter, WorkflowStore};

#[derive(Default)]
struct Inner {
    next_card_id: u64,
    cards: HashMap<u64, TimeCard>,
    next_leave_id: u64,
    leaves: HashMap<u64, LeaveRequest>,
    leave_types: Vec<LeaveType>,
    next_assignment_id: u64,
    assignments: HashMap<u64, SubstituteAssignment>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_leave_type(&self, leave_type: LeaveType) {
        self.inner.lock().unwrap().leave_types.push(leave_type);
    }
}

fn materialize(id: u64, card: &NewTimeCard) -> TimeCard {
    TimeCard {
        id,
        district_id: card.district_id,
        employee_id: card.employee_id,
        kind: card.kind,
        work_date: card.work_date,
        clock_in: card.clock_in,
        clock_out: card.clock_out,
        break_start: card.break_start,
        break_end: card.break_end,
        total_hours: card.total_hours,
        overtime_hours: card.overtime_hours,
        status: card.status,
        stage: card.stage,
        leave_request_id: card.leave_request_id,
        is_paid_leave: card.is_paid_leave,
        leave_type_name: card.leave_type_name.clone(),
        preliminary_entry: card.preliminary_entry,
        approved: card.approved,
        locked: false,
        locked_by: None,
        lock_reason: None,
        locked_at: None,
        submitted_by: card.submitted_by,
        submitted_at: card.submitted_at,
        employee_approved_at: None,
        admin_approved_at: None,
        payroll_processed_at: None,
        rejected_by: None,
        rejected_at: None,
        notes: card.notes.clone(),
        created_at: Some(Utc::now()),
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn insert_time_card(&self, card: NewTimeCard) -> Result<TimeCard, WorkflowError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_card_id += 1;
        let id = inner.next_card_id;
        let card = materialize(id, &card);
        inner.cards.insert(id, card.clone());
        Ok(card)
    }

    async fn insert_time_cards(
        &self,
        cards: Vec<NewTimeCard>,
    ) -> Result<Vec<TimeCard>, WorkflowError> {
        let mut inner = self.inner.lock().unwrap();
        let mut inserted = Vec::with_capacity(cards.len());
        for card in &cards {
            inner.next_card_id += 1;
            let id = inner.next_card_id;
            let card = materialize(id, card);
            inner.cards.insert(id, card.clone());
            inserted.push(card);
        }
        Ok(inserted)
    }

    async fn time_card(&self, id: u64) -> Result<Option<TimeCard>, WorkflowError> {
        Ok(self.inner.lock().unwrap().cards.get(&id).cloned())
    }

    async fn list_time_cards(
        &self,
        district_id: u64,
        filter: &TimeCardFilter,
    ) -> Result<(Vec<TimeCard>, i64), WorkflowError> {
        let inner = self.inner.lock().unwrap();
        let mut matching: Vec<TimeCard> = inner
            .cards
            .values()
            .filter(|c| c.district_id == district_id)
            .filter(|c| filter.kind.is_none_or(|k| c.kind == k))
            .filter(|c| filter.employee_id.is_none_or(|e| c.employee_id == e))
            .filter(|c| filter.status.is_none_or(|s| c.status == s))
            .filter(|c| filter.stage.is_none_or(|s| c.stage == s))
            .filter(|c| {
                filter
                    .leave_request_id
                    .is_none_or(|l| c.leave_request_id == Some(l))
            })
            .filter(|c| filter.from.is_none_or(|d| c.work_date >= d))
            .filter(|c| filter.to.is_none_or(|d| c.work_date <= d))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.work_date, b.id).cmp(&(a.work_date, a.id)));

        let total = matching.len() as i64;
        let per_page = filter.per_page.clamp(1, 100) as usize;
        let page = filter.page.max(1) as usize;
        let data = matching
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();
        Ok((data, total))
    }

    async fn cards_for_leave_request(
        &self,
        district_id: u64,
        leave_request_id: u64,
    ) -> Result<Vec<TimeCard>, WorkflowError> {
        let inner = self.inner.lock().unwrap();
        let mut cards: Vec<TimeCard> = inner
            .cards
            .values()
            .filter(|c| {
                c.district_id == district_id && c.leave_request_id == Some(leave_request_id)
            })
            .cloned()
            .collect();
        cards.sort_by_key(|c| c.work_date);
        Ok(cards)
    }

    async fn apply_stage_update(
        &self,
        district_id: u64,
        id: u64,
        update: &StageUpdate,
    ) -> Result<bool, WorkflowError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(card) = inner.cards.get_mut(&id) else {
            return Ok(false);
        };
        if card.district_id != district_id
            || card.status != update.expect_status
            || card.stage != update.expect_stage
            || card.locked
        {
            return Ok(false);
        }

        card.status = update.new_status;
        card.stage = update.new_stage;
        if let Some(notes) = &update.notes {
            card.notes = Some(notes.clone());
        }
        let now = Utc::now();
        match update.stamp {
            StampField::Submitted => {
                card.submitted_by = Some(update.actor_id);
                card.submitted_at = Some(now);
            }
            StampField::EmployeeApproved => card.employee_approved_at = Some(now),
            StampField::AdminApproved => card.admin_approved_at = Some(now),
            StampField::PayrollProcessed => card.payroll_processed_at = Some(now),
        }
        if update.reconcile_preliminary {
            card.preliminary_entry = false;
            card.approved = true;
        }
        Ok(true)
    }

    async fn apply_rejection(
        &self,
        district_id: u64,
        id: u64,
        rejected_by: u64,
        notes: Option<&str>,
    ) -> Result<bool, WorkflowError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(card) = inner.cards.get_mut(&id) else {
            return Ok(false);
        };
        if card.district_id != district_id || card.status.is_terminal() || card.locked {
            return Ok(false);
        }

        card.status = TimeCardStatus::Rejected;
        card.rejected_by = Some(rejected_by);
        card.rejected_at = Some(Utc::now());
        if let Some(notes) = notes {
            card.notes = Some(notes.to_string());
        }
        Ok(true)
    }

    async fn set_lock(
        &self,
        district_id: u64,
        id: u64,
        lock: Option<LockUpdate>,
    ) -> Result<bool, WorkflowError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(card) = inner.cards.get_mut(&id) else {
            return Ok(false);
        };
        if card.district_id != district_id {
            return Ok(false);
        }
        match lock {
            Some(lock) => {
                card.locked = true;
                card.locked_by = Some(lock.locked_by);
                card.lock_reason = Some(lock.reason);
                card.locked_at = Some(Utc::now());
            }
            None => {
                card.locked = false;
                card.locked_by = None;
                card.lock_reason = None;
                card.locked_at = None;
            }
        }
        Ok(true)
    }

    async fn delete_preliminary_cards(
        &self,
        district_id: u64,
        leave_request_id: u64,
    ) -> Result<u64, WorkflowError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.cards.len();
        inner.cards.retain(|_, c| {
            !(c.district_id == district_id
                && c.leave_request_id == Some(leave_request_id)
                && c.preliminary_entry
                && c.status == TimeCardStatus::Draft)
        });
        Ok((before - inner.cards.len()) as u64)
    }

    async fn insert_leave_request(
        &self,
        req: NewLeaveRequest,
    ) -> Result<LeaveRequest, WorkflowError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_leave_id += 1;
        let request = LeaveRequest {
            id: inner.next_leave_id,
            district_id: req.district_id,
            employee_id: req.employee_id,
            leave_type_id: req.leave_type_id,
            start_date: req.start_date,
            end_date: req.end_date,
            reason: req.reason,
            substitute_required: req.substitute_required,
            status: LeaveStatus::Pending,
            approved_by: None,
            approved_at: None,
            created_at: Some(Utc::now()),
        };
        inner.leaves.insert(request.id, request.clone());
        Ok(request)
    }

    async fn leave_request(&self, id: u64) -> Result<Option<LeaveRequest>, WorkflowError> {
        Ok(self.inner.lock().unwrap().leaves.get(&id).cloned())
    }

    async fn list_leave_requests(
        &self,
        district_id: u64,
        filter: &LeaveFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), WorkflowError> {
        let inner = self.inner.lock().unwrap();
        let mut matching: Vec<LeaveRequest> = inner
            .leaves
            .values()
            .filter(|l| l.district_id == district_id)
            .filter(|l| filter.employee_id.is_none_or(|e| l.employee_id == e))
            .filter(|l| filter.status.is_none_or(|s| l.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.id.cmp(&a.id));

        let total = matching.len() as i64;
        let per_page = filter.per_page.clamp(1, 100) as usize;
        let page = filter.page.max(1) as usize;
        let data = matching
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();
        Ok((data, total))
    }

    async fn close_leave_request(
        &self,
        district_id: u64,
        id: u64,
        status: LeaveStatus,
        closed_by: u64,
    ) -> Result<bool, WorkflowError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(request) = inner.leaves.get_mut(&id) else {
            return Ok(false);
        };
        if request.district_id != district_id || request.status != LeaveStatus::Pending {
            return Ok(false);
        }
        request.status = status;
        request.approved_by = Some(closed_by);
        request.approved_at = Some(Utc::now());
        Ok(true)
    }

    async fn leave_type(
        &self,
        district_id: u64,
        id: u64,
    ) -> Result<Option<LeaveType>, WorkflowError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .leave_types
            .iter()
            .find(|t| t.id == id && t.district_id == district_id)
            .cloned())
    }

    async fn list_leave_types(&self, district_id: u64) -> Result<Vec<LeaveType>, WorkflowError> {
        let inner = self.inner.lock().unwrap();
        let mut leave_types: Vec<LeaveType> = inner
            .leave_types
            .iter()
            .filter(|t| t.district_id == district_id)
            .cloned()
            .collect();
        leave_types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(leave_types)
    }

    async fn insert_substitute_assignment(
        &self,
        assignment: NewSubstituteAssignment,
    ) -> Result<SubstituteAssignment, WorkflowError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_assignment_id += 1;
        let inserted = SubstituteAssignment {
            id: inner.next_assignment_id,
            district_id: assignment.district_id,
            leave_request_id: assignment.leave_request_id,
            substitute_employee_id: assignment.substitute_employee_id,
            assigned_date: assignment.assigned_date,
            status: assignment.status,
            match_score: assignment.match_score,
            notes: assignment.notes,
            created_at: Some(Utc::now()),
        };
        inner.assignments.insert(inserted.id, inserted.clone());
        Ok(inserted)
    }
}
