//! Persistence seam of the workflow engine. The MySQL store backs the
//! running service; the in-memory store backs the test suites with the same
//! conditional-update semantics.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::WorkflowError;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::leave_type::LeaveType;
use crate::model::substitute::{NewSubstituteAssignment, SubstituteAssignment};
use crate::model::timecard::{ApprovalStage, CardKind, NewTimeCard, TimeCard, TimeCardStatus};

#[derive(Debug, Clone)]
pub struct TimeCardFilter {
    pub kind: Option<CardKind>,
    pub employee_id: Option<u64>,
    pub status: Option<TimeCardStatus>,
    pub stage: Option<ApprovalStage>,
    pub leave_request_id: Option<u64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: u64,
    pub per_page: u64,
}

impl Default for TimeCardFilter {
    fn default() -> Self {
        Self {
            kind: None,
            employee_id: None,
            status: None,
            stage: None,
            leave_request_id: None,
            from: None,
            to: None,
            page: 1,
            per_page: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeaveFilter {
    pub employee_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    pub page: u64,
    pub per_page: u64,
}

impl Default for LeaveFilter {
    fn default() -> Self {
        Self {
            employee_id: None,
            status: None,
            page: 1,
            per_page: 50,
        }
    }
}

/// Which audit timestamp a stage update stamps.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StampField {
    Submitted,
    EmployeeApproved,
    AdminApproved,
    PayrollProcessed,
}

/// A conditional stage update. The store applies it only when the stored
/// status and stage still equal the expected pair and the card is unlocked;
/// the return value says whether the row was won.
#[derive(Debug, Clone)]
pub struct StageUpdate {
    pub expect_status: TimeCardStatus,
    pub expect_stage: ApprovalStage,
    pub new_status: TimeCardStatus,
    pub new_stage: ApprovalStage,
    pub stamp: StampField,
    pub actor_id: u64,
    pub notes: Option<String>,
    /// Leave reconciliation clears `preliminary_entry` and sets `approved`.
    pub reconcile_preliminary: bool,
}

#[derive(Debug, Clone)]
pub struct LockUpdate {
    pub locked_by: u64,
    pub reason: String,
}

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    // ---- time cards ----

    async fn insert_time_card(&self, card: NewTimeCard) -> Result<TimeCard, WorkflowError>;

    /// Inserts the whole batch atomically: either every card is persisted or
    /// none is.
    async fn insert_time_cards(
        &self,
        cards: Vec<NewTimeCard>,
    ) -> Result<Vec<TimeCard>, WorkflowError>;

    /// Unscoped fetch; the service layer owns the district comparison so a
    /// cross-district id can be told apart (and logged) from a missing one.
    async fn time_card(&self, id: u64) -> Result<Option<TimeCard>, WorkflowError>;

    /// Returns the matching page plus the total count.
    async fn list_time_cards(
        &self,
        district_id: u64,
        filter: &TimeCardFilter,
    ) -> Result<(Vec<TimeCard>, i64), WorkflowError>;

    async fn cards_for_leave_request(
        &self,
        district_id: u64,
        leave_request_id: u64,
    ) -> Result<Vec<TimeCard>, WorkflowError>;

    /// Compare-and-swap stage transition. Returns `false` when the stored
    /// state no longer matches (a concurrent caller won the row).
    async fn apply_stage_update(
        &self,
        district_id: u64,
        id: u64,
        update: &StageUpdate,
    ) -> Result<bool, WorkflowError>;

    /// Conditional rejection: applies only while the status is non-terminal
    /// and the card is unlocked. Leaves the stage as-is.
    async fn apply_rejection(
        &self,
        district_id: u64,
        id: u64,
        rejected_by: u64,
        notes: Option<&str>,
    ) -> Result<bool, WorkflowError>;

    /// `Some` locks (idempotent re-assert), `None` unlocks. Returns `false`
    /// when the card does not exist in the district.
    async fn set_lock(
        &self,
        district_id: u64,
        id: u64,
        lock: Option<LockUpdate>,
    ) -> Result<bool, WorkflowError>;

    /// Removes only cards still flagged preliminary and in draft status;
    /// returns how many were deleted.
    async fn delete_preliminary_cards(
        &self,
        district_id: u64,
        leave_request_id: u64,
    ) -> Result<u64, WorkflowError>;

    // ---- leave requests ----

    async fn insert_leave_request(
        &self,
        req: NewLeaveRequest,
    ) -> Result<LeaveRequest, WorkflowError>;

    async fn leave_request(&self, id: u64) -> Result<Option<LeaveRequest>, WorkflowError>;

    async fn list_leave_requests(
        &self,
        district_id: u64,
        filter: &LeaveFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), WorkflowError>;

    /// Compare-and-swap close: pending -> approved | rejected, exactly once.
    async fn close_leave_request(
        &self,
        district_id: u64,
        id: u64,
        status: LeaveStatus,
        closed_by: u64,
    ) -> Result<bool, WorkflowError>;

    // ---- reference data ----

    async fn leave_type(
        &self,
        district_id: u64,
        id: u64,
    ) -> Result<Option<LeaveType>, WorkflowError>;

    async fn list_leave_types(&self, district_id: u64) -> Result<Vec<LeaveType>, WorkflowError>;

    // ---- substitute assignments ----

    async fn insert_substitute_assignment(
        &self,
        assignment: NewSubstituteAssignment,
    ) -> Result<SubstituteAssignment, WorkflowError>;
}
