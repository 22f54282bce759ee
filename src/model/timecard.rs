use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Status vocabulary of the approval pipeline. Stored as snake_case strings.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TimeCardStatus {
    Draft,
    SecretarySubmitted,
    EmployeeApproved,
    AdminApproved,
    PayrollProcessed,
    Rejected,
}

impl TimeCardStatus {
    /// Terminal statuses refuse every further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, TimeCardStatus::PayrollProcessed | TimeCardStatus::Rejected)
    }
}

/// The role whose action is next required on a card.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ApprovalStage {
    Secretary,
    Employee,
    Admin,
    Payroll,
}

/// Regular and substitute cards share one table and one transition contract.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum CardKind {
    Regular,
    Substitute,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "district_id": 10,
    "employee_id": 1000,
    "kind": "regular",
    "work_date": "2024-01-01",
    "total_hours": 8.0,
    "overtime_hours": 0.0,
    "status": "draft",
    "stage": "secretary",
    "preliminary_entry": false,
    "approved": false,
    "locked": false
}))]
pub struct TimeCard {
    pub id: u64,
    pub district_id: u64,
    /// For substitute cards this is the substitute's employee id.
    pub employee_id: u64,
    pub kind: CardKind,
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub work_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "time")]
    pub clock_in: Option<NaiveTime>,
    #[schema(value_type = Option<String>, format = "time")]
    pub clock_out: Option<NaiveTime>,
    #[schema(value_type = Option<String>, format = "time")]
    pub break_start: Option<NaiveTime>,
    #[schema(value_type = Option<String>, format = "time")]
    pub break_end: Option<NaiveTime>,
    pub total_hours: f64,
    pub overtime_hours: f64,
    pub status: TimeCardStatus,
    pub stage: ApprovalStage,
    pub leave_request_id: Option<u64>,
    pub is_paid_leave: bool,
    pub leave_type_name: Option<String>,
    pub preliminary_entry: bool,
    pub approved: bool,

    pub locked: bool,
    pub locked_by: Option<u64>,
    pub lock_reason: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub locked_at: Option<DateTime<Utc>>,

    pub submitted_by: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub employee_approved_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub admin_approved_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub payroll_processed_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub rejected_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,

    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert shape for a card. Ids and audit timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTimeCard {
    pub district_id: u64,
    pub employee_id: u64,
    pub kind: CardKind,
    pub work_date: NaiveDate,
    pub clock_in: Option<NaiveTime>,
    pub clock_out: Option<NaiveTime>,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    pub total_hours: f64,
    pub overtime_hours: f64,
    pub status: TimeCardStatus,
    pub stage: ApprovalStage,
    pub leave_request_id: Option<u64>,
    pub is_paid_leave: bool,
    pub leave_type_name: Option<String>,
    pub preliminary_entry: bool,
    pub approved: bool,
    pub submitted_by: Option<u64>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}
