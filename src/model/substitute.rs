use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Links a leave request to an auto-selected substitute. Best-effort: at most
/// one is created per request, and never at the cost of the request itself.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SubstituteAssignment {
    pub id: u64,
    pub district_id: u64,
    pub leave_request_id: u64,
    pub substitute_employee_id: u64,
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub assigned_date: NaiveDate,
    #[schema(example = "assigned")]
    pub status: String,
    pub match_score: Option<f64>,
    pub notes: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewSubstituteAssignment {
    pub district_id: u64,
    pub leave_request_id: u64,
    pub substitute_employee_id: u64,
    pub assigned_date: NaiveDate,
    pub status: String,
    pub match_score: Option<f64>,
    pub notes: Option<String>,
}

/// One ranked candidate from the recommendation capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstituteMatch {
    pub substitute_id: u64,
    pub match_score: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
}
