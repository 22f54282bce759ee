use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Read-only reference data consumed by the leave lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveType {
    pub id: u64,
    pub district_id: u64,
    #[schema(example = "Sick Leave")]
    pub name: String,
    pub is_paid: bool,
}
