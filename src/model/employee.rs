use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Directory view of an employee. Employee CRUD lives in another service;
/// the workflow only reads this through the directory interface.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Employee {
    pub id: u64,
    pub district_id: u64,
    pub user_id: Option<u64>,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[schema(example = "john.doe@district.k12.us", format = "email")]
    pub email: String,
    pub is_substitute: bool,
    #[schema(example = "active")]
    pub status: String,
}
