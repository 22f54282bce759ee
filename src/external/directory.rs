//! Read-only employee directory. Employee CRUD is owned by another service;
//! the workflow consumes it through this interface.

use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::MySqlPool;

use crate::error::WorkflowError;
use crate::model::employee::Employee;

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn get_employee(
        &self,
        district_id: u64,
        id: u64,
    ) -> Result<Option<Employee>, WorkflowError>;

    async fn get_employee_by_user(
        &self,
        district_id: u64,
        user_id: u64,
    ) -> Result<Option<Employee>, WorkflowError>;

    /// The pool of active substitutes handed to the recommendation call.
    async fn list_available_substitutes(
        &self,
        district_id: u64,
    ) -> Result<Vec<Employee>, WorkflowError>;
}

pub struct SqlDirectory {
    pool: MySqlPool,
}

impl SqlDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeDirectory for SqlDirectory {
    async fn get_employee(
        &self,
        district_id: u64,
        id: u64,
    ) -> Result<Option<Employee>, WorkflowError> {
        let employee = sqlx::query_as::<_, Employee>(
            "SELECT id, district_id, user_id, first_name, last_name, email, is_substitute, status \
             FROM employees WHERE id = ? AND district_id = ?",
        )
        .bind(id)
        .bind(district_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn get_employee_by_user(
        &self,
        district_id: u64,
        user_id: u64,
    ) -> Result<Option<Employee>, WorkflowError> {
        let employee = sqlx::query_as::<_, Employee>(
            "SELECT id, district_id, user_id, first_name, last_name, email, is_substitute, status \
             FROM employees WHERE user_id = ? AND district_id = ?",
        )
        .bind(user_id)
        .bind(district_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn list_available_substitutes(
        &self,
        district_id: u64,
    ) -> Result<Vec<Employee>, WorkflowError> {
        let substitutes = sqlx::query_as::<_, Employee>(
            "SELECT id, district_id, user_id, first_name, last_name, email, is_substitute, status \
             FROM employees WHERE district_id = ? AND is_substitute = 1 AND status = 'active' \
             ORDER BY last_name, first_name",
        )
        .bind(district_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(substitutes)
    }
}

/// Fixed-roster directory for tests and for running without an employee
/// service.
#[derive(Default)]
pub struct StaticDirectory {
    employees: Mutex<Vec<Employee>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_employee(&self, employee: Employee) {
        self.employees.lock().unwrap().push(employee);
    }
}

#[async_trait]
impl EmployeeDirectory for StaticDirectory {
    async fn get_employee(
        &self,
        district_id: u64,
        id: u64,
    ) -> Result<Option<Employee>, WorkflowError> {
        Ok(self
            .employees
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id && e.district_id == district_id)
            .cloned())
    }

    async fn get_employee_by_user(
        &self,
        district_id: u64,
        user_id: u64,
    ) -> Result<Option<Employee>, WorkflowError> {
        Ok(self
            .employees
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.user_id == Some(user_id) && e.district_id == district_id)
            .cloned())
    }

    async fn list_available_substitutes(
        &self,
        district_id: u64,
    ) -> Result<Vec<Employee>, WorkflowError> {
        Ok(self
            .employees
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.district_id == district_id && e.is_substitute && e.status == "active")
            .cloned()
            .collect())
    }
}
