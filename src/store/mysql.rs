use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::MySqlPool;

use crate::error::WorkflowError;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::leave_type::LeaveType;
use crate::model::substitute::{NewSubstituteAssignment, SubstituteAssignment};
use crate::model::timecard::{NewTimeCard, TimeCard};

use super::{LeaveFilter, LockUpdate, StageUpdate, StampField, TimeCardFilter, WorkflowStore};

const TIME_CARD_COLUMNS: &str = "id, district_id, employee_id, kind, work_date, clock_in, \
     clock_out, break_start, break_end, total_hours, overtime_hours, status, stage, \
     leave_request_id, is_paid_leave, leave_type_name, preliminary_entry, approved, locked, \
     locked_by, lock_reason, locked_at, submitted_by, submitted_at, employee_approved_at, \
     admin_approved_at, payroll_processed_at, rejected_by, rejected_at, notes, created_at";

/// Typed value for runtime-bound filter arguments.
enum FilterValue {
    U64(u64),
    Str(String),
    Date(NaiveDate),
}

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn insert_card_tx<'e, E>(executor: E, card: &NewTimeCard) -> Result<u64, WorkflowError>
    where
        E: sqlx::Executor<'e, Database = sqlx::MySql>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO time_cards
                (district_id, employee_id, kind, work_date, clock_in, clock_out,
                 break_start, break_end, total_hours, overtime_hours, status, stage,
                 leave_request_id, is_paid_leave, leave_type_name, preliminary_entry,
                 approved, submitted_by, submitted_at, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(card.district_id)
        .bind(card.employee_id)
        .bind(card.kind)
        .bind(card.work_date)
        .bind(card.clock_in)
        .bind(card.clock_out)
        .bind(card.break_start)
        .bind(card.break_end)
        .bind(card.total_hours)
        .bind(card.overtime_hours)
        .bind(card.status)
        .bind(card.stage)
        .bind(card.leave_request_id)
        .bind(card.is_paid_leave)
        .bind(card.leave_type_name.as_deref())
        .bind(card.preliminary_entry)
        .bind(card.approved)
        .bind(card.submitted_by)
        .bind(card.submitted_at)
        .bind(card.notes.as_deref())
        .execute(executor)
        .await?;
        Ok(result.last_insert_id())
    }

    async fn fetch_card(&self, id: u64) -> Result<TimeCard, WorkflowError> {
        let sql = format!("SELECT {TIME_CARD_COLUMNS} FROM time_cards WHERE id = ?");
        let card = sqlx::query_as::<_, TimeCard>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(card)
    }
}

#[async_trait]
impl WorkflowStore for MySqlStore {
    async fn insert_time_card(&self, card: NewTimeCard) -> Result<TimeCard, WorkflowError> {
        let id = Self::insert_card_tx(&self.pool, &card).await?;
        self.fetch_card(id).await
    }

    async fn insert_time_cards(
        &self,
        cards: Vec<NewTimeCard>,
    ) -> Result<Vec<TimeCard>, WorkflowError> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(cards.len());
        for card in &cards {
            ids.push(Self::insert_card_tx(&mut *tx, card).await?);
        }
        tx.commit().await?;

        let mut inserted = Vec::with_capacity(ids.len());
        for id in ids {
            inserted.push(self.fetch_card(id).await?);
        }
        Ok(inserted)
    }

    async fn time_card(&self, id: u64) -> Result<Option<TimeCard>, WorkflowError> {
        let sql = format!("SELECT {TIME_CARD_COLUMNS} FROM time_cards WHERE id = ?");
        let card = sqlx::query_as::<_, TimeCard>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(card)
    }

    async fn list_time_cards(
        &self,
        district_id: u64,
        filter: &TimeCardFilter,
    ) -> Result<(Vec<TimeCard>, i64), WorkflowError> {
        let mut where_sql = String::from(" WHERE district_id = ?");
        let mut args: Vec<FilterValue> = vec![FilterValue::U64(district_id)];

        if let Some(kind) = filter.kind {
            where_sql.push_str(" AND kind = ?");
            args.push(FilterValue::Str(kind.to_string()));
        }
        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }
        if let Some(status) = filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.to_string()));
        }
        if let Some(stage) = filter.stage {
            where_sql.push_str(" AND stage = ?");
            args.push(FilterValue::Str(stage.to_string()));
        }
        if let Some(leave_request_id) = filter.leave_request_id {
            where_sql.push_str(" AND leave_request_id = ?");
            args.push(FilterValue::U64(leave_request_id));
        }
        if let Some(from) = filter.from {
            where_sql.push_str(" AND work_date >= ?");
            args.push(FilterValue::Date(from));
        }
        if let Some(to) = filter.to {
            where_sql.push_str(" AND work_date <= ?");
            args.push(FilterValue::Date(to));
        }

        let count_sql = format!("SELECT COUNT(*) FROM time_cards{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(s.as_str()),
                FilterValue::Date(d) => count_q.bind(*d),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let per_page = filter.per_page.clamp(1, 100);
        let page = filter.page.max(1);
        let offset = (page - 1) * per_page;

        let data_sql = format!(
            "SELECT {TIME_CARD_COLUMNS} FROM time_cards{where_sql} \
             ORDER BY work_date DESC, id DESC LIMIT ? OFFSET ?"
        );
        let mut data_q = sqlx::query_as::<_, TimeCard>(&data_sql);
        for arg in &args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(*v),
                FilterValue::Str(s) => data_q.bind(s.as_str()),
                FilterValue::Date(d) => data_q.bind(*d),
            };
        }
        let cards = data_q
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((cards, total))
    }

    async fn cards_for_leave_request(
        &self,
        district_id: u64,
        leave_request_id: u64,
    ) -> Result<Vec<TimeCard>, WorkflowError> {
        let sql = format!(
            "SELECT {TIME_CARD_COLUMNS} FROM time_cards \
             WHERE district_id = ? AND leave_request_id = ? ORDER BY work_date"
        );
        let cards = sqlx::query_as::<_, TimeCard>(&sql)
            .bind(district_id)
            .bind(leave_request_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(cards)
    }

    async fn apply_stage_update(
        &self,
        district_id: u64,
        id: u64,
        update: &StageUpdate,
    ) -> Result<bool, WorkflowError> {
        let stamp_sql = match update.stamp {
            StampField::Submitted => ", submitted_by = ?, submitted_at = ?",
            StampField::EmployeeApproved => ", employee_approved_at = ?",
            StampField::AdminApproved => ", admin_approved_at = ?",
            StampField::PayrollProcessed => ", payroll_processed_at = ?",
        };
        let reconcile_sql = if update.reconcile_preliminary {
            ", preliminary_entry = 0, approved = 1"
        } else {
            ""
        };
        let sql = format!(
            "UPDATE time_cards SET status = ?, stage = ?, notes = COALESCE(?, notes)\
             {stamp_sql}{reconcile_sql} \
             WHERE id = ? AND district_id = ? AND status = ? AND stage = ? AND locked = 0"
        );

        let mut query = sqlx::query(&sql)
            .bind(update.new_status)
            .bind(update.new_stage)
            .bind(update.notes.as_deref());
        if update.stamp == StampField::Submitted {
            query = query.bind(update.actor_id);
        }
        let result = query
            .bind(Utc::now())
            .bind(id)
            .bind(district_id)
            .bind(update.expect_status)
            .bind(update.expect_stage)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_rejection(
        &self,
        district_id: u64,
        id: u64,
        rejected_by: u64,
        notes: Option<&str>,
    ) -> Result<bool, WorkflowError> {
        let result = sqlx::query(
            r#"
            UPDATE time_cards
            SET status = 'rejected', rejected_by = ?, rejected_at = ?, notes = COALESCE(?, notes)
            WHERE id = ? AND district_id = ?
              AND status NOT IN ('payroll_processed', 'rejected')
              AND locked = 0
            "#,
        )
        .bind(rejected_by)
        .bind(Utc::now())
        .bind(notes)
        .bind(id)
        .bind(district_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_lock(
        &self,
        district_id: u64,
        id: u64,
        lock: Option<LockUpdate>,
    ) -> Result<bool, WorkflowError> {
        let result = match lock {
            Some(lock) => {
                sqlx::query(
                    r#"
                    UPDATE time_cards
                    SET locked = 1, locked_by = ?, lock_reason = ?, locked_at = ?
                    WHERE id = ? AND district_id = ?
                    "#,
                )
                .bind(lock.locked_by)
                .bind(&lock.reason)
                .bind(Utc::now())
                .bind(id)
                .bind(district_id)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE time_cards
                    SET locked = 0, locked_by = NULL, lock_reason = NULL, locked_at = NULL
                    WHERE id = ? AND district_id = ?
                    "#,
                )
                .bind(id)
                .bind(district_id)
                .execute(&self.pool)
                .await?
            }
        };
        Ok(result.rows_affected() > 0)
    }

    async fn delete_preliminary_cards(
        &self,
        district_id: u64,
        leave_request_id: u64,
    ) -> Result<u64, WorkflowError> {
        let result = sqlx::query(
            r#"
            DELETE FROM time_cards
            WHERE district_id = ? AND leave_request_id = ?
              AND preliminary_entry = 1 AND status = 'draft'
            "#,
        )
        .bind(district_id)
        .bind(leave_request_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn insert_leave_request(
        &self,
        req: NewLeaveRequest,
    ) -> Result<LeaveRequest, WorkflowError> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (district_id, employee_id, leave_type_id, start_date, end_date,
                 reason, substitute_required, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, 'pending')
            "#,
        )
        .bind(req.district_id)
        .bind(req.employee_id)
        .bind(req.leave_type_id)
        .bind(req.start_date)
        .bind(req.end_date)
        .bind(req.reason.as_deref())
        .bind(req.substitute_required)
        .execute(&self.pool)
        .await?;

        let request = sqlx::query_as::<_, LeaveRequest>(
            "SELECT * FROM leave_requests WHERE id = ?",
        )
        .bind(result.last_insert_id())
        .fetch_one(&self.pool)
        .await?;
        Ok(request)
    }

    async fn leave_request(&self, id: u64) -> Result<Option<LeaveRequest>, WorkflowError> {
        let request = sqlx::query_as::<_, LeaveRequest>(
            "SELECT * FROM leave_requests WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    async fn list_leave_requests(
        &self,
        district_id: u64,
        filter: &LeaveFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), WorkflowError> {
        let mut where_sql = String::from(" WHERE district_id = ?");
        let mut args: Vec<FilterValue> = vec![FilterValue::U64(district_id)];

        if let Some(employee_id) = filter.employee_id {
            where_sql.push_str(" AND employee_id = ?");
            args.push(FilterValue::U64(employee_id));
        }
        if let Some(status) = filter.status {
            where_sql.push_str(" AND status = ?");
            args.push(FilterValue::Str(status.to_string()));
        }

        let count_sql = format!("SELECT COUNT(*) FROM leave_requests{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(s.as_str()),
                FilterValue::Date(d) => count_q.bind(*d),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        let per_page = filter.per_page.clamp(1, 100);
        let page = filter.page.max(1);
        let offset = (page - 1) * per_page;

        let data_sql = format!(
            "SELECT * FROM leave_requests{where_sql} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
        for arg in &args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(*v),
                FilterValue::Str(s) => data_q.bind(s.as_str()),
                FilterValue::Date(d) => data_q.bind(*d),
            };
        }
        let requests = data_q
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((requests, total))
    }

    async fn close_leave_request(
        &self,
        district_id: u64,
        id: u64,
        status: LeaveStatus,
        closed_by: u64,
    ) -> Result<bool, WorkflowError> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, approved_by = ?, approved_at = ?
            WHERE id = ? AND district_id = ? AND status = 'pending'
            "#,
        )
        .bind(status)
        .bind(closed_by)
        .bind(Utc::now())
        .bind(id)
        .bind(district_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn leave_type(
        &self,
        district_id: u64,
        id: u64,
    ) -> Result<Option<LeaveType>, WorkflowError> {
        let leave_type = sqlx::query_as::<_, LeaveType>(
            "SELECT id, district_id, name, is_paid FROM leave_types WHERE id = ? AND district_id = ?",
        )
        .bind(id)
        .bind(district_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(leave_type)
    }

    async fn list_leave_types(&self, district_id: u64) -> Result<Vec<LeaveType>, WorkflowError> {
        let leave_types = sqlx::query_as::<_, LeaveType>(
            "SELECT id, district_id, name, is_paid FROM leave_types WHERE district_id = ? ORDER BY name",
        )
        .bind(district_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(leave_types)
    }

    async fn insert_substitute_assignment(
        &self,
        assignment: NewSubstituteAssignment,
    ) -> Result<SubstituteAssignment, WorkflowError> {
        let result = sqlx::query(
            r#"
            INSERT INTO substitute_assignments
                (district_id, leave_request_id, substitute_employee_id, assigned_date,
                 status, match_score, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(assignment.district_id)
        .bind(assignment.leave_request_id)
        .bind(assignment.substitute_employee_id)
        .bind(assignment.assigned_date)
        .bind(&assignment.status)
        .bind(assignment.match_score)
        .bind(assignment.notes.as_deref())
        .execute(&self.pool)
        .await?;

        let inserted = sqlx::query_as::<_, SubstituteAssignment>(
            "SELECT * FROM substitute_assignments WHERE id = ?",
        )
        .bind(result.last_insert_id())
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }
}
