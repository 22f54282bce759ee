use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::context::ActorContext;
use crate::model::role::Role;
use crate::model::timecard::{ApprovalStage, CardKind, TimeCard, TimeCardStatus};
use crate::store::TimeCardFilter;
use crate::workflow::WorkflowService;
use crate::workflow::machine::ManualEntry;

#[derive(Deserialize, ToSchema)]
pub struct CreateTimeCard {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub work_date: NaiveDate,
    #[schema(example = "08:00:00", value_type = Option<String>, format = "time")]
    pub clock_in: Option<NaiveTime>,
    #[schema(example = "16:30:00", value_type = Option<String>, format = "time")]
    pub clock_out: Option<NaiveTime>,
    #[schema(value_type = Option<String>, format = "time")]
    pub break_start: Option<NaiveTime>,
    #[schema(value_type = Option<String>, format = "time")]
    pub break_end: Option<NaiveTime>,
    /// Derived from the clock times when omitted
    pub total_hours: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct TransitionRequest {
    pub notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LockRequest {
    #[schema(example = "payroll period closed")]
    pub reason: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct TimeCardQuery {
    /// Filter by card kind
    pub kind: Option<CardKind>,
    /// Filter by employee ID
    #[param(example = 1000)]
    pub employee_id: Option<u64>,
    /// Filter by status
    pub status: Option<TimeCardStatus>,
    /// Filter by approval stage
    pub stage: Option<ApprovalStage>,
    /// Filter by originating leave request
    pub leave_request_id: Option<u64>,
    #[param(example = "2024-01-01")]
    pub from: Option<NaiveDate>,
    #[param(example = "2024-01-31")]
    pub to: Option<NaiveDate>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Pagination per page number
    pub per_page: Option<u64>,
}

impl TimeCardQuery {
    pub fn into_filter(self, kind: Option<CardKind>) -> TimeCardFilter {
        TimeCardFilter {
            kind: kind.or(self.kind),
            employee_id: self.employee_id,
            status: self.status,
            stage: self.stage,
            leave_request_id: self.leave_request_id,
            from: self.from,
            to: self.to,
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or(20),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TimeCardListResponse {
    pub data: Vec<TimeCard>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

pub(crate) fn guard_card_author(
    ctx: &ActorContext,
    employee_id: u64,
) -> actix_web::Result<()> {
    let allowed = matches!(ctx.role, Role::Admin | Role::Hr | Role::Secretary)
        || ctx.employee_id == Some(employee_id);
    if allowed {
        Ok(())
    } else {
        Err(actix_web::error::ErrorForbidden(
            "Cannot create a time card for another employee",
        ))
    }
}

/// Manual time card entry
#[utoipa::path(
    post,
    path = "/api/v1/timecards",
    request_body = CreateTimeCard,
    responses(
        (status = 200, description = "Time card created as draft", body = TimeCard),
        (status = 400, description = "Invalid clock/break times"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "TimeCard"
)]
pub async fn create_time_card(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    payload: web::Json<CreateTimeCard>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();
    guard_card_author(&ctx, payload.employee_id)?;

    let card = svc
        .create_time_card(
            &ctx,
            ManualEntry {
                employee_id: payload.employee_id,
                kind: CardKind::Regular,
                work_date: payload.work_date,
                clock_in: payload.clock_in,
                clock_out: payload.clock_out,
                break_start: payload.break_start,
                break_end: payload.break_end,
                total_hours: payload.total_hours,
                notes: payload.notes,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(card))
}

/// List time cards
#[utoipa::path(
    get,
    path = "/api/v1/timecards",
    params(TimeCardQuery),
    responses(
        (status = 200, description = "Paginated time card list", body = TimeCardListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "TimeCard"
)]
pub async fn list_time_cards(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    query: web::Query<TimeCardQuery>,
) -> actix_web::Result<impl Responder> {
    let filter = query.into_inner().into_filter(None);
    let (data, total) = svc.list_time_cards(&ctx, &filter).await?;
    Ok(HttpResponse::Ok().json(TimeCardListResponse {
        data,
        page: filter.page.max(1),
        per_page: filter.per_page.clamp(1, 100),
        total,
    }))
}

/// Get a time card by ID
#[utoipa::path(
    get,
    path = "/api/v1/timecards/{id}",
    params(("id" = u64, Path, description = "Time card ID")),
    responses(
        (status = 200, description = "Time card found", body = TimeCard),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Time card not found")
    ),
    security(("bearer_auth" = [])),
    tag = "TimeCard"
)]
pub async fn get_time_card(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let card = svc.get_time_card(&ctx, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(card))
}

/// Submit a draft card into the approval pipeline
#[utoipa::path(
    put,
    path = "/api/v1/timecards/{id}/submit",
    params(("id" = u64, Path, description = "Time card ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Card submitted", body = TimeCard),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Time card not found"),
        (status = 409, description = "Card is not a draft at the secretary stage"),
        (status = 423, description = "Card is locked")
    ),
    security(("bearer_auth" = [])),
    tag = "TimeCard"
)]
pub async fn submit_for_approval(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    path: web::Path<u64>,
    payload: web::Json<TransitionRequest>,
) -> actix_web::Result<impl Responder> {
    let card = svc
        .submit_for_approval(&ctx, path.into_inner(), payload.into_inner().notes)
        .await?;
    Ok(HttpResponse::Ok().json(card))
}

/// Employee approval step
#[utoipa::path(
    put,
    path = "/api/v1/timecards/{id}/approve-employee",
    params(("id" = u64, Path, description = "Time card ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Card approved by employee", body = TimeCard),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employees may only approve their own card"),
        (status = 404, description = "Time card not found"),
        (status = 409, description = "Card is not awaiting employee approval"),
        (status = 423, description = "Card is locked")
    ),
    security(("bearer_auth" = [])),
    tag = "TimeCard"
)]
pub async fn approve_by_employee(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    path: web::Path<u64>,
    payload: web::Json<TransitionRequest>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();

    // An employee actor may only approve their own record; HR/admin may act
    // on anyone's.
    if matches!(ctx.role, Role::Employee | Role::Substitute) {
        let card = svc.get_time_card(&ctx, id).await?;
        if ctx.employee_id != Some(card.employee_id) {
            return Err(actix_web::error::ErrorForbidden(
                "Employees may only approve their own time card",
            ));
        }
    }

    let card = svc
        .approve_by_employee(&ctx, id, payload.into_inner().notes)
        .await?;
    Ok(HttpResponse::Ok().json(card))
}

/// Administrator approval step
#[utoipa::path(
    put,
    path = "/api/v1/timecards/{id}/approve-admin",
    params(("id" = u64, Path, description = "Time card ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Card approved by admin", body = TimeCard),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Time card not found"),
        (status = 409, description = "Card is not awaiting admin approval"),
        (status = 423, description = "Card is locked")
    ),
    security(("bearer_auth" = [])),
    tag = "TimeCard"
)]
pub async fn approve_by_admin(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    path: web::Path<u64>,
    payload: web::Json<TransitionRequest>,
) -> actix_web::Result<impl Responder> {
    ctx.require_hr_or_admin()?;
    let card = svc
        .approve_by_admin(&ctx, path.into_inner(), payload.into_inner().notes)
        .await?;
    Ok(HttpResponse::Ok().json(card))
}

/// Final payroll processing step
#[utoipa::path(
    put,
    path = "/api/v1/timecards/{id}/process-payroll",
    params(("id" = u64, Path, description = "Time card ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Card processed by payroll", body = TimeCard),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Time card not found"),
        (status = 409, description = "Card is not awaiting payroll"),
        (status = 423, description = "Card is locked")
    ),
    security(("bearer_auth" = [])),
    tag = "TimeCard"
)]
pub async fn process_by_payroll(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    path: web::Path<u64>,
    payload: web::Json<TransitionRequest>,
) -> actix_web::Result<impl Responder> {
    ctx.require_payroll()?;
    let card = svc
        .process_by_payroll(&ctx, path.into_inner(), payload.into_inner().notes)
        .await?;
    Ok(HttpResponse::Ok().json(card))
}

/// Reject a card at any non-terminal stage
#[utoipa::path(
    put,
    path = "/api/v1/timecards/{id}/reject",
    params(("id" = u64, Path, description = "Time card ID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Card rejected", body = TimeCard),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Time card not found"),
        (status = 409, description = "Card already terminal"),
        (status = 423, description = "Card is locked")
    ),
    security(("bearer_auth" = [])),
    tag = "TimeCard"
)]
pub async fn reject(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    path: web::Path<u64>,
    payload: web::Json<TransitionRequest>,
) -> actix_web::Result<impl Responder> {
    ctx.require_hr_or_admin()?;
    let card = svc
        .reject(&ctx, path.into_inner(), payload.into_inner().notes)
        .await?;
    Ok(HttpResponse::Ok().json(card))
}

/// Freeze a card against all transitions
#[utoipa::path(
    put,
    path = "/api/v1/timecards/{id}/lock",
    params(("id" = u64, Path, description = "Time card ID")),
    request_body = LockRequest,
    responses(
        (status = 200, description = "Card locked", body = TimeCard),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Time card not found")
    ),
    security(("bearer_auth" = [])),
    tag = "TimeCard"
)]
pub async fn lock(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    path: web::Path<u64>,
    payload: web::Json<LockRequest>,
) -> actix_web::Result<impl Responder> {
    ctx.require_admin()?;
    let card = svc
        .lock_card(&ctx, path.into_inner(), payload.into_inner().reason)
        .await?;
    Ok(HttpResponse::Ok().json(card))
}

/// Clear a card's lock
#[utoipa::path(
    put,
    path = "/api/v1/timecards/{id}/unlock",
    params(("id" = u64, Path, description = "Time card ID")),
    responses(
        (status = 200, description = "Card unlocked", body = TimeCard),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Time card not found")
    ),
    security(("bearer_auth" = [])),
    tag = "TimeCard"
)]
pub async fn unlock(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    ctx.require_admin()?;
    let card = svc.unlock_card(&ctx, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(card))
}
