use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::context::ActorContext;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::role::Role;
use crate::model::substitute::SubstituteAssignment;
use crate::model::timecard::TimeCard;
use crate::store::LeaveFilter;
use crate::workflow::WorkflowService;
use crate::workflow::leave::CreateLeaveInput;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Omit to file for the caller's own employee record
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    #[schema(example = 2)]
    pub leave_type_id: u64,
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-01-05", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "medical")]
    pub reason: Option<String>,
    #[serde(default)]
    pub substitute_required: bool,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveQuery {
    /// Filter by employee ID
    #[param(example = 1000)]
    pub employee_id: Option<u64>,
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Pagination per page number
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct CreatedLeaveResponse {
    pub request: LeaveRequest,
    /// Preliminary draft cards generated for every weekday in the range
    pub time_cards: Vec<TimeCard>,
    pub substitute_assignment: Option<SubstituteAssignment>,
    /// Informational only: set when the recommendation step did not produce
    /// an assignment
    pub recommendation_note: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ApprovedLeaveResponse {
    pub request: LeaveRequest,
    #[schema(example = 5)]
    pub affected_count: usize,
    pub time_cards: Vec<TimeCard>,
}

#[derive(Serialize, ToSchema)]
pub struct RejectedLeaveResponse {
    pub request: LeaveRequest,
    #[schema(example = 5)]
    pub removed_preliminary: u64,
}

/// Create a leave request
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body = CreateLeave,
    responses(
        (status = 200, description = "Leave request created with preliminary time cards", body = CreatedLeaveResponse),
        (status = 400, description = "Invalid date range or leave type"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();
    let created = svc
        .create_leave_request(
            &ctx,
            CreateLeaveInput {
                employee_id: payload.employee_id,
                leave_type_id: payload.leave_type_id,
                start_date: payload.start_date,
                end_date: payload.end_date,
                reason: payload.reason,
                substitute_required: payload.substitute_required,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(CreatedLeaveResponse {
        request: created.request,
        time_cards: created.time_cards,
        substitute_assignment: created.assignment,
        recommendation_note: created.recommendation_note,
    }))
}

/// Approve a pending leave request (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/v1/leave/{id}/approve",
    params(("id" = u64, Path, description = "ID of the leave request to approve")),
    responses(
        (status = 200, description = "Leave approved, preliminary cards advanced", body = ApprovedLeaveResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    ctx.require_hr_or_admin()?;

    let approved = svc.approve_leave_request(&ctx, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApprovedLeaveResponse {
        request: approved.request,
        affected_count: approved.time_cards.len(),
        time_cards: approved.time_cards,
    }))
}

/// Reject a pending leave request (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/v1/leave/{id}/reject",
    params(("id" = u64, Path, description = "ID of the leave request to reject")),
    responses(
        (status = 200, description = "Leave rejected, preliminary cards removed", body = RejectedLeaveResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    ctx.require_hr_or_admin()?;

    let rejected = svc.reject_leave_request(&ctx, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(RejectedLeaveResponse {
        request: rejected.request,
        removed_preliminary: rejected.removed_preliminary,
    }))
}

/// Get a leave request by ID
#[utoipa::path(
    get,
    path = "/api/v1/leave/{id}",
    params(("id" = u64, Path, description = "ID of the leave request to fetch")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request = svc.get_leave_request(&ctx, path.into_inner()).await?;

    // HR/admin see everything; everyone else only their own requests.
    if !matches!(ctx.role, Role::Admin | Role::Hr)
        && ctx.employee_id != Some(request.employee_id)
    {
        return Err(actix_web::error::ErrorForbidden("Forbidden"));
    }

    Ok(HttpResponse::Ok().json(request))
}

/// List leave requests (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveQuery),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    query: web::Query<LeaveQuery>,
) -> actix_web::Result<impl Responder> {
    ctx.require_hr_or_admin()?;

    let query = query.into_inner();
    let filter = LeaveFilter {
        employee_id: query.employee_id,
        status: query.status,
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(20),
    };
    let (data, total) = svc.list_leave_requests(&ctx, &filter).await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page: filter.page.max(1),
        per_page: filter.per_page.clamp(1, 100),
        total,
    }))
}
