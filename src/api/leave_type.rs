use actix_web::{HttpResponse, Responder, web};

use crate::auth::context::ActorContext;
use crate::workflow::WorkflowService;

/// List the district's leave types
#[utoipa::path(
    get,
    path = "/api/v1/leave-types",
    responses(
        (status = 200, description = "Leave types of the caller's district", body = [crate::model::leave_type::LeaveType]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leave_types(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
) -> actix_web::Result<impl Responder> {
    let leave_types = svc.list_leave_types(&ctx).await?;
    Ok(HttpResponse::Ok().json(leave_types))
}
