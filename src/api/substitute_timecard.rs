//! Substitute time cards share the regular card's table, state machine and
//! transition endpoints; this surface partitions creation and listing.

use actix_web::{HttpResponse, Responder, web};

use crate::auth::context::ActorContext;
use crate::error::WorkflowError;
use crate::model::timecard::CardKind;
use crate::workflow::WorkflowService;
use crate::workflow::machine::ManualEntry;

use super::timecard::{CreateTimeCard, TimeCardListResponse, TimeCardQuery, guard_card_author};

/// Manual substitute time card entry
#[utoipa::path(
    post,
    path = "/api/v1/substitute-timecards",
    request_body = CreateTimeCard,
    responses(
        (status = 200, description = "Substitute time card created as draft", body = crate::model::timecard::TimeCard),
        (status = 400, description = "Invalid clock/break times"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "SubstituteTimeCard"
)]
pub async fn create_substitute_time_card(
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
                kind: CardKind::Substitute,
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

/// List substitute time cards
#[utoipa::path(
    get,
    path = "/api/v1/substitute-timecards",
    params(TimeCardQuery),
    responses(
        (status = 200, description = "Paginated substitute time card list", body = TimeCardListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "SubstituteTimeCard"
)]
pub async fn list_substitute_time_cards(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    query: web::Query<TimeCardQuery>,
) -> actix_web::Result<impl Responder> {
    let filter = query.into_inner().into_filter(Some(CardKind::Substitute));
    let (data, total) = svc.list_time_cards(&ctx, &filter).await?;
    Ok(HttpResponse::Ok().json(TimeCardListResponse {
        data,
        page: filter.page.max(1),
        per_page: filter.per_page.clamp(1, 100),
        total,
    }))
}

/// Get a substitute time card by ID
#[utoipa::path(
    get,
    path = "/api/v1/substitute-timecards/{id}",
    params(("id" = u64, Path, description = "Substitute time card ID")),
    responses(
        (status = 200, description = "Substitute time card found", body = crate::model::timecard::TimeCard),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Substitute time card not found")
    ),
    security(("bearer_auth" = [])),
    tag = "SubstituteTimeCard"
)]
pub async fn get_substitute_time_card(
    ctx: ActorContext,
    svc: web::Data<WorkflowService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let card = svc.get_time_card(&ctx, path.into_inner()).await?;
    if card.kind != CardKind::Substitute {
        return Err(WorkflowError::NotFound {
            entity: "substitute time card",
        }
        .into());
    }
    Ok(HttpResponse::Ok().json(card))
}
