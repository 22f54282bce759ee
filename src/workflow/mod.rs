//! The approval workflow engine: the card state machine, the lock overlay
//! and the leave-request lifecycle, behind injected store/collaborator
//! interfaces.

pub mod leave;
pub mod machine;
pub mod stage;

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::auth::context::ActorContext;
use crate::error::WorkflowError;
use crate::external::audit::AuditSink;
use crate::external::directory::EmployeeDirectory;
use crate::external::recommend::SubstituteRecommender;
use crate::model::leave_request::LeaveRequest;
use crate::model::timecard::TimeCard;
use crate::store::WorkflowStore;

/// Hours credited for one standard day of leave.
pub const STANDARD_DAY_HOURS: f64 = 8.0;

pub struct WorkflowService {
    store: Arc<dyn WorkflowStore>,
    directory: Arc<dyn EmployeeDirectory>,
    recommender: Arc<dyn SubstituteRecommender>,
    audit: Arc<dyn AuditSink>,
    recommend_timeout: Duration,
}

impl WorkflowService {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        directory: Arc<dyn EmployeeDirectory>,
        recommender: Arc<dyn SubstituteRecommender>,
        audit: Arc<dyn AuditSink>,
        recommend_timeout: Duration,
    ) -> Self {
        Self {
            store,
            directory,
            recommender,
            audit,
            recommend_timeout,
        }
    }

    /// District-guarded card fetch. A card from another district is a hard
    /// failure that renders exactly like a missing one.
    pub(crate) async fn fetch_card(
        &self,
        ctx: &ActorContext,
        id: u64,
    ) -> Result<TimeCard, WorkflowError> {
        match self.store.time_card(id).await? {
            None => Err(WorkflowError::NotFound {
                entity: "time card",
            }),
            Some(card) if card.district_id != ctx.district_id => {
                warn!(
                    card_id = id,
                    card_district = card.district_id,
                    caller_district = ctx.district_id,
                    "Cross-district time card access refused"
                );
                Err(WorkflowError::TenantMismatch {
                    entity: "time card",
                })
            }
            Some(card) => Ok(card),
        }
    }

    pub(crate) async fn fetch_leave(
        &self,
        ctx: &ActorContext,
        id: u64,
    ) -> Result<LeaveRequest, WorkflowError> {
        match self.store.leave_request(id).await? {
            None => Err(WorkflowError::NotFound {
                entity: "leave request",
            }),
            Some(request) if request.district_id != ctx.district_id => {
                warn!(
                    leave_request_id = id,
                    record_district = request.district_id,
                    caller_district = ctx.district_id,
                    "Cross-district leave request access refused"
                );
                Err(WorkflowError::TenantMismatch {
                    entity: "leave request",
                })
            }
            Some(request) => Ok(request),
        }
    }

    /// Audit writes never roll back the transition they describe.
    pub(crate) async fn audit_event(
        &self,
        ctx: &ActorContext,
        action: &str,
        entity_type: &str,
        entity_id: u64,
        description: &str,
    ) {
        if let Err(e) = self
            .audit
            .record(
                ctx.district_id,
                ctx.user_id,
                action,
                entity_type,
                entity_id,
                description,
            )
            .await
        {
            warn!(error = %e, action, entity_type, entity_id, "Audit sink write failed");
        }
    }
}
