use crate::api::leave_request::{
    ApprovedLeaveResponse, CreateLeave, CreatedLeaveResponse, LeaveListResponse, LeaveQuery,
    RejectedLeaveResponse,
};
use crate::api::timecard::{
    CreateTimeCard, LockRequest, TimeCardListResponse, TimeCardQuery, TransitionRequest,
};
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::leave_type::LeaveType;
use crate::model::substitute::SubstituteAssignment;
use crate::model::timecard::{ApprovalStage, CardKind, TimeCard, TimeCardStatus};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "District HR Workflow API",
        version = "1.0.0",
        description = r#"
## Time & Leave Approval Workflow

This API runs the approval workflow of a multi-district HR/payroll backend.

### 🔹 Key Features
- **Time Card Approval Pipeline**
  - Fixed stage order: secretary → employee → admin → payroll
  - One named transition per stage, reject from any non-terminal stage
  - Identical contract for regular and substitute time cards
- **Leave Management**
  - Leave requests generate preliminary weekday time cards
  - Approval reconciles them into the pipeline, rejection retracts them
  - Optional auto-assignment of a recommended substitute
- **Record Locking**
  - Administrator-controlled freeze that blocks every transition

### 🔐 Security
All endpoints are protected using **JWT Bearer authentication**.
Every record belongs to exactly one district; cross-district access is
always rejected.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::timecard::create_time_card,
        crate::api::timecard::list_time_cards,
        crate::api::timecard::get_time_card,
        crate::api::timecard::submit_for_approval,
        crate::api::timecard::approve_by_employee,
        crate::api::timecard::approve_by_admin,
        crate::api::timecard::process_by_payroll,
        crate::api::timecard::reject,
        crate::api::timecard::lock,
        crate::api::timecard::unlock,

        crate::api::substitute_timecard::create_substitute_time_card,
        crate::api::substitute_timecard::list_substitute_time_cards,
        crate::api::substitute_timecard::get_substitute_time_card,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::leave_list,

        crate::api::leave_type::list_leave_types
    ),
    components(
        schemas(
            TimeCard,
            TimeCardStatus,
            ApprovalStage,
            CardKind,
            CreateTimeCard,
            TransitionRequest,
            LockRequest,
            TimeCardQuery,
            TimeCardListResponse,
            LeaveRequest,
            LeaveStatus,
            LeaveType,
            CreateLeave,
            LeaveQuery,
            LeaveListResponse,
            CreatedLeaveResponse,
            ApprovedLeaveResponse,
            RejectedLeaveResponse,
            SubstituteAssignment,
            Employee
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "TimeCard", description = "Time card approval workflow APIs"),
        (name = "SubstituteTimeCard", description = "Substitute time card APIs"),
        (name = "Leave", description = "Leave management APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
