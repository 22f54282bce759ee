use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;

/// The typed tenant context of every call: who is acting, in which district,
/// with which role. Supplied by the request layer, never derived by the
/// workflow engine.
#[derive(Debug, Clone)]
pub struct ActorContext {
    pub user_id: u64,
    pub username: String,
    pub district_id: u64,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for ActorContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) => c,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        let role = match Role::from_id(claims.role) {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Invalid role"))),
        };

        ready(Ok(ActorContext {
            user_id: claims.user_id,
            username: claims.sub,
            district_id: claims.district_id,
            role,
            employee_id: claims.employee_id,
        }))
    }
}

impl ActorContext {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Hr) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("HR/Admin only"))
        }
    }

    pub fn require_payroll(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Payroll) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Payroll/Admin only"))
        }
    }

    /// Admin and HR act for anyone; everyone else only for their own
    /// employee record.
    pub fn can_act_for(&self, employee_id: u64) -> bool {
        matches!(self.role, Role::Admin | Role::Hr) || self.employee_id == Some(employee_id)
    }
}
