use crate::{
    api::{leave_request, leave_type, substitute_timecard, timecard},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-scope limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let protected_limiter = build_limiter(config.rate_protected_per_min);

    cfg.service(
        web::scope(&format!("{}/v1", config.api_prefix))
            .wrap(from_fn(auth_middleware))
            // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/timecards")
                    // /timecards
                    .service(
                        web::resource("")
                            .route(web::post().to(timecard::create_time_card))
                            .route(web::get().to(timecard::list_time_cards)),
                    )
                    // /timecards/{id}
                    .service(
                        web::resource("/{id}").route(web::get().to(timecard::get_time_card)),
                    )
                    // one endpoint per named transition
                    .service(
                        web::resource("/{id}/submit")
                            .route(web::put().to(timecard::submit_for_approval)),
                    )
                    .service(
                        web::resource("/{id}/approve-employee")
                            .route(web::put().to(timecard::approve_by_employee)),
                    )
                    .service(
                        web::resource("/{id}/approve-admin")
                            .route(web::put().to(timecard::approve_by_admin)),
                    )
                    .service(
                        web::resource("/{id}/process-payroll")
                            .route(web::put().to(timecard::process_by_payroll)),
                    )
                    .service(web::resource("/{id}/reject").route(web::put().to(timecard::reject)))
                    .service(web::resource("/{id}/lock").route(web::put().to(timecard::lock)))
                    .service(web::resource("/{id}/unlock").route(web::put().to(timecard::unlock))),
            )
            .service(
                web::scope("/substitute-timecards")
                    // /substitute-timecards
                    .service(
                        web::resource("")
                            .route(
                                web::post().to(substitute_timecard::create_substitute_time_card),
                            )
                            .route(web::get().to(substitute_timecard::list_substitute_time_cards)),
                    )
                    // /substitute-timecards/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(substitute_timecard::get_substitute_time_card)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::leave_list))
                            .route(web::post().to(leave_request::create_leave)),
                    )
                    // /leave/{id}
                    .service(web::resource("/{id}").route(web::get().to(leave_request::get_leave)))
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave)),
                    ),
            )
            .service(
                web::scope("/leave-types").service(
                    web::resource("").route(web::get().to(leave_type::list_leave_types)),
                ),
            ),
    );
}
