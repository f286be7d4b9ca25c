use std::sync::Arc;

use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

use crate::{
    api::{attendance, dashboard},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
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

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(web::resource("/me").route(web::get().to(handlers::me)))
            .service(
                web::resource("/change-password")
                    .route(web::put().to(handlers::change_password)),
            )
            .service(web::resource("/employees").route(web::post().to(handlers::create_employee)))
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    )
                    .service(
                        web::resource("/my-history").route(web::get().to(attendance::my_history)),
                    )
                    .service(
                        web::resource("/my-summary").route(web::get().to(attendance::my_summary)),
                    )
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    // Manager views
                    .service(
                        web::resource("/summary").route(web::get().to(attendance::team_summary)),
                    )
                    .service(
                        web::resource("/export")
                            .route(web::get().to(attendance::export_attendance)),
                    )
                    .service(
                        web::resource("/today-status")
                            .route(web::get().to(attendance::team_today)),
                    )
                    .service(web::resource("").route(web::get().to(attendance::list_attendance))),
            )
            .service(
                web::scope("/dashboard")
                    .service(
                        web::resource("/employee")
                            .route(web::get().to(dashboard::employee_stats)),
                    )
                    .service(
                        web::resource("/manager").route(web::get().to(dashboard::manager_stats)),
                    ),
            ),
    );
}
