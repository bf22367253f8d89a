use crate::{
    api::{attendance, employee, export, payment, payroll},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("non-zero period and burst size");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let pin_limiter = Arc::new(build_limiter(config.rate_pin_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::login)),
            )
            // staff token checked by the handler itself
            .service(
                web::resource("/pin")
                    .wrap(pin_limiter)
                    .route(web::post().to(handlers::pin_session)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // literal paths before /{id}
                    .service(web::resource("").route(web::get().to(attendance::list_records)))
                    .service(web::resource("/summary").route(web::get().to(attendance::month_summary)))
                    .service(web::resource("/clock-in").route(web::post().to(attendance::clock_in)))
                    .service(web::resource("/clock-out").route(web::post().to(attendance::clock_out)))
                    .service(web::resource("/admin-clock").route(web::post().to(attendance::admin_clock)))
                    .service(web::resource("/backdate").route(web::post().to(attendance::create_backdated)))
                    // /attendance/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(attendance::update_record))
                            .route(web::delete().to(attendance::delete_record)),
                    ),
            )
            .service(
                web::scope("/payroll")
                    .service(web::resource("").route(web::get().to(payroll::list_payroll)))
                    // /payroll/{employee_id}
                    .service(web::resource("/{employee_id}").route(web::get().to(payroll::get_payroll))),
            )
            .service(
                web::scope("/payments")
                    .service(web::resource("").route(web::put().to(payment::record_payment)))
                    .service(
                        web::resource("/{employee_id}").route(web::get().to(payment::get_paid_history)),
                    ),
            )
            .service(
                web::scope("/export")
                    .service(web::resource("/attendance").route(web::get().to(export::export_attendance)))
                    .service(
                        web::resource("/attendance/all").route(web::get().to(export::export_all_attendance)),
                    )
                    .service(web::resource("/salary").route(web::get().to(export::export_salary))),
            ),
    );
}

// STAFF DEVICE
//  ├─ POST /auth/login {role: staff}  -> staff token
//  └─ POST /auth/pin   {pin}          -> token bound to one employee
//       └─ POST /api/attendance/clock-in | clock-out {lat, lng}

// ADMIN
//  └─ POST /auth/login {role: admin}  -> admin token
//       └─ everything under /api
