use crate::{
    api::attendance,
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("non-zero period and burst size");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let limiter = build_limiter(config.rate_attendance_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("")
                            .route(web::post().to(attendance::check_in))
                            .route(web::put().to(attendance::check_out)),
                    )
                    // /attendance/status
                    .service(web::resource("/status").route(web::get().to(attendance::status)))
                    // /attendance/today
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    // /attendance/manual-request
                    .service(
                        web::resource("/manual-request")
                            .route(web::post().to(attendance::submit_manual_request)),
                    ),
            ),
    );
}
