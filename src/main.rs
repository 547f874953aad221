// src/main.rs
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;

use mcstatus::config::Config;
use mcstatus::handlers;
use mcstatus::handlers::status::StatusRateLimiter;
use mcstatus::resolver::StatusResolver;
use mcstatus::storage::memory::StatusCache;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env();
    let bind = config.bind();

    info!(
        "Probing {}:{} with a {}ms timeout per method, caching for {}s",
        config.mc_server_host,
        config.mc_server_port,
        config.probe_timeout_ms,
        config.status_cache_secs
    );

    let cache = web::Data::new(StatusCache::new(config.status_cache_ttl()));
    let resolver: web::Data<StatusResolver> =
        web::Data::new(StatusResolver::new(config.probe_timeout()));
    let status_rate_limiter: web::Data<StatusRateLimiter> =
        web::Data::new(StatusRateLimiter::keyed(config.status_quota()));
    let config = web::Data::new(config);

    info!("Starting server on {}", bind);
    HttpServer::new(move || {
        App::new()
            .app_data(config.clone())
            .app_data(cache.clone())
            .app_data(resolver.clone())
            .app_data(status_rate_limiter.clone())
            .route("/", web::get().to(handlers::index::index))
            .route("/api/server/status", web::get().to(handlers::status::get_status))
    })
        .bind(&bind)?
        .run().await
}
