use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use jobboard_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::{CatalogService, EntitlementService, JobPostService, PurchaseService},
    swagger::swagger_config,
    utils::JwtService,
    verification::VerifierSet,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    // Receipt verification mode is fixed at startup; accept-all logs its
    // own warning and is only reachable through explicit configuration.
    let verifiers =
        VerifierSet::from_config(&config).expect("Failed to build receipt verifiers");

    let pool = std::sync::Arc::new(pool);
    let catalog_service = CatalogService::new(pool.clone());
    let entitlement_service = EntitlementService::new(pool.clone());
    let job_post_service = JobPostService::new(pool.clone());
    let purchase_service = PurchaseService::new(
        catalog_service.clone(),
        entitlement_service.clone(),
        job_post_service.clone(),
        verifiers,
    );

    // Hourly sweep stamping EXPIRED on rows past their expiry. Reads
    // always evaluate expires_at themselves; this only keeps the status
    // column honest for reporting.
    {
        let sweeper = entitlement_service.clone();
        tokio::spawn(async move {
            loop {
                match sweeper.mark_expired().await {
                    Ok(0) => {}
                    Ok(n) => log::info!("Marked {n} entitlements as expired"),
                    Err(e) => log::error!("Entitlement expiry sweep failed: {e:?}"),
                }
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            }
        });
    }

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(catalog_service.clone()))
            .app_data(web::Data::new(entitlement_service.clone()))
            .app_data(web::Data::new(purchase_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::product_config)
                    .configure(handlers::purchase_config)
                    .configure(handlers::entitlement_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
