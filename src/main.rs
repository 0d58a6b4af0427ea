use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

mod api;
mod config;
mod errors;
mod ingestion;
mod jobs;
mod models;
mod radix;
mod scoring;
mod store;

use config::Config;
use scoring::ScoringEngine;
use store::{CacheStore, EventStore, RegistryStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let cfg = Config::from_env();

    let registry = RegistryStore::connect(&cfg.registry_db_url)
        .await
        .expect("failed to connect to registry store");
    registry.init().await.expect("failed to initialize registry schema");

    let events = EventStore::connect(
        &cfg.event_store_url,
        &cfg.event_store_database,
        &cfg.event_store_user,
        &cfg.event_store_password,
    );
    events.init().await.expect("failed to initialize event store schema");

    let cache = CacheStore::connect(&cfg.cache_url).expect("failed to construct cache client");

    let engine = Arc::new(ScoringEngine::new(registry.clone(), events.clone()));

    log::info!("[Main] starting background ingestion tasks");
    tokio::spawn(ingestion::bgp_stream::run(cfg.bgp_stream_url.clone(), events.clone()));
    tokio::spawn(ingestion::threat_feed::run(events.clone(), cache.clone()));
    tokio::spawn(ingestion::route_leak::run(events.clone(), cache.clone()));
    tokio::spawn(ingestion::active_scanner::run(events.clone(), cache.clone()));
    tokio::spawn(jobs::run(cache.clone(), engine.clone()));

    let app_state = web::Data::new(api::AppState {
        registry,
        events,
        cache,
        cache_ttl_secs: cfg.cache_ttl_secs,
        api_secret_key: cfg.api_secret_key.clone(),
    });

    log::info!("[Main] starting ASN Sentinel API on {}", cfg.bind_addr);
    let bind_addr = cfg.bind_addr.clone();

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(cors)
            .app_data(app_state.clone())
            .service(api::handlers::health)
            .service(api::handlers::root)
            .service(api::handlers::get_asn_score)
            .service(api::handlers::get_asn_history)
            .service(api::handlers::get_peer_pressure)
            .service(api::handlers::add_whitelist)
            .service(api::handlers::bulk_risk_check)
    })
    .bind(bind_addr)?
    .run()
    .await
}
