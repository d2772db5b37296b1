use actix_web::{middleware, web, App, HttpServer};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

mod handlers;

use handlers::{bets, health, sessions};
use keiba::core::SessionRegistry;
use keiba::{AppConfig, KeibaError, RaceSource};

/// Application state shared across handlers
pub struct AppState {
    pub sessions: Mutex<SessionRegistry>,
    pub source: Box<dyn RaceSource>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            sessions: Mutex::new(SessionRegistry::with_idle_timeout(config.session_ttl())),
            source: config.race_source(),
            config,
        }
    }

    /// Lock the session registry
    pub fn sessions(&self) -> Result<MutexGuard<'_, SessionRegistry>, KeibaError> {
        self.sessions
            .lock()
            .map_err(|_| KeibaError::Internal("session registry lock poisoned".to_string()))
    }
}

/// Register every route on an actix service config
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check))
        .route("/sessions", web::post().to(sessions::create_session))
        .route("/sessions/{id}", web::delete().to(sessions::delete_session))
        .route("/sessions/{id}/reset", web::post().to(sessions::reset_session))
        .route("/sessions/{id}/race", web::post().to(sessions::change_race))
        .route("/sessions/{id}/card", web::get().to(sessions::race_card))
        .route("/sessions/{id}/scores", web::get().to(sessions::score_sheet))
        .route("/sessions/{id}/horses/{name}", web::get().to(sessions::get_horse))
        .route(
            "/sessions/{id}/horses/{name}/marker",
            web::put().to(sessions::set_marker),
        )
        .route(
            "/sessions/{id}/horses/{name}/adjustment",
            web::put().to(sessions::set_adjustment),
        )
        .route("/sessions/{id}/bets", web::post().to(bets::plan))
        .route("/sessions/{id}/purchase", web::post().to(bets::purchase));
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    // Initialize logging
    let level = config.level().unwrap_or(tracing::Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let addr = config.bind_addr();
    let app_state = Arc::new(AppState::new(config));

    if app_state.config.data_csv.is_none() {
        warn!("KEIBA_DATA_CSV not set, serving the sample race card");
    }
    info!("Race entries from {}", app_state.source.describe());
    info!("Starting Keiba API server at http://{}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(&addr)?
    .run()
    .await
}
