use actix_cors::Cors;
use actix_files::Files;
use actix_multipart::form::MultipartFormConfig;
use actix_web::{App, HttpServer, http::header, middleware::Logger, web};
use clap::Parser;
use sqlx::{Pool, Postgres};
use tracing::{error, info};
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod api;
mod cli;
mod config;
mod db;
mod shutdown;
mod upload;

use crate::api::{
    admin::AdminService,
    api_config,
    application::ApplicationService,
    auth::{models::RegisterRequest, AuthService, TokenKeys},
    error::redact_internal_errors,
    job::JobService,
    validation,
};
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::db::models::Role;
use crate::shutdown::ShutdownCoordinator;
use crate::upload::{UploadStore, PUBLIC_PREFIX};

/// Console output plus daily rotating files split by level
///
/// Log files are created as: logs/info.log.2024-12-22, logs/error.log.2024-12-22, etc.
fn init_tracing(log_dir: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let info_file = tracing_appender::rolling::daily(log_dir, "info.log");
    let warn_file = tracing_appender::rolling::daily(log_dir, "warn.log");
    let error_file = tracing_appender::rolling::daily(log_dir, "error.log");
    let debug_file = tracing_appender::rolling::daily(log_dir, "debug.log");

    let info_layer = tracing_subscriber::fmt::layer()
        .with_writer(info_file)
        .with_ansi(false)
        .with_filter(LevelFilter::INFO);

    let warn_layer = tracing_subscriber::fmt::layer()
        .with_writer(warn_file)
        .with_ansi(false)
        .with_filter(LevelFilter::WARN);

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_file)
        .with_ansi(false)
        .with_filter(LevelFilter::ERROR);

    let debug_layer = tracing_subscriber::fmt::layer()
        .with_writer(debug_file)
        .with_ansi(false)
        .with_filter(LevelFilter::DEBUG);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(info_layer)
        .with(warn_layer)
        .with(error_layer)
        .with(debug_layer)
        .init();

    Ok(())
}

fn build_cors(origins: &[String]) -> Cors {
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .supports_credentials()
        .max_age(3600)
}

async fn serve(config: Config, pool: Pool<Postgres>) -> std::io::Result<()> {
    db::migrations::run_migrations(&pool)
        .await
        .map_err(std::io::Error::other)?;

    let uploads = UploadStore::new(config.upload_dir.clone(), config.max_upload_size);
    uploads.ensure_dir()?;

    let keys = TokenKeys::new(&config.jwt_secret, config.jwt_expiry_hours);

    let pool_data = web::Data::new(pool.clone());
    let keys_data = web::Data::new(keys.clone());
    let auth_service = web::Data::new(AuthService::new(pool.clone(), keys));
    let job_service = web::Data::new(JobService::new(pool.clone(), uploads.clone()));
    let application_service = web::Data::new(ApplicationService::new(pool.clone(), uploads.clone()));
    let admin_service = web::Data::new(AdminService::new(pool.clone()));

    let max_payload_size = config.max_payload_size;
    let production = config.production;
    let frontend_urls = config.frontend_urls.clone();
    let upload_dir = uploads.dir().to_path_buf();

    let server = HttpServer::new(move || {
        // Configure payload size limits globally
        let payload_config = web::PayloadConfig::default().limit(max_payload_size);

        let multipart_config = MultipartFormConfig::default().total_limit(max_payload_size);

        App::new()
            .wrap(redact_internal_errors(production))
            .wrap(build_cors(&frontend_urls))
            .wrap(Logger::default())
            .app_data(pool_data.clone()) // Share DB pool across workers
            .app_data(keys_data.clone())
            .app_data(auth_service.clone())
            .app_data(job_service.clone())
            .app_data(application_service.clone())
            .app_data(admin_service.clone())
            .app_data(payload_config) // Global payload size limit
            .app_data(multipart_config) // Global multipart/file upload size limit
            .app_data(validation::json_config(max_payload_size))
            .app_data(validation::body_config(max_payload_size))
            .app_data(validation::query_config())
            .configure(api_config)
            .service(Files::new(PUBLIC_PREFIX, upload_dir.clone()))
    });

    info!("Server starting on http://{}:{}", config.host, config.port);

    let server = server.bind((config.host.as_str(), config.port))?.run();

    // Get server handle for graceful shutdown
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    ShutdownCoordinator::new(server_handle, server_task, pool)
        .wait_for_shutdown()
        .await
}

async fn create_admin(config: &Config, pool: Pool<Postgres>, name: &str, email: &str, password: &str) -> std::io::Result<()> {
    db::migrations::run_migrations(&pool)
        .await
        .map_err(std::io::Error::other)?;

    let service = AuthService::new(pool.clone(), TokenKeys::new(&config.jwt_secret, config.jwt_expiry_hours));
    let request = RegisterRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        role: Some(Role::Admin),
    };
    let result = service.create_account(request).await;
    pool.close().await;

    match result {
        Ok(user) => {
            info!("Created admin account id={} email={}", user.id, user.email);
            Ok(())
        }
        Err(e) => {
            error!("Failed to create admin account: {}", e);
            Err(std::io::Error::other(e))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    // Load configuration from environment
    let config = Config::from_env().map_err(std::io::Error::other)?;

    init_tracing(&config.log_dir)?;

    info!("Starting job-board application");
    info!("Configuration loaded successfully:");
    info!("  - Max payload size: {} bytes", config.max_payload_size);
    info!("  - Max upload size: {} bytes", config.max_upload_size);
    info!("  - Max database connections: {}", config.max_db_connections);
    info!("  - Upload directory: {}", config.upload_dir.display());
    info!("  - Allowed origins: {}", config.frontend_urls.join(", "));

    let pool = db::connection::get_connection(&config.database_url, config.max_db_connections)
        .await
        .map_err(std::io::Error::other)?;
    info!("Database connection pool established");

    match cli.subcommand() {
        Command::Serve => serve(config, pool).await,
        Command::Migrate => {
            let result = db::migrations::run_migrations(&pool).await;
            pool.close().await;
            result.map_err(std::io::Error::other)
        }
        Command::CreateAdmin { name, email, password } => {
            create_admin(&config, pool, name, email, password).await
        }
    }
}
