/// Cleanpro Booking Backend Application
///
/// This is the main entry point for the cleaning-service booking backend.
/// The application provides REST API endpoints for user registration,
/// the service catalog, order placement and lifecycle management, and
/// post-service ratings.
///
/// # Architecture
///
/// The application follows a modular architecture with:
/// - Repository layer for data access
/// - Service layer for business logic (validation, resolvers, the atomic
///   order-creation transaction)
/// - API layer for HTTP endpoints
/// - Metrics for monitoring
use std::sync::Arc;

use anyhow::{Context, Result};
use app_config::AppConfig;
use repository::{
    PgAddressesRepository, PgCleaningTypesRepository, PgOrderedServicesRepository,
    PgOrdersRepository, PgRatingsRepository, PgServicesRepository, PgUsersRepository,
};
use server::{AppState, Server};
use service::OrderServiceImpl;
use service::catalog::CatalogServiceImpl;
use service::rating::RatingServiceImpl;
use service::users::{LogMailer, UserServiceImpl};
use tokio_postgres::{Client, NoTls};
use tracing::{error, info};

/// Opens a dedicated connection for one repository.
///
/// `tokio_postgres::Client` doesn't implement Clone, so each repository
/// gets its own connection; the driver task is detached and logs failures.
async fn connect(dsn: &str, label: &'static str) -> Result<Client> {
    let (client, connection) = tokio_postgres::connect(dsn, NoTls)
        .await
        .with_context(|| format!("Failed to connect to database for {label} repository"))?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("{} connection error: {}", label, e);
        }
    });
    info!("Connected to database for {} repository", label);
    Ok(client)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("Cleanpro backend starting...");

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize database pool and apply migrations
    let db_pool = db::init_db_pool(&config)
        .await
        .context("Failed to initialize database")?;
    info!("Database initialized successfully");

    let dsn = db::dsn(&config);

    // Order workflow repositories
    let orders_repo = PgOrdersRepository::new(connect(&dsn, "orders").await?);
    let addresses_repo = PgAddressesRepository::new(connect(&dsn, "addresses").await?);
    let users_repo = PgUsersRepository::new(connect(&dsn, "users").await?);
    let services_repo = PgServicesRepository::new(connect(&dsn, "services").await?);
    let ordered_repo = PgOrderedServicesRepository::new(connect(&dsn, "ordered services").await?);

    let order_service = Arc::new(OrderServiceImpl::new(
        db_pool.clone(),
        orders_repo,
        addresses_repo,
        users_repo,
        services_repo,
        ordered_repo,
        config.phone_region.clone(),
    ));

    // Account flows
    let user_service = Arc::new(UserServiceImpl::new(
        db_pool.clone(),
        PgUsersRepository::new(connect(&dsn, "users (accounts)").await?),
        PgAddressesRepository::new(connect(&dsn, "addresses (accounts)").await?),
        LogMailer::new(config.email_from.clone()),
        config.phone_region.clone(),
    ));

    // Catalog reads
    let catalog_service = Arc::new(CatalogServiceImpl::new(
        PgCleaningTypesRepository::new(connect(&dsn, "cleaning types").await?),
        PgServicesRepository::new(connect(&dsn, "services (catalog)").await?),
    ));

    // Ratings
    let rating_service = Arc::new(RatingServiceImpl::new(
        PgRatingsRepository::new(connect(&dsn, "ratings").await?),
        PgOrdersRepository::new(connect(&dsn, "orders (ratings)").await?),
    ));

    let state = AppState::new(order_service, user_service, catalog_service, rating_service);

    let http_port = config.http_port.to_string();
    info!("Using HTTP port: {}", http_port);

    let http_server = Server::new(http_port, state);
    http_server.start().await.context("HTTP server error")?;

    info!("Application stopped");
    Ok(())
}
