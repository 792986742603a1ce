use library_lending::{
    adapters::SystemClock,
    adapters::postgres::{PostgresCatalog, PostgresLoanStore, PostgresPatronDirectory},
    api::{create_router, handlers::AppState},
    application::loan::{ServiceDependencies, spawn_reconciliation_loop},
    config::Config,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_lending=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    tracing::info!(
        max_open_loans = config.policy.max_open_loans,
        daily_fine_rate = %config.policy.daily_fine_rate,
        default_loan_period_days = config.policy.default_loan_period_days,
        "Lending policy loaded"
    );

    // Initialize database connection pool
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Initialize adapters
    let service_deps = ServiceDependencies {
        loan_store: Arc::new(PostgresLoanStore::new(pool.clone())),
        patron_directory: Arc::new(PostgresPatronDirectory::new(pool.clone())),
        catalog: Arc::new(PostgresCatalog::new(pool.clone())),
        clock: Arc::new(SystemClock),
        policy: config.policy,
    };

    // Periodic overdue reconciliation
    let _reconciler = spawn_reconciliation_loop(service_deps.clone(), config.reconcile_interval);

    let app_state = Arc::new(AppState { service_deps });
    let app = create_router(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
