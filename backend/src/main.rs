use std::sync::Arc;

use backend::{
    broadcast::Broadcaster,
    config::{AppConfig, TallyBackend},
    coordinator::{CoordinatorOptions, VoteCoordinator},
    queries::{PgCatalog, PgLedger, PgTally},
    routes::AppState,
    tally::{MemoryTally, TallyStore},
};
use shuttle_runtime::CustomError;
use sqlx::PgPool;
use tracing::{info, warn};

#[shuttle_runtime::main]
async fn rocket(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secret_store: shuttle_runtime::SecretStore,
) -> shuttle_rocket::ShuttleRocket {
    info!("🚀 Starting live poll server");

    let config = AppConfig::from_lookup(|key| secret_store.get(key)).map_err(CustomError::new)?;
    if config.cookie_secret.is_none() {
        warn!("COOKIE_SECRET not found - Rocket will refuse to launch in release builds");
    }

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(CustomError::new)?;

    info!("📋 Migrations complete");

    let ledger = PgLedger::new(pool.clone());
    let tally: Arc<dyn TallyStore> = match config.tally_backend {
        TallyBackend::Postgres => Arc::new(PgTally::new(pool.clone())),
        TallyBackend::Memory => {
            let counts = ledger.count_by_option().await.map_err(CustomError::new)?;
            info!("🔢 Warmed in-memory tally with {} option counters", counts.len());
            Arc::new(MemoryTally::with_counts(counts).map_err(CustomError::new)?)
        }
    };

    let coordinator = VoteCoordinator::new(
        Arc::new(PgCatalog::new(pool.clone())),
        Arc::new(ledger),
        tally,
        Broadcaster::new(config.broadcast_capacity),
    )
    .with_options(CoordinatorOptions {
        announce_retractions: config.announce_retractions,
    });

    let rocket = backend::build_rocket(AppState::new(coordinator, config));

    Ok(rocket.into())
}
