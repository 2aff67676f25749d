use std::time::Duration;

use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::info;

use crate::entity::delivery_attempt;

/// Connection pool bounds, sourced from configuration.
#[derive(Clone, Copy, Debug)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub min_connections: u32,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 20,
            min_connections: 2,
        }
    }
}

/// Connect, synchronize the schema for all gateway entities, and create the
/// indexes schema-sync cannot express.
pub async fn init_db(db_url: &str, pool: PoolOptions) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    opt.max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    db.get_schema_registry("store::entity::*").sync(&db).await?;
    db.get_schema_registry("queue::entity::*").sync(&db).await?;

    ensure_indexes(&db).await?;

    Ok(db)
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite indexes, so the attempt
/// uniqueness constraint and the job dispatch index are created manually.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Uniqueness of (lead_id, attempt_no): the audit contract for ordered,
    // non-duplicated delivery attempts.
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("idx_delivery_attempt_lead_attempt")
        .table(delivery_attempt::Entity)
        .col(delivery_attempt::Column::LeadId)
        .col(delivery_attempt::Column::AttemptNo)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&stmt).await {
        Ok(_) => {
            info!("Ensured index idx_delivery_attempt_lead_attempt exists");
        }
        Err(e) => {
            tracing::warn!(
                "Failed to create index idx_delivery_attempt_lead_attempt: {}",
                e
            );
        }
    }

    // Dispatch predicate: WHERE state = 'pending' AND next_run_at <= now.
    let stmt = "CREATE INDEX IF NOT EXISTS idx_background_job_dispatch \
                ON background_job (next_run_at) WHERE state = 'pending'";
    match db.execute_unprepared(stmt).await {
        Ok(_) => {
            info!("Ensured index idx_background_job_dispatch exists");
        }
        Err(e) => {
            tracing::warn!("Failed to create index idx_background_job_dispatch: {}", e);
        }
    }

    Ok(())
}
