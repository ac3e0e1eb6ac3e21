//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST
//! API. Services are generic over repository traits, but AppState pins them
//! to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use prepflow_core::event::EventBus;
use prepflow_core::service::billing::BillingService;
use prepflow_core::service::score_ledger::{ScoreLedgerService, ScorePolicy};
use prepflow_core::service::study_plan::StudyPlanService;
use prepflow_infra::config::{load_global_config, GlobalConfig};
use prepflow_infra::sqlite::package::SqlitePackageRepository;
use prepflow_infra::sqlite::plan::SqlitePlanRepository;
use prepflow_infra::sqlite::pool::DatabasePool;
use prepflow_infra::sqlite::score::SqliteScoreRepository;
use prepflow_infra::sqlite::skill_catalog::SqliteSkillCatalog;
use prepflow_infra::sqlite::subscription::SqliteSubscriptionWindows;
use prepflow_infra::sqlite::transaction::SqliteTransactionRepository;
use prepflow_infra::storage::filesystem::LocalFileStore;

/// Concrete type aliases for the service generics pinned to infra
/// implementations.
pub type ConcreteScoreService = ScoreLedgerService<SqliteScoreRepository>;

pub type ConcretePlanService =
    StudyPlanService<SqlitePlanRepository, SqliteScoreRepository, SqliteSkillCatalog>;

pub type ConcreteBillingService = BillingService<
    SqliteTransactionRepository,
    SqlitePackageRepository,
    SqlitePlanRepository,
    SqliteScoreRepository,
    SqliteSubscriptionWindows,
>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub score_service: Arc<ConcreteScoreService>,
    pub plan_service: Arc<ConcretePlanService>,
    pub billing_service: Arc<ConcreteBillingService>,
    pub catalog: Arc<SqliteSkillCatalog>,
    pub windows: Arc<SqliteSubscriptionWindows>,
    pub file_store: Arc<LocalFileStore>,
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

/// Resolve the data directory: `PREPFLOW_DATA_DIR`, or `~/.prepflow`.
pub fn resolve_data_dir() -> PathBuf {
    match std::env::var("PREPFLOW_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".prepflow")
        }
    }
}

impl AppState {
    /// Initialize the application state: connect to DB, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_global_config(&data_dir).await;

        // Initialize database
        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("prepflow.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        let events = EventBus::new(64);

        let score_service = ScoreLedgerService::new(
            SqliteScoreRepository::new(db_pool.clone()),
            events.clone(),
            ScorePolicy {
                min: config.score_min,
                max: config.score_max,
            },
        );

        let plan_service = StudyPlanService::new(
            SqlitePlanRepository::new(db_pool.clone()),
            SqliteScoreRepository::new(db_pool.clone()),
            SqliteSkillCatalog::new(db_pool.clone()),
            events.clone(),
        );

        let billing_service = BillingService::new(
            SqliteTransactionRepository::new(db_pool.clone()),
            SqlitePackageRepository::new(db_pool.clone()),
            SqlitePlanRepository::new(db_pool.clone()),
            SqliteScoreRepository::new(db_pool.clone()),
            SqliteSubscriptionWindows::new(db_pool.clone()),
            events.clone(),
        );

        let file_store = LocalFileStore::new(data_dir.clone());

        Ok(Self {
            score_service: Arc::new(score_service),
            plan_service: Arc::new(plan_service),
            billing_service: Arc::new(billing_service),
            catalog: Arc::new(SqliteSkillCatalog::new(db_pool.clone())),
            windows: Arc::new(SqliteSubscriptionWindows::new(db_pool.clone())),
            file_store: Arc::new(file_store),
            config,
            data_dir,
            db_pool,
        })
    }
}
