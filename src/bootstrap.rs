use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use solana_client::rpc_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::api::handlers::AppState;
use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::escrow::EscrowLedger;
use crate::pledges::{
    InMemoryNgoStore, InMemoryPledgeStore, NgoStore, PledgeStore,
};
use crate::pledges::postgres::{PgNgoStore, PgPledgeStore};
use crate::receipts::postgres::PgReceiptStore;
use crate::receipts::{InMemoryReceiptStore, ReceiptStore};
use crate::settlement::solana::{SolanaBackend, SolanaConfig};
use crate::settlement::{LedgerBackend, SettlementBackend, SettlementOrchestrator};

pub async fn initialize_app_state(settings: Settings) -> AppResult<AppState> {
    info!("Initializing application components ...");

    let (pledges, ngos, receipts): (
        Arc<dyn PledgeStore>,
        Arc<dyn NgoStore>,
        Arc<dyn ReceiptStore>,
    ) = match &settings.database_url {
        Some(url) => {
            let pool = initialize_database(url).await?;
            (
                Arc::new(PgPledgeStore::new(pool.clone())),
                Arc::new(PgNgoStore::new(pool.clone())),
                Arc::new(PgReceiptStore::new(pool)),
            )
        }
        None => {
            warn!("⚠️  DATABASE_URL not set - using in-memory stores (demo mode)");
            (
                Arc::new(InMemoryPledgeStore::new()),
                Arc::new(InMemoryNgoStore::new()),
                Arc::new(InMemoryReceiptStore::new()),
            )
        }
    };

    let backend = initialize_backend(&settings, ngos.clone()).await?;

    let orchestrator = Arc::new(SettlementOrchestrator::new(
        pledges.clone(),
        ngos.clone(),
        receipts.clone(),
        backend.clone(),
        Duration::from_secs(settings.ledger_timeout_secs),
        settings.dev_unique_period,
    ));

    Ok(AppState {
        settings,
        pledges,
        ngos,
        receipts,
        backend,
        orchestrator,
    })
}

/// Pick the settlement backend: the deployed Solana program when an admin
/// key is configured, otherwise an in-process escrow ledger seeded from the
/// NGO directory.
async fn initialize_backend(
    settings: &Settings,
    ngos: Arc<dyn NgoStore>,
) -> AppResult<Arc<dyn SettlementBackend>> {
    if let Some(key) = &settings.solana_admin_key {
        let admin = Keypair::from_base58_string(key);
        let program_id = SolanaBackend::parse_program_id(&settings.solana_program_id)
            .map_err(|_| {
                AppError::Config(format!(
                    "SOLANA_PROGRAM_ID is not a valid pubkey: {}",
                    settings.solana_program_id
                ))
            })?;
        let backend = SolanaBackend::new(
            SolanaConfig {
                rpc_url: settings.solana_rpc_url.clone(),
                cluster: settings.solana_cluster.clone(),
                program_id,
                commitment: CommitmentConfig::confirmed(),
                confirmation_timeout: Duration::from_secs(settings.ledger_timeout_secs),
            },
            admin,
        );
        info!("✅ Solana settlement backend registered");
        return Ok(Arc::new(backend));
    }

    warn!("⚠️  SOLANA_ADMIN_KEY not set - settling against the in-process ledger");
    let ledger = Arc::new(EscrowLedger::new());
    let admin = Keypair::new().pubkey();
    ledger.initialize(admin)?;

    if settings.demo_vault_lamports > 0 {
        ledger.deposit(Pubkey::new_unique(), settings.demo_vault_lamports)?;
        info!(
            vault_lamports = settings.demo_vault_lamports,
            "demo vault seeded"
        );
    }

    // Mirror the NGO directory onto the ledger whitelist so pledges against
    // known NGOs can settle immediately.
    for ngo in ngos.list_active().await? {
        match Pubkey::from_str(&ngo.wallet_address) {
            Ok(wallet) => ledger.add_ngo(admin, wallet, ngo.name.clone())?,
            Err(_) => warn!(
                ngo_id = %ngo.id,
                wallet = %ngo.wallet_address,
                "ngo wallet is not a valid pubkey, not whitelisting"
            ),
        }
    }

    info!("✅ In-process ledger backend registered");
    Ok(Arc::new(LedgerBackend::new(ledger, admin)))
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await?;

    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::Internal(format!("migration failed: {}", e)))?;

    info!("✓ Database initialized");
    Ok(pool)
}
