use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub bind_address: String,
    /// When unset the service runs on in-memory stores (demo deployments).
    pub database_url: Option<String>,
    pub environment: String,
    pub admin_api_token: String,
    pub solana_rpc_url: String,
    pub solana_cluster: String,
    pub solana_program_id: String,
    /// Base58-encoded admin keypair. When unset the service settles against
    /// the in-process escrow ledger instead of the network.
    pub solana_admin_key: Option<String>,
    pub explorer_base_url: String,
    /// Bound on one settlement submission, in seconds.
    pub ledger_timeout_secs: u64,
    /// Seed balance for the in-process vault in demo deployments.
    pub demo_vault_lamports: u64,
    /// Test-only escape hatch: substitute a wall-clock unique period so the
    /// same calendar week can be settled repeatedly. Refused in production.
    pub dev_unique_period: bool,
    /// Weekly trigger: 0 = Monday .. 6 = Sunday, plus UTC hour.
    pub settlement_weekday: u8,
    pub settlement_hour: u32,
}

impl Settings {
    pub fn from_env() -> Self {
        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut dev_unique_period = std::env::var("DEV_UNIQUE_PERIOD")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        if dev_unique_period && environment == "production" {
            warn!("DEV_UNIQUE_PERIOD is not honored in production; ignoring");
            dev_unique_period = false;
        }

        Self {
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            environment,
            admin_api_token: std::env::var("ADMIN_API_TOKEN")
                .unwrap_or_else(|_| "dev-admin-token".to_string()),
            solana_rpc_url: std::env::var("SOLANA_RPC_URL")
                .unwrap_or_else(|_| "https://api.devnet.solana.com".to_string()),
            solana_cluster: std::env::var("SOLANA_CLUSTER")
                .unwrap_or_else(|_| "devnet".to_string()),
            solana_program_id: std::env::var("SOLANA_PROGRAM_ID")
                .unwrap_or_else(|_| "11111111111111111111111111111111".to_string()),
            solana_admin_key: std::env::var("SOLANA_ADMIN_KEY").ok(),
            explorer_base_url: std::env::var("EXPLORER_BASE_URL")
                .unwrap_or_else(|_| "https://explorer.solana.com".to_string()),
            ledger_timeout_secs: std::env::var("LEDGER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            demo_vault_lamports: std::env::var("DEMO_VAULT_LAMPORTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            dev_unique_period,
            settlement_weekday: std::env::var("SETTLEMENT_WEEKDAY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|d| *d <= 6)
                .unwrap_or(6),
            settlement_hour: std::env::var("SETTLEMENT_HOUR")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|h| *h <= 23)
                .unwrap_or(2),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
