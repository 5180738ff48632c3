use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use borsh::BorshSerialize;
use sha2::{Digest, Sha256};
use solana_client::{
    rpc_client::RpcClient,
    rpc_config::{CommitmentConfig, UiTransactionEncoding},
};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use tracing::{error, info};

use crate::error::SettlementError;
use crate::escrow::EscrowStatus;
use crate::settlement::aggregator::Allocation;
use crate::settlement::backend::{SettlementBackend, TxOutcome};

const CONFIG_SEED: &[u8] = b"config_v1";
const NGO_REGISTRY_SEED: &[u8] = b"ngo_registry_v1";
const ESCROW_SEED: &[u8] = b"escrow_v1";

/// Instruction args, laid out exactly as the on-chain program expects.
#[derive(BorshSerialize)]
struct BatchDisburseArgs {
    week_id: u64,
    allocations: Vec<WireAllocation>,
}

#[derive(BorshSerialize)]
struct WireAllocation {
    ngo: [u8; 32],
    points_pledged: u64,
}

#[derive(Debug, Clone)]
pub struct SolanaConfig {
    pub rpc_url: String,
    pub cluster: String,
    pub program_id: Pubkey,
    pub commitment: CommitmentConfig,
    pub confirmation_timeout: Duration,
}

impl Default for SolanaConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            cluster: "devnet".to_string(),
            program_id: Pubkey::default(),
            commitment: CommitmentConfig::confirmed(),
            confirmation_timeout: Duration::from_secs(60),
        }
    }
}

struct SolanaInner {
    client: RpcClient,
    program_id: Pubkey,
    admin: Keypair,
    config_pda: Pubkey,
    ngo_registry_pda: Pubkey,
    escrow_pda: Pubkey,
}

/// Backend that lands the weekly batch on the deployed escrow program. The
/// RPC client is blocking, so every network call runs on the blocking pool.
pub struct SolanaBackend {
    cluster: String,
    inner: Arc<SolanaInner>,
}

impl SolanaBackend {
    pub fn new(config: SolanaConfig, admin: Keypair) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            config.rpc_url.clone(),
            config.confirmation_timeout,
            config.commitment,
        );
        let (config_pda, _) = Pubkey::find_program_address(&[CONFIG_SEED], &config.program_id);
        let (ngo_registry_pda, _) =
            Pubkey::find_program_address(&[NGO_REGISTRY_SEED], &config.program_id);
        let (escrow_pda, _) = Pubkey::find_program_address(&[ESCROW_SEED], &config.program_id);

        info!(
            program = %config.program_id,
            cluster = %config.cluster,
            escrow = %escrow_pda,
            "solana settlement backend ready"
        );

        Self {
            cluster: config.cluster,
            inner: Arc::new(SolanaInner {
                client,
                program_id: config.program_id,
                admin,
                config_pda,
                ngo_registry_pda,
                escrow_pda,
            }),
        }
    }

    pub fn parse_program_id(s: &str) -> Result<Pubkey, SettlementError> {
        Pubkey::from_str(s).map_err(|_| SettlementError::InvalidAddress(s.to_string()))
    }
}

impl SolanaInner {
    fn vault_balance_blocking(&self) -> Result<u64, SettlementError> {
        self.client
            .get_balance(&self.escrow_pda)
            .map_err(|e| SettlementError::Transport(format!("get_balance: {}", e)))
    }

    fn submit_blocking(
        &self,
        week_id: u64,
        allocations: &[Allocation],
    ) -> Result<TxOutcome, SettlementError> {
        let mut wire = Vec::with_capacity(allocations.len());
        let mut accounts = vec![
            AccountMeta::new(self.config_pda, false),
            AccountMeta::new_readonly(self.ngo_registry_pda, false),
            AccountMeta::new(self.escrow_pda, false),
            AccountMeta::new_readonly(self.admin.pubkey(), true),
        ];
        let mut requested: Vec<u64> = Vec::with_capacity(allocations.len());
        let mut total_requested: u64 = 0;

        for allocation in allocations {
            let ngo = Pubkey::from_str(&allocation.ngo_wallet)
                .map_err(|_| SettlementError::InvalidAddress(allocation.ngo_wallet.clone()))?;
            wire.push(WireAllocation {
                ngo: ngo.to_bytes(),
                points_pledged: allocation.total_points as u64,
            });
            // Recipient order must match the allocation order; the program
            // rejects the batch otherwise.
            accounts.push(AccountMeta::new(ngo, false));
            requested.push(allocation.lamports);
            total_requested = total_requested
                .checked_add(allocation.lamports)
                .ok_or(SettlementError::Rejected(crate::error::EscrowError::Overflow))?;
        }

        // Pre-submit balance, used only to estimate the payouts when the
        // confirmed transaction meta cannot be fetched afterwards.
        let vault = self.vault_balance_blocking()?;

        let mut data = anchor_discriminator("batch_disburse").to_vec();
        let args = BatchDisburseArgs {
            week_id,
            allocations: wire,
        };
        borsh::to_writer(&mut data, &args)
            .map_err(|e| SettlementError::Transport(format!("args encode: {}", e)))?;

        let instruction = Instruction {
            program_id: self.program_id,
            accounts,
            data,
        };

        let blockhash = self
            .client
            .get_latest_blockhash()
            .map_err(|e| SettlementError::Transport(format!("get_latest_blockhash: {}", e)))?;
        let message = Message::new(&[instruction], Some(&self.admin.pubkey()));
        let transaction = Transaction::new(&[&self.admin], message, blockhash);

        let signature = self
            .client
            .send_and_confirm_transaction(&transaction)
            .map_err(|e| {
                error!(week_id, "batch disbursement send failed: {}", e);
                SettlementError::Transport(format!("send failed: {}", e))
            })?;

        let estimated: Vec<u64> = if total_requested > vault {
            requested
                .iter()
                .map(|r| ((*r as u128 * vault as u128) / total_requested as u128) as u64)
                .collect()
        } else {
            requested
        };

        // The receipt must record what the program actually paid, not what
        // this side predicted: a deposit landing between the balance read
        // and execution changes the on-chain pro-rata shares. The confirmed
        // transaction's balance diffs are ledger truth; the estimate is only
        // a fallback when the meta cannot be fetched.
        let paid = match self
            .client
            .get_transaction(&signature, UiTransactionEncoding::Json)
        {
            Ok(confirmed) => confirmed
                .transaction
                .meta
                .and_then(|meta| {
                    paid_from_balances(&meta.pre_balances, &meta.post_balances, allocations.len())
                })
                .unwrap_or(estimated),
            Err(_) => estimated,
        };
        let total_paid: u64 = paid.iter().sum();
        let pro_rata_applied = total_paid < total_requested;

        info!(
            week_id,
            %signature,
            total_requested,
            total_paid,
            pro_rata_applied,
            "batch disbursement confirmed"
        );

        Ok(TxOutcome {
            signature: signature.to_string(),
            paid,
            total_requested,
            total_paid,
            pro_rata_applied,
        })
    }
}

#[async_trait]
impl SettlementBackend for SolanaBackend {
    fn cluster(&self) -> &str {
        &self.cluster
    }

    async fn vault_balance(&self) -> Result<u64, SettlementError> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.vault_balance_blocking())
            .await
            .map_err(|e| SettlementError::Transport(format!("task join: {}", e)))?
    }

    async fn status(&self) -> Result<EscrowStatus, SettlementError> {
        // The program does not expose a decoded status read over plain RPC;
        // report what the balance query can see.
        let vault_lamports = self.vault_balance().await?;
        Ok(EscrowStatus {
            admin: self.inner.admin.pubkey().to_string(),
            vault_lamports,
            total_deposited: 0,
            total_disbursed: 0,
            total_points_redeemed: 0,
            last_processed_week: 0,
            ngo_count: 0,
            sponsor_count: 0,
        })
    }

    async fn submit(
        &self,
        week_id: u64,
        allocations: &[Allocation],
    ) -> Result<TxOutcome, SettlementError> {
        let inner = self.inner.clone();
        let allocations = allocations.to_vec();
        tokio::task::spawn_blocking(move || inner.submit_blocking(week_id, &allocations))
            .await
            .map_err(|e| SettlementError::Transport(format!("task join: {}", e)))?
    }
}

/// Per-recipient payouts from a confirmed transaction's balance diffs.
/// Message layout: admin signer, then writable non-signers in appearance
/// order (config, escrow vault, recipients), then the readonly accounts.
fn paid_from_balances(pre: &[u64], post: &[u64], recipients: usize) -> Option<Vec<u64>> {
    const RECIPIENTS_START: usize = 3;
    let end = RECIPIENTS_START.checked_add(recipients)?;
    if pre.len() < end || post.len() < end {
        return None;
    }
    Some(
        (RECIPIENTS_START..end)
            .map(|i| post[i].saturating_sub(pre[i]))
            .collect(),
    )
}

/// First 8 bytes of sha256("global:<name>"), the Anchor instruction tag.
fn anchor_discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{}", name).as_bytes());
    let mut tag = [0u8; 8];
    tag.copy_from_slice(&digest[..8]);
    tag
}
