//! Reward bridge server.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────────┐
//!                    │                      REWARD BRIDGE                        │
//!                    │                                                          │
//!   POST /api/predict│  ┌─────────┐   ┌─────────────┐   ┌──────────────────┐     │
//!   ─────────────────┼─▶│  http   │──▶│   scoring   │──▶│ settlement gate  │     │
//!                    │  │ server  │   │   client    │   │ (consent, cycle) │     │
//!                    │  └─────────┘   └─────────────┘   └────────┬─────────┘     │
//!                    │                                           │ accept        │
//!                    │                                           ▼               │
//!                    │  ┌──────────────┐   ┌──────────┐   ┌──────────────┐       │
//!                    │  │ EERC         │──▶│   abi    │   │  broadcaster │──▶ RPC│
//!                    │  │ mechanism    │──▶│ encoder  │   │  + receipts  │       │
//!                    │  └──────┬───────┘   └──────────┘   └──────────────┘       │
//!                    │         │ sendPrepared                                    │
//!                    │         ▼                                                 │
//!                    │  ┌──────────────────────────────┐                         │
//!                    │  │ signer session (reconciled)  │──▶ wallet / server key  │
//!                    │  └──────────────────────────────┘                         │
//!                    └──────────────────────────────────────────────────────────┘
//! ```

use alloy::primitives::Address;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use reward_bridge::chain::{
    format_units, Broadcaster, BlockchainClient, ChainIdentity, ChainReader, TokenReader,
};
use reward_bridge::config::{load_config, BridgeConfig, SignerKind};
use reward_bridge::error::BridgeResult;
use reward_bridge::http::{AppState, HttpServer};
use reward_bridge::mechanism::eerc::EERC_NAME;
use reward_bridge::mechanism::{EercMechanism, MechanismRegistry};
use reward_bridge::observability::{logging, metrics};
use reward_bridge::rewards::RewardPreparer;
use reward_bridge::scoring::ScoringClient;
use reward_bridge::settlement::{ChainSettler, SettlementGate, SettlementHistory};
use reward_bridge::signer::{connect, ExtensionWallet, LocalKeySigner, SigningAuthority};

#[derive(Parser)]
#[command(name = "reward-bridge")]
#[command(about = "Bridges scoring outcomes to consented ERC-20 settlements", long_about = None)]
struct Cli {
    /// TOML config file; defaults plus environment overrides when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "reward-bridge starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        chain_id = config.chain.chain_id,
        backend = %config.backend.base_url,
        signer = ?config.signer.kind,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let state = build_state(&config).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(&config.listener, state);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wire every subsystem from configuration.
async fn build_state(config: &BridgeConfig) -> BridgeResult<AppState> {
    let chain = ChainIdentity::from_config(&config.chain)?;
    let client = BlockchainClient::new(&config.chain)?;
    if let Err(e) = client.verify_chain_id(&chain).await {
        tracing::warn!(error = %e, "RPC chain check failed; reads may target the wrong chain");
    }
    let reader: Arc<dyn ChainReader> = Arc::new(client.clone());

    let broadcaster = Broadcaster::new(
        reader.clone(),
        config.chain.confirmation_blocks,
        Duration::from_millis(config.chain.poll_interval_ms),
    );

    let (authority, signer) = bind_signer(config, &chain, &client).await?;

    let mechanism = Arc::new(EercMechanism::new(
        Some(config.token.contract_address.clone()),
        reader.clone(),
        broadcaster.clone(),
        authority.clone(),
    ));
    let registry = MechanismRegistry::new();
    registry.register(mechanism.clone());
    for (name, e) in registry.init_all().await {
        // Mechanisms that fail init stay registered and answer NotInitialized.
        tracing::warn!(mechanism = %name, error = %e, "Mechanism init failed");
    }

    let signer_account = authority.as_ref().map(|a| a.account());
    if let Some(contract) = mechanism.contract() {
        log_token(TokenReader::new(reader.clone(), contract), signer_account).await;
    }

    let preparer = Arc::new(RewardPreparer::new(mechanism, reader));
    let treasury = parse_treasury(&config.settlement.treasury_address);
    let settler = ChainSettler::new(
        preparer.clone(),
        broadcaster,
        treasury,
        Duration::from_secs(config.chain.confirmation_timeout_secs),
    );
    let gate = SettlementGate::new(
        &config.settlement,
        Arc::new(settler),
        Arc::new(SettlementHistory::default()),
    );

    let scoring = ScoringClient::new(&config.backend)?;
    match scoring.health().await {
        Ok(message) => tracing::info!(backend = %scoring.base_url(), message = %message, "Scoring service reachable"),
        Err(e) => tracing::warn!(backend = %scoring.base_url(), error = %e, "Scoring service not reachable yet"),
    }

    tracing::info!(mechanism = EERC_NAME, signer, treasury = ?treasury, "Bridge wired");

    Ok(AppState {
        registry,
        gate: Arc::new(gate),
        scoring,
        preparer,
        chain,
        hit_reward: config.settlement.hit_reward,
        signer,
    })
}

/// Bind the configured signing authority, reconciled onto the required chain.
async fn bind_signer(
    config: &BridgeConfig,
    chain: &ChainIdentity,
    client: &BlockchainClient,
) -> BridgeResult<(Option<Arc<dyn SigningAuthority>>, &'static str)> {
    match config.signer.kind {
        SignerKind::None => {
            tracing::info!("No signer configured; running prepare-only");
            Ok((None, "none"))
        }
        SignerKind::ServerKey => {
            let signer = LocalKeySigner::from_env(client.primary_url())?;
            let session = connect(Arc::new(signer), chain).await?;
            let authority: Arc<dyn SigningAuthority> = Arc::new(session);
            Ok((Some(authority), "server_key"))
        }
        SignerKind::Extension => {
            let wallet = ExtensionWallet::detect(
                config.signer.extension_url.as_deref(),
                Duration::from_secs(config.listener.request_timeout_secs),
            )
            .await?;
            tracing::info!(endpoint = %wallet.endpoint(), "Wallet extension detected");
            let session = connect(Arc::new(wallet), chain).await?;
            let authority: Arc<dyn SigningAuthority> = Arc::new(session);
            Ok((Some(authority), "extension"))
        }
    }
}

/// Log token metadata and the signer's balance. Failures only warn.
async fn log_token(token: TokenReader, signer: Option<Address>) {
    let meta = match token.metadata().await {
        Ok(meta) => meta,
        Err(e) => {
            tracing::warn!(contract = %token.contract(), error = %e, "Token metadata unavailable");
            return;
        }
    };
    tracing::info!(contract = %token.contract(), symbol = %meta.symbol, decimals = meta.decimals, "Token bound");
    if let Some(account) = signer {
        match token.balance_of(account).await {
            Ok(raw) => tracing::info!(
                account = %account,
                balance = %format_units(raw, meta.decimals),
                symbol = %meta.symbol,
                "Signer token balance"
            ),
            Err(e) => tracing::warn!(account = %account, error = %e, "Signer balance unavailable"),
        }
    }
}

fn parse_treasury(value: &str) -> Option<Address> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value
        .parse()
        .inspect_err(|e| tracing::warn!(treasury = %value, error = %e, "Ignoring unparseable treasury address"))
        .ok()
}
