//! Shared fixtures for integration tests: an in-memory token ledger, a mock
//! EIP-1193 wallet endpoint, a mock scoring service and a fully wired bridge.
#![allow(dead_code)]

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{address, keccak256, Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use reward_bridge::abi::erc20;
use reward_bridge::chain::{
    Broadcaster, ChainIdentity, ChainReader, ReceiptStatus, TransactionReceipt,
};
use reward_bridge::config::{BackendConfig, ChainConfig, SettlementConfig};
use reward_bridge::error::{BridgeResult, NetworkError, WalletRpcError};
use reward_bridge::http::AppState;
use reward_bridge::mechanism::{EercMechanism, Mechanism, MechanismRegistry};
use reward_bridge::rewards::RewardPreparer;
use reward_bridge::scoring::ScoringClient;
use reward_bridge::settlement::{ChainSettler, SettlementGate, SettlementHistory};
use reward_bridge::signer::{connect, ExtensionWallet, SigningAuthority};

pub const TOKEN: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
pub const SIGNER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const OWNER: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
pub const TREASURY: Address = address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");
pub const FUJI: u64 = 43113;
pub const GAS_USED: u128 = 52_341;
pub const GAS_PRICE: u128 = 25_000_000_000;

/// One whole token at 18 decimals.
pub fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18))
}

/// Bind an ephemeral port and serve `router` in the background.
pub async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Token balances and mined receipts shared by the wallet mock and the chain fake.
#[derive(Debug, Default)]
pub struct Ledger {
    pub balances: HashMap<Address, U256>,
    pub receipts: HashMap<TxHash, TransactionReceipt>,
    pub block: u64,
    nonce: u64,
}

pub type SharedLedger = Arc<Mutex<Ledger>>;

impl Ledger {
    pub fn funded(account: Address, amount: U256) -> SharedLedger {
        let mut ledger = Ledger {
            block: 100,
            ..Ledger::default()
        };
        ledger.balances.insert(account, amount);
        Arc::new(Mutex::new(ledger))
    }

    pub fn balance(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    /// Apply an ERC-20 `transfer` call from `from` and mine it in a new block.
    fn mine_transfer(&mut self, from: Address, data: &[u8]) -> TxHash {
        self.nonce += 1;
        self.block += 1;
        let tx_hash = keccak256(self.nonce.to_be_bytes());

        let decoded = erc20::transfer().decode(data).unwrap();
        let (to, amount) = match (&decoded[0], &decoded[1]) {
            (DynSolValue::Address(to), DynSolValue::Uint(amount, _)) => (*to, *amount),
            other => panic!("unexpected transfer args {:?}", other),
        };

        let available = self.balance(from);
        let status = if available >= amount {
            self.balances.insert(from, available - amount);
            *self.balances.entry(to).or_default() += amount;
            ReceiptStatus::Success
        } else {
            ReceiptStatus::Reverted
        };

        self.receipts.insert(
            tx_hash,
            TransactionReceipt {
                transaction_hash: tx_hash,
                block_number: self.block,
                status,
                gas_used: GAS_USED,
                effective_gas_price: GAS_PRICE,
            },
        );
        tx_hash
    }
}

/// `ChainReader` over the shared ledger; answers `balanceOf` and `decimals`.
pub struct FakeChain {
    ledger: SharedLedger,
    pub reads: AtomicUsize,
}

impl FakeChain {
    pub fn new(ledger: SharedLedger) -> Self {
        Self {
            ledger,
            reads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn chain_id(&self) -> BridgeResult<u64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(FUJI)
    }

    async fn block_number(&self) -> BridgeResult<u64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.ledger.lock().unwrap().block)
    }

    async fn call(&self, to: Address, data: Bytes) -> BridgeResult<Bytes> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if to != TOKEN {
            return Err(NetworkError::ReadFailure("no contract at address".into()).into());
        }
        let balance_of = erc20::balance_of();
        if data.starts_with(&balance_of.selector()[..]) {
            let holder = match balance_of.decode(&data).unwrap().as_slice() {
                [DynSolValue::Address(holder)] => *holder,
                other => panic!("unexpected balanceOf args {:?}", other),
            };
            let balance = self.ledger.lock().unwrap().balance(holder);
            return Ok(DynSolValue::Uint(balance, 256).abi_encode().into());
        }
        if data.starts_with(&erc20::decimals().selector()[..]) {
            return Ok(DynSolValue::Uint(U256::from(18), 8).abi_encode().into());
        }
        Err(NetworkError::ReadFailure("execution reverted".into()).into())
    }

    async fn transaction_receipt(&self, tx_hash: TxHash) -> BridgeResult<Option<TransactionReceipt>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.ledger.lock().unwrap().receipts.get(&tx_hash).cloned())
    }
}

/// Behaviour of the mock wallet.
#[derive(Debug)]
pub struct WalletState {
    pub current_chain: u64,
    pub known_chains: HashSet<u64>,
    pub accounts: Vec<Address>,
    /// Answer `wallet_addEthereumChain` with a 4001 rejection.
    pub reject_add: bool,
    /// Accept `wallet_switchEthereumChain` without actually switching.
    pub ignore_switch: bool,
    /// Every method called, in order.
    pub calls: Vec<String>,
    ledger: SharedLedger,
}

impl WalletState {
    /// A wallet that already knows and sits on `chain`.
    pub fn on(chain: u64, ledger: SharedLedger) -> Self {
        Self {
            current_chain: chain,
            known_chains: HashSet::from([chain]),
            accounts: vec![SIGNER],
            reject_add: false,
            ignore_switch: false,
            calls: Vec::new(),
            ledger,
        }
    }

    /// A wallet on Ethereum mainnet that has never seen `chain`.
    pub fn unaware_of(chain: u64, ledger: SharedLedger) -> Self {
        let mut state = Self::on(1, ledger);
        state.known_chains.remove(&chain);
        state
    }
}

/// EIP-1193 JSON-RPC endpoint backed by [`WalletState`].
pub struct MockWallet {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<WalletState>>,
}

impl MockWallet {
    pub async fn start(state: WalletState) -> Self {
        let state = Arc::new(Mutex::new(state));
        let router = Router::new()
            .route("/", post(wallet_rpc))
            .with_state(state.clone());
        Self {
            addr: spawn(router).await,
            state,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|m| m.as_str() == method).count()
    }
}

fn parse_chain(params: &Value) -> u64 {
    let hex = params[0]["chainId"].as_str().unwrap_or_default();
    u64::from_str_radix(hex.trim_start_matches("0x"), 16).unwrap_or_default()
}

async fn wallet_rpc(State(state): State<Arc<Mutex<WalletState>>>, Json(body): Json<Value>) -> Json<Value> {
    let id = body["id"].clone();
    let method = body["method"].as_str().unwrap_or_default().to_string();
    let params = body["params"].clone();

    let mut wallet = state.lock().unwrap();
    wallet.calls.push(method.clone());

    let outcome: Result<Value, WalletRpcError> = match method.as_str() {
        "eth_chainId" => Ok(json!(format!("0x{:x}", wallet.current_chain))),
        "eth_requestAccounts" => Ok(json!(wallet.accounts)),
        "wallet_switchEthereumChain" => {
            let chain = parse_chain(&params);
            if wallet.ignore_switch {
                Ok(Value::Null)
            } else if wallet.known_chains.contains(&chain) {
                wallet.current_chain = chain;
                Ok(Value::Null)
            } else {
                Err(WalletRpcError::new(
                    WalletRpcError::UNRECOGNIZED_CHAIN,
                    format!("Unrecognized chain ID \"0x{:x}\".", chain),
                ))
            }
        }
        "wallet_addEthereumChain" => {
            if wallet.reject_add {
                Err(WalletRpcError::new(WalletRpcError::USER_REJECTED, "User rejected the request."))
            } else {
                let chain = parse_chain(&params);
                wallet.known_chains.insert(chain);
                Ok(Value::Null)
            }
        }
        "eth_sendTransaction" => {
            let tx = &params[0];
            let from: Address = tx["from"].as_str().unwrap().parse().unwrap();
            let data: Bytes = tx["data"].as_str().unwrap().parse().unwrap();
            let tx_hash = wallet.ledger.lock().unwrap().mine_transfer(from, &data);
            Ok(json!(tx_hash))
        }
        other => Err(WalletRpcError::new(
            WalletRpcError::UNSUPPORTED_METHOD,
            format!("method {} not supported", other),
        )),
    };

    Json(match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(error) => json!({ "jsonrpc": "2.0", "id": id, "error": error }),
    })
}

/// Scoring service answering every prediction with a fixed body.
pub struct MockScoring {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct ScoringState {
    response: Value,
    hits: Arc<AtomicUsize>,
}

impl MockScoring {
    pub async fn start(response: Value) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = ScoringState {
            response,
            hits: hits.clone(),
        };
        let router = Router::new()
            .route(
                "/api/predict",
                post(scoring_predict).get(|| async { Json(json!({ "message": "POST features to /api/predict" })) }),
            )
            .with_state(state);
        Self {
            addr: spawn(router).await,
            hits,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

async fn scoring_predict(State(state): State<ScoringState>, Json(_features): Json<Value>) -> Json<Value> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    Json(state.response.clone())
}

/// Scoring body for a hit that asks the user to confirm.
pub fn hit_response(prediction: f64) -> Value {
    json!({
        "prediction": prediction,
        "is_hit": true,
        "suggestion": "Strong hit potential",
        "notification": { "yes_no": true, "message": "Token update will occur. Proceed?" },
        "gas_expenditure": 52341,
        "token_update": true
    })
}

/// Scoring body for a miss that asks the user to confirm.
pub fn miss_response(prediction: f64) -> Value {
    json!({
        "prediction": prediction,
        "is_hit": false,
        "notification": { "yes_no": true, "message": "Token update will occur. Proceed?" },
        "gas_expenditure": "0.0012 AVAX",
        "token_update": true
    })
}

pub struct BridgeOptions {
    pub scoring: Value,
    pub require_consent: bool,
    pub treasury: Option<Address>,
    pub signer_balance: U256,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            scoring: hit_response(0.81),
            require_consent: true,
            treasury: None,
            signer_balance: tokens(1_000),
        }
    }
}

/// Everything wired the way `main` wires it, against the mocks.
pub struct TestBridge {
    pub state: AppState,
    pub gate: Arc<SettlementGate>,
    pub ledger: SharedLedger,
    pub wallet: MockWallet,
    pub scoring: MockScoring,
    pub chain: Arc<FakeChain>,
}

impl TestBridge {
    pub fn balance(&self, account: Address) -> U256 {
        self.ledger.lock().unwrap().balance(account)
    }
}

pub fn fuji() -> ChainIdentity {
    ChainIdentity::from_config(&ChainConfig::default()).unwrap()
}

pub async fn bridge(options: BridgeOptions) -> TestBridge {
    let ledger = Ledger::funded(SIGNER, options.signer_balance);
    let identity = fuji();

    let wallet = MockWallet::start(WalletState::on(FUJI, ledger.clone())).await;
    let extension = ExtensionWallet::new(wallet.url(), Duration::from_secs(5)).unwrap();
    let session = connect(Arc::new(extension), &identity).await.unwrap();
    let authority: Arc<dyn SigningAuthority> = Arc::new(session);

    let chain = Arc::new(FakeChain::new(ledger.clone()));
    let reader: Arc<dyn ChainReader> = chain.clone();
    let broadcaster = Broadcaster::new(reader.clone(), 0, Duration::from_millis(10));

    let mechanism = Arc::new(EercMechanism::new(
        Some(TOKEN.to_string()),
        reader.clone(),
        broadcaster.clone(),
        Some(authority),
    ));
    mechanism.init().await.unwrap();
    let registry = MechanismRegistry::new();
    registry.register(mechanism.clone());

    let preparer = Arc::new(RewardPreparer::new(mechanism, reader));
    let settler = ChainSettler::new(preparer.clone(), broadcaster, options.treasury, Duration::from_secs(5));
    let settlement = SettlementConfig {
        require_consent: options.require_consent,
        treasury_address: options.treasury.map(|t| t.to_string()).unwrap_or_default(),
        ..SettlementConfig::default()
    };
    let gate = Arc::new(SettlementGate::new(
        &settlement,
        Arc::new(settler),
        Arc::new(SettlementHistory::default()),
    ));

    let scoring = MockScoring::start(options.scoring).await;
    let scoring_client = ScoringClient::new(&BackendConfig {
        base_url: scoring.url(),
        timeout_secs: 5,
    })
    .unwrap();

    let state = AppState {
        registry,
        gate: gate.clone(),
        scoring: scoring_client,
        preparer,
        chain: identity,
        hit_reward: settlement.hit_reward,
        signer: "extension",
    };

    TestBridge {
        state,
        gate,
        ledger,
        wallet,
        scoring,
        chain,
    }
}
