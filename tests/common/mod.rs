//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use stellar_xdr::curr::{
    ExtensionPoint, LedgerEntryChanges, LedgerFootprint, ScVal, SorobanAuthorizationEntry,
    SorobanAuthorizedFunction, SorobanAuthorizedInvocation, SorobanCredentials, SorobanResources,
    SorobanTransactionData, SorobanTransactionDataExt, SorobanTransactionMeta, SorobanTransactionMetaExt, TransactionMeta,
    TransactionMetaV3,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use sponsored_relay::config::schema::RelayConfig;
use sponsored_relay::ledger::address::{encode_account, encode_contract, sc_address};
use sponsored_relay::ledger::args::symbol;
use sponsored_relay::ledger::codec::encode_xdr;
use sponsored_relay::ledger::confirm::Sleeper;
use sponsored_relay::ledger::types::{
    AccountState, AssetBalance, LedgerOutcome, RelayError, RelayResult, SimulationResult,
    SimulationSuccess, SubmissionOutcome, SubmitStatus, TransactionStatus,
};
use sponsored_relay::ledger::{LedgerGateway, SignedEnvelope, SponsorKey};
use sponsored_relay::relay::SponsoredRelay;

pub const SPONSOR_SEED: [u8; 32] = [42u8; 32];
pub const STARTING_SEQUENCE: i64 = 1_000;

pub fn sponsor_key() -> SponsorKey {
    SponsorKey::from_seed(SPONSOR_SEED)
}

/// Deterministic `G...` address.
pub fn account(n: u8) -> String {
    encode_account(&[n; 32])
}

/// Deterministic `C...` address.
pub fn contract(n: u8) -> String {
    encode_contract(&[n; 32])
}

/// Defaults with fast polling.
pub fn test_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.polling.interval_ms = 10;
    config.polling.max_attempts = 5;
    config.retries.base_delay_ms = 1;
    config.retries.max_delay_ms = 2;
    config
}

pub fn relay_over(gateway: Arc<MockLedger>, config: &RelayConfig) -> SponsoredRelay<MockLedger> {
    SponsoredRelay::new(config, sponsor_key(), gateway).with_sleeper(Arc::new(InstantSleeper))
}

/// Sleeper that returns immediately.
pub struct InstantSleeper;

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}

pub fn success_status(ledger: u32) -> TransactionStatus {
    TransactionStatus::Success(LedgerOutcome {
        ledger,
        close_time: 1_700_000_000,
        result_xdr: None,
        result_meta_xdr: None,
    })
}

pub fn failed_status(result_xdr: &str) -> TransactionStatus {
    TransactionStatus::Failed(LedgerOutcome {
        ledger: 200,
        close_time: 1_700_000_000,
        result_xdr: Some(result_xdr.to_string()),
        result_meta_xdr: None,
    })
}

/// Base64 `TransactionMeta` carrying a Soroban return value.
pub fn meta_with_return(value: ScVal) -> String {
    let meta = TransactionMeta::V3(TransactionMetaV3 {
        ext: ExtensionPoint::V0,
        tx_changes_before: LedgerEntryChanges(Default::default()),
        operations: Default::default(),
        tx_changes_after: LedgerEntryChanges(Default::default()),
        soroban_meta: Some(SorobanTransactionMeta {
            ext: SorobanTransactionMetaExt::V0,
            events: Default::default(),
            return_value: value,
            diagnostic_events: Default::default(),
        }),
    });
    encode_xdr(&meta).unwrap()
}

pub fn simulation_success(min_resource_fee: i64, return_value: Option<ScVal>) -> SimulationResult {
    SimulationResult::Success(SimulationSuccess {
        min_resource_fee,
        transaction_data: SorobanTransactionData {
            ext: SorobanTransactionDataExt::V0,
            resources: SorobanResources {
                footprint: LedgerFootprint {
                    read_only: Default::default(),
                    read_write: Default::default(),
                },
                instructions: 2_000_000,
                disk_read_bytes: 1_024,
                write_bytes: 512,
            },
            resource_fee: 0,
        },
        auth_entries: vec![SorobanAuthorizationEntry {
            credentials: SorobanCredentials::SourceAccount,
            root_invocation: SorobanAuthorizedInvocation {
                function: SorobanAuthorizedFunction::ContractFn(
                    stellar_xdr::curr::InvokeContractArgs {
                        contract_address: sc_address(&contract(3)).unwrap(),
                        function_name: symbol("increment").unwrap(),
                        args: Default::default(),
                    },
                ),
                sub_invocations: Default::default(),
            },
        }],
        return_value,
        latest_ledger: 150,
    })
}

/// In-memory ledger.
///
/// Accounts are keyed by address. A pending submission whose sequence is not
/// the source account's next sequence is rejected, as the network would;
/// accepted submissions advance the account. Status queries pop the script
/// and fall back to `default_status` once it runs dry.
pub struct MockLedger {
    accounts: Mutex<HashMap<String, AccountState>>,
    simulation: SimulationResult,
    submit_status: SubmitStatus,
    statuses: Mutex<VecDeque<TransactionStatus>>,
    default_status: TransactionStatus,
    submitted: Mutex<Vec<String>>,
    simulated: Mutex<Vec<String>>,
    account_loads: AtomicU32,
    status_queries: AtomicU32,
}

impl MockLedger {
    /// A ledger holding only a funded sponsor.
    pub fn new() -> Self {
        let sponsor = AccountState {
            address: sponsor_key().address().to_string(),
            sequence_number: STARTING_SEQUENCE,
            balances: vec![AssetBalance {
                code: None,
                issuer: None,
                balance: "10000.0000000".into(),
            }],
        };
        Self {
            accounts: Mutex::new(HashMap::from([(sponsor.address.clone(), sponsor)])),
            simulation: simulation_success(5_000, None),
            submit_status: SubmitStatus::Pending,
            statuses: Mutex::new(VecDeque::new()),
            default_status: success_status(100),
            submitted: Mutex::new(Vec::new()),
            simulated: Mutex::new(Vec::new()),
            account_loads: AtomicU32::new(0),
            status_queries: AtomicU32::new(0),
        }
    }

    pub fn with_account(self, account: AccountState) -> Self {
        self.accounts
            .lock()
            .unwrap()
            .insert(account.address.clone(), account);
        self
    }

    pub fn with_simulation(mut self, simulation: SimulationResult) -> Self {
        self.simulation = simulation;
        self
    }

    pub fn with_submit_status(mut self, status: SubmitStatus) -> Self {
        self.submit_status = status;
        self
    }

    pub fn with_statuses(self, statuses: Vec<TransactionStatus>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into();
        self
    }

    pub fn with_default_status(mut self, status: TransactionStatus) -> Self {
        self.default_status = status;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn submissions(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn submitted_envelopes(&self) -> Vec<SignedEnvelope> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|xdr| SignedEnvelope::from_xdr_base64(xdr).unwrap())
            .collect()
    }

    pub fn simulations(&self) -> usize {
        self.simulated.lock().unwrap().len()
    }

    pub fn status_queries(&self) -> u32 {
        self.status_queries.load(Ordering::SeqCst)
    }

    pub fn account_loads(&self) -> u32 {
        self.account_loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    async fn load_account(&self, address: &str) -> RelayResult<AccountState> {
        self.account_loads.fetch_add(1, Ordering::SeqCst);
        // Let concurrent callers interleave here.
        tokio::task::yield_now().await;
        self.accounts
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| RelayError::AccountNotFound(address.to_string()))
    }

    async fn simulate(&self, envelope_xdr: &str) -> RelayResult<SimulationResult> {
        self.simulated.lock().unwrap().push(envelope_xdr.to_string());
        Ok(self.simulation.clone())
    }

    async fn submit(&self, envelope_xdr: &str) -> RelayResult<SubmissionOutcome> {
        tokio::task::yield_now().await;
        self.submitted.lock().unwrap().push(envelope_xdr.to_string());

        let envelope = SignedEnvelope::from_xdr_base64(envelope_xdr)?;
        let rejected = SubmissionOutcome {
            hash: String::new(),
            status: SubmitStatus::Rejected,
            latest_ledger: 99,
            error_result_xdr: Some("txBAD_SEQ".into()),
        };
        if self.submit_status == SubmitStatus::Rejected {
            return Ok(rejected);
        }

        let mut accounts = self.accounts.lock().unwrap();
        let Some(source) = accounts.get_mut(&envelope.source_address()) else {
            return Ok(rejected);
        };
        if envelope.sequence_number() != source.sequence_number + 1 {
            return Ok(rejected);
        }
        source.sequence_number = envelope.sequence_number();

        Ok(SubmissionOutcome {
            hash: String::new(),
            status: SubmitStatus::Pending,
            latest_ledger: 99,
            error_result_xdr: None,
        })
    }

    async fn transaction_status(&self, _hash: &str) -> RelayResult<TransactionStatus> {
        self.status_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_status.clone()))
    }
}

/// Start a programmable HTTP backend.
///
/// The handler receives the request path and JSON body (`Null` when empty)
/// and returns a status code and JSON body.
pub async fn start_json_backend<F>(handler: F) -> SocketAddr
where
    F: Fn(&str, Value) -> (u16, Value) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let Some((path, body)) = read_request(&mut socket).await else {
                            return;
                        };
                        let (status, body) = handler(&path, body);
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let body = body.to_string();
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<(String, Value)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let path = head.split_whitespace().nth(1)?.to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);
    Some((path, body))
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
