//! Envelope assembly.
//!
//! # Responsibilities
//! - Build one Payment or InvokeHostFunction operation sourced from the
//!   acting party
//! - Wrap it in a transaction sourced from the sponsor, using the freshly
//!   loaded sponsor sequence number, the base fee and a short validity window
//! - Keep the envelope mutable until signed ([`UnsignedEnvelope`]) and
//!   append-only afterwards ([`SignedEnvelope`])
//!
//! Sponsor and operation source are always two explicit fields; one is
//! never inferred from the other.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use stellar_xdr::curr::{
    AlphaNum12, AlphaNum4, Asset, AssetCode12, AssetCode4, ContractId, DecoratedSignature, Hash,
    HostFunction, InvokeContractArgs, InvokeHostFunctionOp, Memo, Operation, OperationBody, PaymentOp,
    Preconditions, ScAddress, ScVal, SequenceNumber, SorobanAuthorizationEntry,
    SorobanTransactionData, TimeBounds, TimePoint, Transaction, TransactionEnvelope,
    TransactionExt, TransactionV1Envelope,
};

use crate::config::schema::{AssetPolicy, EnvelopeConfig};
use crate::ledger::address::{
    account_id, account_id_to_string, muxed_account, muxed_to_string, parse_contract,
    sc_address_to_string,
};
use crate::ledger::args::symbol;
use crate::ledger::codec::{decode_xdr, encode_xdr};
use crate::ledger::signer::transaction_hash;
use crate::ledger::types::{AccountState, NetworkId, RelayError, RelayResult};

/// Stroops per whole unit (7 fractional digits).
pub const STROOPS_PER_UNIT: i64 = 10_000_000;

/// Symbol the network uses for its native asset.
pub const NATIVE_ASSET_CODE: &str = "XLM";

/// True for `"native"` and the native symbol, case-insensitively.
pub fn is_native_alias(code: &str) -> bool {
    code.eq_ignore_ascii_case("native") || code.eq_ignore_ascii_case(NATIVE_ASSET_CODE)
}

/// Parse a fixed-point decimal amount into stroops.
pub fn parse_amount(text: &str) -> RelayResult<i64> {
    let invalid = |why: &str| RelayError::InvalidInput(format!("Invalid amount '{}': {}", text, why));

    let text = text.trim();
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("empty"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("expected digits with an optional decimal point"));
    }
    if fraction.len() > 7 {
        return Err(invalid("more than 7 fractional digits"));
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid("too large"))?
    };
    let fraction: i64 = if fraction.is_empty() {
        0
    } else {
        format!("{:0<7}", fraction).parse().map_err(|_| invalid("bad fraction"))?
    };

    let stroops = whole
        .checked_mul(STROOPS_PER_UNIT)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| invalid("too large"))?;
    if stroops == 0 {
        return Err(invalid("must be positive"));
    }
    Ok(stroops)
}

/// Asset selection for a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSpec {
    Native,
    Issued { code: String, issuer: String },
}

impl AssetSpec {
    /// Resolve a requested asset code and issuer.
    ///
    /// No code, `"native"` and `"XLM"` select the native asset. Any other
    /// code needs an issuer; without one, `policy` decides between paying in
    /// the native asset and refusing.
    pub fn resolve(code: Option<&str>, issuer: Option<&str>, policy: AssetPolicy) -> RelayResult<Self> {
        let code = match code.map(str::trim) {
            None | Some("") => return Ok(AssetSpec::Native),
            Some(code) if is_native_alias(code) => return Ok(AssetSpec::Native),
            Some(code) => code,
        };

        match issuer.map(str::trim).filter(|i| !i.is_empty()) {
            Some(issuer) => {
                validate_asset_code(code)?;
                account_id(issuer)?;
                Ok(AssetSpec::Issued {
                    code: code.to_string(),
                    issuer: issuer.to_string(),
                })
            }
            None => match policy {
                AssetPolicy::FallbackToNative => {
                    tracing::warn!(asset_code = code, "No issuer given, paying in the native asset");
                    Ok(AssetSpec::Native)
                }
                AssetPolicy::Strict => Err(RelayError::InvalidInput(format!(
                    "Asset '{}' requires an issuer",
                    code
                ))),
            },
        }
    }

    pub fn to_xdr(&self) -> RelayResult<Asset> {
        match self {
            AssetSpec::Native => Ok(Asset::Native),
            AssetSpec::Issued { code, issuer } => {
                validate_asset_code(code)?;
                let issuer = account_id(issuer)?;
                if code.len() <= 4 {
                    let mut raw = [0u8; 4];
                    raw[..code.len()].copy_from_slice(code.as_bytes());
                    Ok(Asset::CreditAlphanum4(AlphaNum4 {
                        asset_code: AssetCode4(raw),
                        issuer,
                    }))
                } else {
                    let mut raw = [0u8; 12];
                    raw[..code.len()].copy_from_slice(code.as_bytes());
                    Ok(Asset::CreditAlphanum12(AlphaNum12 {
                        asset_code: AssetCode12(raw),
                        issuer,
                    }))
                }
            }
        }
    }

    pub fn from_xdr(asset: &Asset) -> Self {
        let trim = |raw: &[u8]| {
            let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
            String::from_utf8_lossy(&raw[..end]).into_owned()
        };
        match asset {
            Asset::Native => AssetSpec::Native,
            Asset::CreditAlphanum4(a) => AssetSpec::Issued {
                code: trim(&a.asset_code.0),
                issuer: account_id_to_string(&a.issuer),
            },
            Asset::CreditAlphanum12(a) => AssetSpec::Issued {
                code: trim(&a.asset_code.0),
                issuer: account_id_to_string(&a.issuer),
            },
        }
    }
}

fn validate_asset_code(code: &str) -> RelayResult<()> {
    if code.is_empty() || code.len() > 12 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(RelayError::InvalidInput(format!("Invalid asset code '{}'", code)));
    }
    Ok(())
}

/// The single operation carried by an envelope, in host terms.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationSpec {
    Payment {
        source: String,
        destination: String,
        asset: AssetSpec,
        /// Stroops.
        amount: i64,
    },
    Invoke {
        source: String,
        contract_id: String,
        function_name: String,
        args: Vec<ScVal>,
    },
}

impl OperationSpec {
    /// The acting party that authorizes the operation.
    pub fn source(&self) -> &str {
        match self {
            OperationSpec::Payment { source, .. } | OperationSpec::Invoke { source, .. } => source,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OperationSpec::Payment { .. } => "payment",
            OperationSpec::Invoke { .. } => "invoke_contract",
        }
    }

    fn to_operation(&self) -> RelayResult<Operation> {
        let body = match self {
            OperationSpec::Payment {
                destination,
                asset,
                amount,
                ..
            } => OperationBody::Payment(PaymentOp {
                destination: muxed_account(destination)?,
                asset: asset.to_xdr()?,
                amount: *amount,
            }),
            OperationSpec::Invoke {
                contract_id,
                function_name,
                args,
                ..
            } => OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function: HostFunction::InvokeContract(InvokeContractArgs {
                    contract_address: ScAddress::Contract(ContractId(Hash(parse_contract(
                        contract_id,
                    )?))),
                    function_name: symbol(function_name)?,
                    args: args.clone().try_into().map_err(|e| {
                        RelayError::InvalidInput(format!("Too many arguments: {}", e))
                    })?,
                }),
                auth: Default::default(),
            }),
        };

        Ok(Operation {
            source_account: Some(muxed_account(self.source())?),
            body,
        })
    }

    /// Read back the single operation of a signed envelope.
    pub fn from_envelope(envelope: &SignedEnvelope) -> RelayResult<Self> {
        envelope.operation()
    }

    /// Read the host view back out of an XDR operation.
    pub fn from_operation(op: &Operation) -> RelayResult<Self> {
        let source = op
            .source_account
            .as_ref()
            .map(muxed_to_string)
            .ok_or_else(|| RelayError::DecodeError("Operation has no explicit source".to_string()))?;

        match &op.body {
            OperationBody::Payment(payment) => Ok(OperationSpec::Payment {
                source,
                destination: muxed_to_string(&payment.destination),
                asset: AssetSpec::from_xdr(&payment.asset),
                amount: payment.amount,
            }),
            OperationBody::InvokeHostFunction(invoke) => match &invoke.host_function {
                HostFunction::InvokeContract(call) => Ok(OperationSpec::Invoke {
                    source,
                    contract_id: sc_address_to_string(&call.contract_address)?,
                    function_name: call.function_name.0.to_utf8_string_lossy(),
                    args: call.args.to_vec(),
                }),
                _ => Err(RelayError::DecodeError(
                    "Unsupported host function".to_string(),
                )),
            },
            other => Err(RelayError::DecodeError(format!(
                "Unsupported operation {}",
                other.name()
            ))),
        }
    }
}

fn single_operation(tx: &Transaction) -> RelayResult<&Operation> {
    match tx.operations.as_slice() {
        [op] => Ok(op),
        ops => Err(RelayError::DecodeError(format!(
            "Expected exactly one operation, found {}",
            ops.len()
        ))),
    }
}

fn resource_fee_of(tx: &Transaction) -> Option<i64> {
    match &tx.ext {
        TransactionExt::V0 => None,
        TransactionExt::V1(data) => Some(data.resource_fee),
    }
}

/// An envelope that may still be rewritten by simulation.
#[derive(Debug, Clone)]
pub struct UnsignedEnvelope {
    tx: Transaction,
    base_fee: u32,
}

impl UnsignedEnvelope {
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// The sponsor's address.
    pub fn source_address(&self) -> String {
        muxed_to_string(&self.tx.source_account)
    }

    pub fn sequence_number(&self) -> i64 {
        self.tx.seq_num.0
    }

    /// Total fee bid in stroops (inclusion plus any resource fee).
    pub fn fee(&self) -> u32 {
        self.tx.fee
    }

    /// Inclusion fee the envelope was built with.
    pub fn base_fee(&self) -> u32 {
        self.base_fee
    }

    /// Resource fee declared in the Soroban data, once simulated.
    pub fn resource_fee(&self) -> Option<i64> {
        resource_fee_of(&self.tx)
    }

    /// Upper time bound, in unix seconds.
    pub fn valid_until(&self) -> Option<u64> {
        match &self.tx.cond {
            Preconditions::Time(bounds) => Some(bounds.max_time.0),
            _ => None,
        }
    }

    pub fn operation(&self) -> RelayResult<OperationSpec> {
        OperationSpec::from_operation(single_operation(&self.tx)?)
    }

    pub fn is_invocation(&self) -> bool {
        matches!(
            single_operation(&self.tx).map(|op| &op.body),
            Ok(OperationBody::InvokeHostFunction(_))
        )
    }

    /// Authorization entries attached to the invocation, if any.
    pub fn auth_entries(&self) -> Vec<SorobanAuthorizationEntry> {
        match single_operation(&self.tx).map(|op| &op.body) {
            Ok(OperationBody::InvokeHostFunction(invoke)) => invoke.auth.to_vec(),
            _ => Vec::new(),
        }
    }

    /// Wire form with no signatures, as the simulate API expects.
    pub fn to_xdr_base64(&self) -> RelayResult<String> {
        encode_xdr(&TransactionEnvelope::Tx(TransactionV1Envelope {
            tx: self.tx.clone(),
            signatures: Default::default(),
        }))
    }

    pub fn hash(&self, network_id: &NetworkId) -> RelayResult<[u8; 32]> {
        transaction_hash(&self.tx, network_id)
    }

    /// Install simulated resources and the fee covering them.
    pub(crate) fn apply_soroban_data(
        &mut self,
        data: SorobanTransactionData,
        total_fee: u32,
        auth: Vec<SorobanAuthorizationEntry>,
    ) -> RelayResult<()> {
        if !auth.is_empty() {
            let mut operations = self.tx.operations.to_vec();
            let op = operations
                .first_mut()
                .ok_or_else(|| RelayError::InvalidInput("Envelope has no operation".to_string()))?;
            if let OperationBody::InvokeHostFunction(invoke) = &mut op.body {
                if invoke.auth.is_empty() {
                    invoke.auth = auth.try_into().map_err(|e| {
                        RelayError::Encoding(format!("Too many auth entries: {}", e))
                    })?;
                }
            }
            self.tx.operations = operations
                .try_into()
                .map_err(|e| RelayError::Encoding(format!("Operation list: {}", e)))?;
        }
        self.tx.ext = TransactionExt::V1(data);
        self.tx.fee = total_fee;
        Ok(())
    }

    pub(crate) fn into_transaction(self) -> Transaction {
        self.tx
    }
}

/// A signed envelope. The transaction body is fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedEnvelope {
    envelope: TransactionV1Envelope,
}

impl SignedEnvelope {
    pub(crate) fn new(tx: Transaction, signature: DecoratedSignature) -> RelayResult<Self> {
        Ok(Self {
            envelope: TransactionV1Envelope {
                tx,
                signatures: vec![signature]
                    .try_into()
                    .map_err(|e| RelayError::Encoding(format!("Signature list: {}", e)))?,
            },
        })
    }

    pub fn transaction(&self) -> &Transaction {
        &self.envelope.tx
    }

    pub fn signatures(&self) -> &[DecoratedSignature] {
        self.envelope.signatures.as_slice()
    }

    /// The sponsor's address.
    pub fn source_address(&self) -> String {
        muxed_to_string(&self.envelope.tx.source_account)
    }

    pub fn sequence_number(&self) -> i64 {
        self.envelope.tx.seq_num.0
    }

    pub fn fee(&self) -> u32 {
        self.envelope.tx.fee
    }

    pub fn resource_fee(&self) -> Option<i64> {
        resource_fee_of(&self.envelope.tx)
    }

    pub fn operation(&self) -> RelayResult<OperationSpec> {
        OperationSpec::from_operation(single_operation(&self.envelope.tx)?)
    }

    /// Network-scoped transaction hash; the reconciliation key.
    pub fn hash(&self, network_id: &NetworkId) -> RelayResult<[u8; 32]> {
        transaction_hash(&self.envelope.tx, network_id)
    }

    pub fn hash_hex(&self, network_id: &NetworkId) -> RelayResult<String> {
        Ok(hex::encode(self.hash(network_id)?))
    }

    pub fn to_xdr_base64(&self) -> RelayResult<String> {
        encode_xdr(&TransactionEnvelope::Tx(self.envelope.clone()))
    }

    /// Decode a signed envelope. Only plain v1 envelopes with exactly one
    /// operation are accepted.
    pub fn from_xdr_base64(encoded: &str) -> RelayResult<Self> {
        match decode_xdr::<TransactionEnvelope>(encoded)? {
            TransactionEnvelope::Tx(envelope) => {
                single_operation(&envelope.tx)?;
                Ok(Self { envelope })
            }
            _ => Err(RelayError::DecodeError(
                "Expected a v1 transaction envelope".to_string(),
            )),
        }
    }
}

/// Assembles unsigned, sponsor-sourced envelopes.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    base_fee: u32,
    validity: Duration,
    asset_policy: AssetPolicy,
}

impl EnvelopeBuilder {
    pub fn new(config: &EnvelopeConfig) -> Self {
        Self {
            base_fee: config.base_fee,
            validity: Duration::from_secs(config.validity_secs),
            asset_policy: config.asset_policy,
        }
    }

    /// Build a payment of `amount` from `from` to `to`, fee-paid by `sponsor`.
    pub fn build_payment(
        &self,
        sponsor: &AccountState,
        from: &str,
        to: &str,
        amount: &str,
        asset_code: Option<&str>,
        asset_issuer: Option<&str>,
    ) -> RelayResult<UnsignedEnvelope> {
        let spec = OperationSpec::Payment {
            source: from.to_string(),
            destination: to.to_string(),
            asset: AssetSpec::resolve(asset_code, asset_issuer, self.asset_policy)?,
            amount: parse_amount(amount)?,
        };
        self.assemble(sponsor, &spec)
    }

    /// Build an unsimulated contract invocation sourced from
    /// `operation_source`, fee-paid by `sponsor`.
    pub fn build_invocation(
        &self,
        sponsor: &AccountState,
        contract_id: &str,
        function_name: &str,
        args: Vec<ScVal>,
        operation_source: &str,
    ) -> RelayResult<UnsignedEnvelope> {
        let spec = OperationSpec::Invoke {
            source: operation_source.to_string(),
            contract_id: contract_id.to_string(),
            function_name: function_name.to_string(),
            args,
        };
        self.assemble(sponsor, &spec)
    }

    fn assemble(&self, sponsor: &AccountState, spec: &OperationSpec) -> RelayResult<UnsignedEnvelope> {
        let sequence = sponsor
            .sequence_number
            .checked_add(1)
            .ok_or_else(|| RelayError::InvalidInput("Sponsor sequence number exhausted".to_string()))?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let valid_until = (now + self.validity).as_secs();

        let tx = Transaction {
            source_account: muxed_account(&sponsor.address)?,
            fee: self.base_fee,
            seq_num: SequenceNumber(sequence),
            cond: Preconditions::Time(TimeBounds {
                min_time: TimePoint(0),
                max_time: TimePoint(valid_until),
            }),
            memo: Memo::None,
            operations: vec![spec.to_operation()?]
                .try_into()
                .map_err(|e| RelayError::Encoding(format!("Operation list: {}", e)))?,
            ext: TransactionExt::V0,
        };

        tracing::debug!(
            sponsor = %sponsor.address,
            operation_source = spec.source(),
            operation = spec.kind(),
            sequence = sequence,
            valid_until = valid_until,
            "Envelope assembled"
        );

        Ok(UnsignedEnvelope {
            tx,
            base_fee: self.base_fee,
        })
    }
}
