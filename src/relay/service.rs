//! Sponsored relay service.

use std::sync::Arc;

use stellar_xdr::curr::ScVal;
use tokio::sync::{Mutex, MutexGuard};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::schema::{PollingConfig, RelayConfig};
use crate::ledger::args::{to_sc_vals, ContractArg};
use crate::ledger::balance::select_balance;
use crate::ledger::client::LedgerGateway;
use crate::ledger::confirm::{Confirmation, ConfirmationPoller, Sleeper, TokioSleeper};
use crate::ledger::decode::DecodedValue;
use crate::ledger::envelope::{EnvelopeBuilder, SignedEnvelope, UnsignedEnvelope};
use crate::ledger::sequencer::AccountSequencer;
use crate::ledger::signer::sign;
use crate::ledger::simulate::InvocationSimulator;
use crate::ledger::types::{NetworkId, RelayResult};
use crate::ledger::wallet::SponsorKey;
use crate::lifecycle::shutdown::CancelToken;

/// Fee-sponsored transaction relay.
///
/// Owns the sponsor key for its whole lifetime and talks to the network only
/// through `G`.
pub struct SponsoredRelay<G: ?Sized> {
    sponsor: Arc<SponsorKey>,
    network_id: NetworkId,
    sequencer: AccountSequencer<G>,
    builder: EnvelopeBuilder,
    simulator: InvocationSimulator<G>,
    poller: ConfirmationPoller<G>,
    gateway: Arc<G>,
    polling: PollingConfig,
    /// Serializes load → submit → confirm when enabled.
    gate: Option<Mutex<()>>,
}

impl<G: LedgerGateway + ?Sized> SponsoredRelay<G> {
    pub fn new(config: &RelayConfig, sponsor: SponsorKey, gateway: Arc<G>) -> Self {
        let network_id = NetworkId::from_passphrase(&config.network.passphrase);
        let sponsor = Arc::new(sponsor);

        tracing::info!(
            sponsor = sponsor.address(),
            network = %config.network.passphrase,
            single_flight = config.relay.single_flight,
            "Relay initialized"
        );

        Self {
            sequencer: AccountSequencer::new(gateway.clone(), sponsor.address(), &config.retries),
            builder: EnvelopeBuilder::new(&config.envelope),
            simulator: InvocationSimulator::new(gateway.clone()),
            poller: ConfirmationPoller::with_sleeper(
                gateway.clone(),
                network_id,
                &config.polling,
                Arc::new(TokioSleeper),
            ),
            gateway,
            polling: config.polling.clone(),
            gate: config.relay.single_flight.then(|| Mutex::new(())),
            sponsor,
            network_id,
        }
    }

    /// Replace the wait between status queries.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.poller =
            ConfirmationPoller::with_sleeper(self.gateway.clone(), self.network_id, &self.polling, sleeper);
        self
    }

    pub fn sponsor_address(&self) -> &str {
        self.sponsor.address()
    }

    pub fn network_id(&self) -> &NetworkId {
        &self.network_id
    }

    /// Build and sign a native-asset payment from `from` to `to`.
    pub async fn build_native_payment(&self, from: &str, to: &str, amount: &str) -> RelayResult<SignedEnvelope> {
        self.build_sponsored_payment(from, to, amount, None, None).await
    }

    /// Build and sign a payment in the requested asset.
    pub async fn build_sponsored_payment(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        asset_code: Option<&str>,
        asset_issuer: Option<&str>,
    ) -> RelayResult<SignedEnvelope> {
        self.prepare_payment(from, to, amount, asset_code, asset_issuer)
            .instrument(request_span("build_payment"))
            .await
    }

    /// Build, simulate, assemble and sign a contract invocation sourced from
    /// `operation_source`.
    pub async fn build_contract_invocation(
        &self,
        contract_id: &str,
        function_name: &str,
        args: &[ContractArg],
        operation_source: &str,
    ) -> RelayResult<SignedEnvelope> {
        let args = to_sc_vals(args)?;
        self.prepare_invocation(contract_id, function_name, args, operation_source)
            .instrument(request_span("build_invocation"))
            .await
    }

    /// Simulate a call and decode its return value without signing or
    /// submitting anything.
    pub async fn simulate_read_only_call(
        &self,
        contract_id: &str,
        function_name: &str,
        args: &[ContractArg],
    ) -> RelayResult<Option<DecodedValue>> {
        let args = to_sc_vals(args)?;
        async {
            let sponsor = self.sequencer.load_sponsor_account().await?;
            self.simulator
                .simulate_read_only(&self.builder, &sponsor, contract_id, function_name, args)
                .await
        }
        .instrument(request_span("simulate_read_only"))
        .await
    }

    /// Submit a signed envelope and wait for a terminal status.
    pub async fn submit_and_confirm(
        &self,
        envelope: &SignedEnvelope,
        cancel: CancelToken,
    ) -> RelayResult<Confirmation> {
        self.poller
            .submit_and_confirm(envelope, cancel)
            .instrument(request_span("submit_and_confirm"))
            .await
    }

    /// Current balance of `address` in the given asset, or `"0"`.
    pub async fn get_account_balance(
        &self,
        address: &str,
        asset_code: &str,
        issuer: Option<&str>,
    ) -> RelayResult<String> {
        async {
            let account = self.sequencer.load_account(address).await?;
            Ok(select_balance(&account, asset_code, issuer))
        }
        .instrument(request_span("get_account_balance"))
        .await
    }

    /// Build, sign, submit and confirm a payment under the single-flight gate.
    pub async fn pay_and_confirm(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        asset_code: Option<&str>,
        asset_issuer: Option<&str>,
        cancel: CancelToken,
    ) -> RelayResult<Confirmation> {
        async {
            let _guard = self.enter_gate().await;
            let envelope = self
                .prepare_payment(from, to, amount, asset_code, asset_issuer)
                .await?;
            self.poller.submit_and_confirm(&envelope, cancel).await
        }
        .instrument(request_span("pay_and_confirm"))
        .await
    }

    /// Build, simulate, sign, submit and confirm an invocation under the
    /// single-flight gate.
    pub async fn invoke_and_confirm(
        &self,
        contract_id: &str,
        function_name: &str,
        args: &[ContractArg],
        operation_source: &str,
        cancel: CancelToken,
    ) -> RelayResult<Confirmation> {
        let args = to_sc_vals(args)?;
        async {
            let _guard = self.enter_gate().await;
            let envelope = self
                .prepare_invocation(contract_id, function_name, args, operation_source)
                .await?;
            self.poller.submit_and_confirm(&envelope, cancel).await
        }
        .instrument(request_span("invoke_and_confirm"))
        .await
    }

    async fn enter_gate(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        }
    }

    async fn prepare_payment(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        asset_code: Option<&str>,
        asset_issuer: Option<&str>,
    ) -> RelayResult<SignedEnvelope> {
        let sponsor = self.sequencer.load_sponsor_account().await?;
        let envelope = self
            .builder
            .build_payment(&sponsor, from, to, amount, asset_code, asset_issuer)?;
        self.sign(envelope)
    }

    async fn prepare_invocation(
        &self,
        contract_id: &str,
        function_name: &str,
        args: Vec<ScVal>,
        operation_source: &str,
    ) -> RelayResult<SignedEnvelope> {
        let sponsor = self.sequencer.load_sponsor_account().await?;
        let envelope =
            self.builder
                .build_invocation(&sponsor, contract_id, function_name, args, operation_source)?;
        let simulation = self.simulator.simulate_success(&envelope).await?;
        let assembled = self.simulator.assemble(envelope, simulation)?;
        self.sign(assembled)
    }

    fn sign(&self, envelope: UnsignedEnvelope) -> RelayResult<SignedEnvelope> {
        sign(envelope, &self.sponsor, &self.network_id)
    }
}

fn request_span(operation: &'static str) -> tracing::Span {
    tracing::info_span!("relay", request_id = %Uuid::new_v4(), operation = operation)
}
