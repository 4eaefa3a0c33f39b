//! Dry-run simulation of contract invocations.
//!
//! # Data Flow
//! ```text
//! UnsignedEnvelope ──► simulate ──► SimulationSuccess ──► assemble ──► UnsignedEnvelope
//!                          │                                          (footprint, auth,
//!                          └──► Failure ──► SimulationFailed           fee = base + min)
//! ```
//!
//! A failed simulation stops the pipeline before anything is signed.

use std::sync::Arc;

use stellar_xdr::curr::ScVal;

use crate::ledger::client::LedgerGateway;
use crate::ledger::decode::{decode, DecodedValue};
use crate::ledger::envelope::{EnvelopeBuilder, UnsignedEnvelope};
use crate::ledger::types::{AccountState, RelayError, RelayResult, SimulationResult, SimulationSuccess};
use crate::observability::metrics::record_simulation;

/// Runs dry runs through the gateway and merges their results.
pub struct InvocationSimulator<G: ?Sized> {
    gateway: Arc<G>,
}

impl<G: LedgerGateway + ?Sized> InvocationSimulator<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    /// Dry-run an unsigned envelope.
    pub async fn simulate(&self, envelope: &UnsignedEnvelope) -> RelayResult<SimulationResult> {
        let encoded = envelope.to_xdr_base64()?;
        let result = self.gateway.simulate(&encoded).await;

        let outcome = match &result {
            Ok(SimulationResult::Success(_)) => "success",
            Ok(SimulationResult::Failure { .. }) | Err(RelayError::SimulationFailed { .. }) => "failure",
            Err(_) => "error",
        };
        record_simulation(outcome);
        result
    }

    /// Dry-run and require success.
    pub async fn simulate_success(&self, envelope: &UnsignedEnvelope) -> RelayResult<SimulationSuccess> {
        match self.simulate(envelope).await? {
            SimulationResult::Success(success) => {
                tracing::debug!(
                    min_resource_fee = success.min_resource_fee,
                    auth_entries = success.auth_entries.len(),
                    latest_ledger = success.latest_ledger,
                    "Simulation succeeded"
                );
                Ok(success)
            }
            SimulationResult::Failure { message } => {
                tracing::warn!(reason = %message, "Simulation failed");
                Err(RelayError::SimulationFailed { reason: message })
            }
        }
    }

    /// Merge a successful simulation into the envelope.
    pub fn assemble(
        &self,
        envelope: UnsignedEnvelope,
        simulation: SimulationSuccess,
    ) -> RelayResult<UnsignedEnvelope> {
        assemble(envelope, simulation)
    }

    /// Simulate a call without ever signing or submitting it.
    ///
    /// The throwaway envelope is sourced from `sponsor` at both levels. `None`
    /// means the simulation carried no return value at all.
    pub async fn simulate_read_only(
        &self,
        builder: &EnvelopeBuilder,
        sponsor: &AccountState,
        contract_id: &str,
        function_name: &str,
        args: Vec<ScVal>,
    ) -> RelayResult<Option<DecodedValue>> {
        let envelope = builder.build_invocation(sponsor, contract_id, function_name, args, &sponsor.address)?;
        let success = self.simulate_success(&envelope).await?;
        success.return_value.as_ref().map(decode).transpose()
    }
}

/// Install simulated resources: `ext = V1(data)` with the resource fee set
/// to the simulated minimum, the total fee raised to base + minimum, and the
/// simulated auth entries when the operation has none.
pub fn assemble(mut envelope: UnsignedEnvelope, simulation: SimulationSuccess) -> RelayResult<UnsignedEnvelope> {
    if simulation.min_resource_fee < 0 {
        return Err(RelayError::InvalidInput(format!(
            "Negative resource fee {}",
            simulation.min_resource_fee
        )));
    }

    let total = i64::from(envelope.base_fee()) + simulation.min_resource_fee;
    let total_fee = u32::try_from(total).map_err(|_| {
        RelayError::InvalidInput(format!("Total fee {} exceeds the maximum fee bid", total))
    })?;

    let mut data = simulation.transaction_data;
    data.resource_fee = simulation.min_resource_fee;

    envelope.apply_soroban_data(data, total_fee, simulation.auth_entries)?;
    tracing::debug!(
        fee = total_fee,
        resource_fee = simulation.min_resource_fee,
        "Simulation assembled into envelope"
    );
    Ok(envelope)
}
