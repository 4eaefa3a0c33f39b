//! End-to-end pipeline tests over an in-memory ledger.

use stellar_xdr::curr::ScVal;

use sponsored_relay::config::schema::AssetPolicy;
use sponsored_relay::ledger::args::ContractArg;
use sponsored_relay::ledger::envelope::{AssetSpec, OperationSpec};
use sponsored_relay::ledger::types::{AccountState, AssetBalance, LedgerOutcome, SubmitStatus, TransactionStatus};
use sponsored_relay::ledger::wallet::verify_signature;
use sponsored_relay::ledger::{DecodedValue, RelayError, SignedEnvelope};
use sponsored_relay::lifecycle::{CancelToken, Shutdown};

mod common;
use common::*;

#[tokio::test]
async fn test_native_payment_sources_and_signature() {
    let ledger = MockLedger::new().into_arc();
    let relay = relay_over(ledger.clone(), &test_config());
    let (from, to) = (account(1), account(2));

    let envelope = relay.build_native_payment(&from, &to, "12.5").await.unwrap();

    assert_eq!(envelope.source_address(), sponsor_key().address());
    assert_eq!(envelope.sequence_number(), STARTING_SEQUENCE + 1);
    match OperationSpec::from_envelope(&envelope).unwrap() {
        OperationSpec::Payment {
            source,
            destination,
            asset,
            amount,
        } => {
            assert_eq!(source, from);
            assert_eq!(destination, to);
            assert_eq!(asset, AssetSpec::Native);
            assert_eq!(amount, 125_000_000);
        }
        other => panic!("unexpected operation {:?}", other),
    }

    assert_eq!(envelope.signatures().len(), 1);
    let hash = envelope.hash(relay.network_id()).unwrap();
    assert!(verify_signature(
        &sponsor_key().public_key(),
        &hash,
        &envelope.signatures()[0]
    ));
    assert_eq!(ledger.submissions(), 0);
}

#[tokio::test]
async fn test_failing_simulation_submits_nothing() {
    let ledger = MockLedger::new()
        .with_simulation(sponsored_relay::ledger::SimulationResult::Failure {
            message: "HostError: Error(WasmVm, InvalidAction)".into(),
        })
        .into_arc();
    let relay = relay_over(ledger.clone(), &test_config());

    let err = relay
        .invoke_and_confirm(&contract(3), "increment", &[], &account(1), CancelToken::never())
        .await
        .unwrap_err();

    match err {
        RelayError::SimulationFailed { reason } => {
            assert_eq!(reason, "HostError: Error(WasmVm, InvalidAction)")
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(ledger.simulations(), 1);
    assert_eq!(ledger.submissions(), 0);
    assert_eq!(ledger.status_queries(), 0);
}

#[tokio::test]
async fn test_simulated_invocation_fees() {
    let ledger = MockLedger::new()
        .with_simulation(simulation_success(48_000, None))
        .into_arc();
    let config = test_config();
    let relay = relay_over(ledger.clone(), &config);

    let envelope = relay
        .build_contract_invocation(&contract(3), "increment", &[ContractArg::U32(2)], &account(1))
        .await
        .unwrap();

    let resource_fee = envelope.resource_fee().unwrap();
    assert!(resource_fee >= 48_000);
    assert!(i64::from(envelope.fee()) >= i64::from(config.envelope.base_fee) + 48_000);

    // Outer envelope sponsored, invocation sourced from the acting party.
    assert_eq!(envelope.source_address(), sponsor_key().address());
    assert_eq!(OperationSpec::from_envelope(&envelope).unwrap().source(), account(1));
}

#[tokio::test]
async fn test_invocation_return_value() {
    let ledger = MockLedger::new()
        .with_statuses(vec![
            TransactionStatus::Pending,
            TransactionStatus::Success(LedgerOutcome {
                ledger: 321,
                close_time: 1_700_000_100,
                result_xdr: None,
                result_meta_xdr: Some(meta_with_return(ScVal::U32(5))),
            }),
        ])
        .into_arc();
    let relay = relay_over(ledger.clone(), &test_config());

    let confirmation = relay
        .invoke_and_confirm(
            &contract(3),
            "increment",
            &[ContractArg::U32(4)],
            &account(1),
            CancelToken::never(),
        )
        .await
        .unwrap();

    assert_eq!(confirmation.ledger, 321);
    assert_eq!(confirmation.return_value, Some(DecodedValue::Int(5)));
    assert_eq!(ledger.status_queries(), 2);

    let submitted = ledger.submitted_envelopes();
    assert_eq!(submitted.len(), 1);
    assert_eq!(confirmation.hash, submitted[0].hash_hex(relay.network_id()).unwrap());
}

#[tokio::test]
async fn test_unreadable_meta_still_confirms_once() {
    let ledger = MockLedger::new()
        .with_statuses(vec![TransactionStatus::Success(LedgerOutcome {
            ledger: 400,
            close_time: 1_700_000_200,
            result_xdr: None,
            result_meta_xdr: Some("AAAAAQAAAAA=".into()),
        })])
        .into_arc();
    let relay = relay_over(ledger.clone(), &test_config());

    let confirmation = relay
        .pay_and_confirm(&account(1), &account(2), "3", None, None, CancelToken::never())
        .await
        .unwrap();

    assert_eq!(confirmation.ledger, 400);
    assert_eq!(confirmation.return_value, None);
    assert!(confirmation.return_value_error.is_some());
    assert_eq!(ledger.submissions(), 1);

    let submitted = ledger.submitted_envelopes();
    assert_eq!(confirmation.hash, submitted[0].hash_hex(relay.network_id()).unwrap());
}

#[tokio::test]
async fn test_balance_aliases_and_absent_asset() {
    let holder = AccountState {
        address: account(5),
        sequence_number: 1,
        balances: vec![
            AssetBalance {
                code: None,
                issuer: None,
                balance: "250.0000000".into(),
            },
            AssetBalance {
                code: Some("USDC".into()),
                issuer: Some(account(9)),
                balance: "17.2500000".into(),
            },
        ],
    };
    let ledger = MockLedger::new().with_account(holder).into_arc();
    let relay = relay_over(ledger.clone(), &test_config());

    let native = relay.get_account_balance(&account(5), "native", None).await.unwrap();
    let xlm = relay.get_account_balance(&account(5), "XLM", None).await.unwrap();
    assert_eq!(native, "250.0000000");
    assert_eq!(native, xlm);

    let usdc = relay
        .get_account_balance(&account(5), "USDC", Some(account(9).as_str()))
        .await
        .unwrap();
    assert_eq!(usdc, "17.2500000");

    let absent = relay.get_account_balance(&account(5), "EURC", None).await.unwrap();
    assert_eq!(absent, "0");

    let missing = relay.get_account_balance(&account(6), "native", None).await.unwrap_err();
    assert!(matches!(missing, RelayError::AccountNotFound(_)));
}

#[tokio::test]
async fn test_not_found_then_success_polls_twice() {
    let ledger = MockLedger::new()
        .with_statuses(vec![TransactionStatus::NotFound, success_status(77)])
        .into_arc();
    let relay = relay_over(ledger.clone(), &test_config());

    let envelope = relay.build_native_payment(&account(1), &account(2), "1").await.unwrap();
    let confirmation = relay
        .submit_and_confirm(&envelope, CancelToken::never())
        .await
        .unwrap();

    assert_eq!(confirmation.ledger, 77);
    assert_eq!(confirmation.return_value, None);
    assert_eq!(ledger.status_queries(), 2);
}

#[tokio::test]
async fn test_rejected_submission_never_polls() {
    let ledger = MockLedger::new()
        .with_submit_status(SubmitStatus::Rejected)
        .into_arc();
    let relay = relay_over(ledger.clone(), &test_config());

    let envelope = relay.build_native_payment(&account(1), &account(2), "1").await.unwrap();
    let err = relay
        .submit_and_confirm(&envelope, CancelToken::never())
        .await
        .unwrap_err();

    let expected_hash = envelope.hash_hex(relay.network_id()).unwrap();
    assert!(matches!(
        err,
        RelayError::SubmissionRejected { ref hash, .. } if *hash == expected_hash
    ));
    assert_eq!(ledger.submissions(), 1);
    assert_eq!(ledger.status_queries(), 0);
}

#[tokio::test]
async fn test_failed_transaction_stops_polling() {
    let ledger = MockLedger::new()
        .with_statuses(vec![failed_status("AAAAAAAAAGT////2AAAAAA=="), success_status(5)])
        .into_arc();
    let relay = relay_over(ledger.clone(), &test_config());

    let err = relay
        .pay_and_confirm(&account(1), &account(2), "3", None, None, CancelToken::never())
        .await
        .unwrap_err();

    match err {
        RelayError::OnChainFailure { hash, result_xdr } => {
            assert_eq!(hash.len(), 64);
            assert_eq!(result_xdr.as_deref(), Some("AAAAAAAAAGT////2AAAAAA=="));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(ledger.status_queries(), 1);
}

#[tokio::test]
async fn test_confirmation_timeout_reports_hash() {
    let ledger = MockLedger::new()
        .with_default_status(TransactionStatus::NotFound)
        .into_arc();
    let config = test_config();
    let relay = relay_over(ledger.clone(), &config);

    let err = relay
        .pay_and_confirm(&account(1), &account(2), "3", None, None, CancelToken::never())
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::ConfirmationTimeout { attempts, .. } if attempts == config.polling.max_attempts));
    assert!(err.hash().is_some());
    assert_eq!(ledger.status_queries(), config.polling.max_attempts);
}

#[tokio::test]
async fn test_cancelled_confirmation_keeps_hash() {
    let ledger = MockLedger::new()
        .with_default_status(TransactionStatus::NotFound)
        .into_arc();
    let relay = relay_over(ledger.clone(), &test_config());
    let shutdown = Shutdown::new();
    let token = shutdown.token();
    shutdown.trigger();

    let err = relay
        .pay_and_confirm(&account(1), &account(2), "3", None, None, token)
        .await
        .unwrap_err();

    assert!(matches!(err, RelayError::Cancelled { .. }));
    assert_eq!(err.hash().map(str::len), Some(64));
    assert_eq!(ledger.submissions(), 1);
}

#[tokio::test]
async fn test_envelope_xdr_round_trip() {
    let ledger = MockLedger::new().into_arc();
    let relay = relay_over(ledger.clone(), &test_config());
    let args = vec![
        ContractArg::Address(account(4)),
        ContractArg::I128("-170141183460469231731687303715884105728".into()),
        ContractArg::Symbol("transfer".into()),
    ];

    let envelope = relay
        .build_contract_invocation(&contract(3), "transfer", &args, &account(1))
        .await
        .unwrap();
    let decoded = SignedEnvelope::from_xdr_base64(&envelope.to_xdr_base64().unwrap()).unwrap();

    assert_eq!(decoded, envelope);
    assert_eq!(decoded.source_address(), sponsor_key().address());
    match OperationSpec::from_envelope(&decoded).unwrap() {
        OperationSpec::Invoke {
            source,
            contract_id,
            function_name,
            args: decoded_args,
        } => {
            assert_eq!(source, account(1));
            assert_eq!(contract_id, contract(3));
            assert_eq!(function_name, "transfer");
            let expected: Vec<ScVal> = args.iter().map(|a| a.to_sc_val().unwrap()).collect();
            assert_eq!(decoded_args, expected);
        }
        other => panic!("unexpected operation {:?}", other),
    }

    let payment = relay
        .build_sponsored_payment(&account(1), &account(2), "0.0000001", Some("USDC"), Some(account(9).as_str()))
        .await
        .unwrap();
    let decoded = SignedEnvelope::from_xdr_base64(&payment.to_xdr_base64().unwrap()).unwrap();
    match OperationSpec::from_envelope(&decoded).unwrap() {
        OperationSpec::Payment { amount, asset, .. } => {
            assert_eq!(amount, 1);
            assert_eq!(
                asset,
                AssetSpec::Issued {
                    code: "USDC".into(),
                    issuer: account(9)
                }
            );
        }
        other => panic!("unexpected operation {:?}", other),
    }
}

#[tokio::test]
async fn test_read_only_call_never_submits() {
    let ledger = MockLedger::new()
        .with_simulation(simulation_success(10, Some(ScVal::U64(u64::MAX))))
        .into_arc();
    let relay = relay_over(ledger.clone(), &test_config());

    let value = relay
        .simulate_read_only_call(&contract(3), "get_total", &[])
        .await
        .unwrap();

    assert_eq!(value, Some(DecodedValue::BigInt(u64::MAX.to_string())));
    assert_eq!(ledger.simulations(), 1);
    assert_eq!(ledger.submissions(), 0);
    assert_eq!(ledger.status_queries(), 0);
}

#[tokio::test]
async fn test_strict_asset_policy_refuses_missing_issuer() {
    let ledger = MockLedger::new().into_arc();
    let mut config = test_config();
    config.envelope.asset_policy = AssetPolicy::Strict;
    let relay = relay_over(ledger.clone(), &config);

    let err = relay
        .build_sponsored_payment(&account(1), &account(2), "1", Some("USDC"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::InvalidInput(_)));

    let fallback = relay_over(ledger.clone(), &test_config())
        .build_sponsored_payment(&account(1), &account(2), "1", Some("USDC"), None)
        .await
        .unwrap();
    assert!(matches!(
        OperationSpec::from_envelope(&fallback).unwrap(),
        OperationSpec::Payment { asset: AssetSpec::Native, .. }
    ));
}

#[tokio::test]
async fn test_single_flight_serializes_sequence_use() {
    let ledger = MockLedger::new().into_arc();
    let relay = relay_over(ledger.clone(), &test_config());

    let (first, second, third, fourth) = (account(1), account(2), account(3), account(4));
    let (a, b) = tokio::join!(
        relay.pay_and_confirm(&first, &second, "1", None, None, CancelToken::never()),
        relay.pay_and_confirm(&third, &fourth, "1", None, None, CancelToken::never()),
    );
    assert!(a.is_ok());
    assert!(b.is_ok());

    let sequences: Vec<i64> = ledger
        .submitted_envelopes()
        .iter()
        .map(|e| e.sequence_number())
        .collect();
    assert_eq!(sequences, vec![STARTING_SEQUENCE + 1, STARTING_SEQUENCE + 2]);
}

#[tokio::test]
async fn test_without_gate_sequences_collide() {
    let ledger = MockLedger::new().into_arc();
    let mut config = test_config();
    config.relay.single_flight = false;
    let relay = relay_over(ledger.clone(), &config);

    let (first, second, third, fourth) = (account(1), account(2), account(3), account(4));
    let (a, b) = tokio::join!(
        relay.pay_and_confirm(&first, &second, "1", None, None, CancelToken::never()),
        relay.pay_and_confirm(&third, &fourth, "1", None, None, CancelToken::never()),
    );

    let rejected = [a, b]
        .into_iter()
        .filter(|r| matches!(r, Err(RelayError::SubmissionRejected { .. })))
        .count();
    assert_eq!(rejected, 1);
}
