//! End-to-end payment engine scenarios against a real database.
//!
//! Each test skips when PostgreSQL is unavailable.

mod common;

use common::*;
use payment_processing_service::error::AppError;
use payment_processing_service::ledger;
use payment_processing_service::money::{Currency, Money};
use payment_processing_service::payment::{
    InternalTransferRequest, TransactionStatus, TransactionType,
};

fn internal_request(
    from: &UserFixture,
    to: &UserFixture,
    to_currency: Currency,
    to_minor: i64,
    key: String,
) -> InternalTransferRequest {
    InternalTransferRequest {
        from_user_id: from.user_id.clone(),
        to_account_number: to.account_number(to_currency).to_string(),
        to_bank_code: to.bank_code.clone(),
        from_currency: Currency::Usd,
        to_amount: Money::new(to_minor, to_currency),
        idempotency_key: key,
        trace_id: Some("trace-test".to_string()),
    }
}

#[tokio::test]
async fn same_user_fx_transfer_completes_immediately() {
    let Some(pool) = test_pool().await else {
        eprintln!("skipping test - database not available");
        return;
    };
    let engine = engine(&pool);

    // USD 100.00, empty EUR wallet.
    let user = seed_user(&pool, &[(Currency::Usd, 10_000)]).await;

    // EUR 42.50 at USD->EUR 0.85 costs USD 50.00.
    let txn = engine
        .create_internal_transfer(internal_request(
            &user,
            &user,
            Currency::Eur,
            4_250,
            unique_key("k1"),
        ))
        .await
        .expect("immediate transfer");

    assert_eq!(txn.status, TransactionStatus::Completed);
    assert_eq!(txn.tx_type, TransactionType::Internal);
    assert_eq!(txn.amount, 4_250);
    assert_eq!(txn.exchange_rate.as_deref(), Some("0.85000000"));

    assert_eq!(wallet_balance(&pool, user.wallet_id(Currency::Usd)).await, 5_000);
    assert_eq!(wallet_balance(&pool, user.wallet_id(Currency::Eur)).await, 4_250);
    assert_balance_invariant(&pool, user.wallet_id(Currency::Usd)).await;
    assert_balance_invariant(&pool, user.wallet_id(Currency::Eur)).await;

    let mut conn = pool.acquire().await.unwrap();
    let entries = ledger::entries_for_transaction(&mut conn, &txn.id)
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);

    let debit = entries.iter().find(|e| e.amount < 0).unwrap();
    let credit = entries.iter().find(|e| e.amount > 0).unwrap();
    assert_eq!(debit.amount, -5_000);
    assert_eq!(debit.currency, "USD");
    assert_eq!(credit.amount, 4_250);
    assert_eq!(credit.currency, "EUR");
}

#[tokio::test]
async fn cross_user_transfer_requires_confirmation() {
    let Some(pool) = test_pool().await else {
        eprintln!("skipping test - database not available");
        return;
    };
    let engine = engine(&pool);

    let sender = seed_user(&pool, &[(Currency::Usd, 10_000)]).await;
    let recipient = seed_user(&pool, &[]).await;

    let txn = engine
        .create_internal_transfer(internal_request(
            &sender,
            &recipient,
            Currency::Eur,
            4_250,
            unique_key("k2"),
        ))
        .await
        .expect("two-phase create");

    assert_eq!(txn.status, TransactionStatus::Initiated);

    // No balance movement before confirmation.
    assert_eq!(wallet_balance(&pool, sender.wallet_id(Currency::Usd)).await, 10_000);
    assert_eq!(wallet_balance(&pool, recipient.wallet_id(Currency::Eur)).await, 0);

    let confirmed = engine
        .confirm_transaction(&txn.id, &sender.user_id, "1234")
        .await
        .expect("confirm");

    assert_eq!(confirmed.status, TransactionStatus::Completed);
    assert_eq!(wallet_balance(&pool, sender.wallet_id(Currency::Usd)).await, 5_000);
    assert_eq!(
        wallet_balance(&pool, recipient.wallet_id(Currency::Eur)).await,
        4_250
    );
    assert_balance_invariant(&pool, sender.wallet_id(Currency::Usd)).await;
    assert_balance_invariant(&pool, recipient.wallet_id(Currency::Eur)).await;
}

#[tokio::test]
async fn idempotent_create_returns_same_transaction() {
    let Some(pool) = test_pool().await else {
        eprintln!("skipping test - database not available");
        return;
    };
    let engine = engine(&pool);

    let user = seed_user(&pool, &[(Currency::Usd, 10_000)]).await;
    let key = unique_key("k4");

    let first = engine
        .create_internal_transfer(internal_request(
            &user,
            &user,
            Currency::Eur,
            4_250,
            key.clone(),
        ))
        .await
        .expect("first create");

    let second = engine
        .create_internal_transfer(internal_request(
            &user,
            &user,
            Currency::Eur,
            4_250,
            key.clone(),
        ))
        .await
        .expect("retried create");

    assert_eq!(first.id, second.id);

    let row_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM transactions_tb WHERE idempotency_key = $1")
            .bind(&key)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(row_count, 1);

    // Balances reflect exactly one movement.
    assert_eq!(wallet_balance(&pool, user.wallet_id(Currency::Usd)).await, 5_000);
    assert_eq!(wallet_balance(&pool, user.wallet_id(Currency::Eur)).await, 4_250);
}

#[tokio::test]
async fn concurrent_confirms_cannot_overdraw() {
    let Some(pool) = test_pool().await else {
        eprintln!("skipping test - database not available");
        return;
    };
    let engine = std::sync::Arc::new(engine(&pool));

    let sender = seed_user(&pool, &[(Currency::Usd, 10_000)]).await;
    let recipient = seed_user(&pool, &[]).await;

    // Each transfer drains USD 70.00 of a USD 100.00 balance:
    // EUR 59.50 at 0.85 -> source 7000.
    let first = engine
        .create_internal_transfer(internal_request(
            &sender,
            &recipient,
            Currency::Eur,
            5_950,
            unique_key("race-a"),
        ))
        .await
        .expect("create first");
    let second = engine
        .create_internal_transfer(internal_request(
            &sender,
            &recipient,
            Currency::Eur,
            5_950,
            unique_key("race-b"),
        ))
        .await
        .expect("create second");

    let engine_a = engine.clone();
    let sender_id = sender.user_id.clone();
    let first_id = first.id.clone();
    let task_a =
        tokio::spawn(async move { engine_a.confirm_transaction(&first_id, &sender_id, "1234").await });

    let engine_b = engine.clone();
    let sender_id = sender.user_id.clone();
    let second_id = second.id.clone();
    let task_b =
        tokio::spawn(async move { engine_b.confirm_transaction(&second_id, &sender_id, "1234").await });

    let result_a = task_a.await.unwrap();
    let result_b = task_b.await.unwrap();

    let successes = [&result_a, &result_b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one confirmation may win");

    let failure = if result_a.is_err() { result_a } else { result_b };
    match failure {
        Err(AppError::BadRequest(msg)) => assert_eq!(msg, "insufficient funds"),
        other => panic!("expected insufficient funds, got {other:?}"),
    }

    // Balance equals original minus exactly one transfer.
    assert_eq!(wallet_balance(&pool, sender.wallet_id(Currency::Usd)).await, 3_000);
    assert_eq!(
        wallet_balance(&pool, recipient.wallet_id(Currency::Eur)).await,
        5_950
    );
    assert_balance_invariant(&pool, sender.wallet_id(Currency::Usd)).await;
}

#[tokio::test]
async fn invalid_pin_leaves_transaction_initiated() {
    let Some(pool) = test_pool().await else {
        eprintln!("skipping test - database not available");
        return;
    };
    let engine = engine(&pool);

    let sender = seed_user(&pool, &[(Currency::Usd, 10_000)]).await;
    let recipient = seed_user(&pool, &[]).await;

    let txn = engine
        .create_internal_transfer(internal_request(
            &sender,
            &recipient,
            Currency::Eur,
            1_000,
            unique_key("k6"),
        ))
        .await
        .unwrap();

    let err = engine
        .confirm_transaction(&txn.id, &sender.user_id, "9999")
        .await
        .unwrap_err();
    match err {
        AppError::BadRequest(msg) => assert_eq!(msg, "invalid PIN"),
        other => panic!("expected bad request, got {other:?}"),
    }

    let reloaded = engine.get_transaction(&txn.id).await.unwrap();
    assert_eq!(reloaded.status, TransactionStatus::Initiated);
    assert_eq!(wallet_balance(&pool, sender.wallet_id(Currency::Usd)).await, 10_000);
}

#[tokio::test]
async fn boundary_rejections() {
    let Some(pool) = test_pool().await else {
        eprintln!("skipping test - database not available");
        return;
    };
    let engine = engine(&pool);

    let user = seed_user(&pool, &[(Currency::Usd, 10_000)]).await;
    let other = seed_user(&pool, &[]).await;

    // Zero amount.
    let err = engine
        .create_internal_transfer(internal_request(
            &user,
            &other,
            Currency::Eur,
            0,
            unique_key("zero"),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "bad_request");

    // Negative amount.
    let err = engine
        .create_internal_transfer(internal_request(
            &user,
            &other,
            Currency::Eur,
            -100,
            unique_key("negative"),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.category(), "bad_request");

    // Transfer to the sender's own wallet.
    let err = engine
        .create_internal_transfer(InternalTransferRequest {
            from_user_id: user.user_id.clone(),
            to_account_number: user.account_number(Currency::Usd).to_string(),
            to_bank_code: user.bank_code.clone(),
            from_currency: Currency::Usd,
            to_amount: Money::new(1_000, Currency::Usd),
            idempotency_key: unique_key("same-wallet"),
            trace_id: None,
        })
        .await
        .unwrap_err();
    match err {
        AppError::BadRequest(msg) => assert_eq!(msg, "cannot transfer to same wallet"),
        other => panic!("expected bad request, got {other:?}"),
    }

    // Destination currency mismatch against the bank account.
    let err = engine
        .create_internal_transfer(InternalTransferRequest {
            from_user_id: user.user_id.clone(),
            to_account_number: other.account_number(Currency::Eur).to_string(),
            to_bank_code: other.bank_code.clone(),
            from_currency: Currency::Usd,
            to_amount: Money::new(1_000, Currency::Gbp),
            idempotency_key: unique_key("mismatch"),
            trace_id: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.category(), "bad_request");

    // Unknown recipient account.
    let err = engine
        .create_internal_transfer(InternalTransferRequest {
            from_user_id: user.user_id.clone(),
            to_account_number: "9999999999".to_string(),
            to_bank_code: "999".to_string(),
            from_currency: Currency::Usd,
            to_amount: Money::new(1_000, Currency::Eur),
            idempotency_key: unique_key("missing"),
            trace_id: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.category(), "not_found");

    // Insufficient funds on the friendly pre-check.
    let err = engine
        .create_internal_transfer(internal_request(
            &user,
            &other,
            Currency::Eur,
            1_000_000,
            unique_key("broke"),
        ))
        .await
        .unwrap_err();
    match err {
        AppError::BadRequest(msg) => assert_eq!(msg, "insufficient funds"),
        other => panic!("expected bad request, got {other:?}"),
    }
}

#[tokio::test]
async fn expired_transaction_cannot_be_confirmed() {
    let Some(pool) = test_pool().await else {
        eprintln!("skipping test - database not available");
        return;
    };
    let engine = engine(&pool);

    let sender = seed_user(&pool, &[(Currency::Usd, 10_000)]).await;
    let recipient = seed_user(&pool, &[]).await;

    let txn = engine
        .create_internal_transfer(internal_request(
            &sender,
            &recipient,
            Currency::Eur,
            1_000,
            unique_key("expired"),
        ))
        .await
        .unwrap();

    sqlx::query("UPDATE transactions_tb SET created_at = NOW() - INTERVAL '11 minutes' WHERE id = $1")
        .bind(&txn.id)
        .execute(&pool)
        .await
        .unwrap();

    let err = engine
        .confirm_transaction(&txn.id, &sender.user_id, "1234")
        .await
        .unwrap_err();
    match err {
        AppError::BadRequest(msg) => assert_eq!(msg, "transaction has expired"),
        other => panic!("expected bad request, got {other:?}"),
    }
}

#[tokio::test]
async fn non_owner_cannot_confirm() {
    let Some(pool) = test_pool().await else {
        eprintln!("skipping test - database not available");
        return;
    };
    let engine = engine(&pool);

    let sender = seed_user(&pool, &[(Currency::Usd, 10_000)]).await;
    let recipient = seed_user(&pool, &[]).await;

    let txn = engine
        .create_internal_transfer(internal_request(
            &sender,
            &recipient,
            Currency::Eur,
            1_000,
            unique_key("not-owner"),
        ))
        .await
        .unwrap();

    let err = engine
        .confirm_transaction(&txn.id, &recipient.user_id, "1234")
        .await
        .unwrap_err();
    match err {
        AppError::BadRequest(msg) => assert_eq!(msg, "transaction does not belong to user"),
        other => panic!("expected bad request, got {other:?}"),
    }
}

#[tokio::test]
async fn unset_pin_is_rejected() {
    let Some(pool) = test_pool().await else {
        eprintln!("skipping test - database not available");
        return;
    };
    let engine = engine(&pool);

    let sender = seed_user(&pool, &[(Currency::Usd, 10_000)]).await;
    let recipient = seed_user(&pool, &[]).await;

    sqlx::query("UPDATE users_tb SET pin_hash = NULL WHERE id = $1")
        .bind(&sender.user_id)
        .execute(&pool)
        .await
        .unwrap();

    let txn = engine
        .create_internal_transfer(internal_request(
            &sender,
            &recipient,
            Currency::Eur,
            1_000,
            unique_key("no-pin"),
        ))
        .await
        .unwrap();

    let err = engine
        .confirm_transaction(&txn.id, &sender.user_id, "1234")
        .await
        .unwrap_err();
    match err {
        AppError::BadRequest(msg) => assert_eq!(msg, "PIN not set for user"),
        other => panic!("expected bad request, got {other:?}"),
    }
}

#[tokio::test]
async fn wallet_locks_resolve_by_composite_key() {
    let Some(pool) = test_pool().await else {
        eprintln!("skipping test - database not available");
        return;
    };

    let user = seed_user(&pool, &[(Currency::Gbp, 2_500)]).await;

    let mut tx = pool.begin().await.unwrap();
    let locked =
        payment_processing_service::wallet::lock_by_user_and_currency(
            &mut tx,
            &user.user_id,
            Currency::Gbp,
        )
        .await
        .unwrap();
    assert_eq!(locked.id, user.wallet_id(Currency::Gbp));
    assert_eq!(locked.balance, 2_500);
    tx.commit().await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let err = payment_processing_service::wallet::lock_by_user_and_currency(
        &mut tx,
        "user_that_does_not_exist",
        Currency::Gbp,
    )
    .await
    .unwrap_err();
    assert_eq!(err.category(), "not_found");
}

#[tokio::test]
async fn ledger_sign_convention_is_enforced() {
    let Some(pool) = test_pool().await else {
        eprintln!("skipping test - database not available");
        return;
    };

    let user = seed_user(&pool, &[(Currency::Usd, 10_000)]).await;
    let wallet_id = user.wallet_id(Currency::Usd);

    let mut conn = pool.acquire().await.unwrap();

    let err = ledger::debit_entry(&mut conn, wallet_id, "txn_sign", 100, Currency::Usd)
        .await
        .unwrap_err();
    assert_eq!(err.category(), "bad_request");

    let err = ledger::credit_entry(&mut conn, wallet_id, "txn_sign", -100, Currency::Usd)
        .await
        .unwrap_err();
    assert_eq!(err.category(), "bad_request");

    let err = ledger::external_counterparty_credit(&mut conn, "txn_sign", 0, Currency::Usd)
        .await
        .unwrap_err();
    assert_eq!(err.category(), "bad_request");
}

#[tokio::test]
async fn history_pages_with_opaque_cursor() {
    let Some(pool) = test_pool().await else {
        eprintln!("skipping test - database not available");
        return;
    };
    let engine = engine(&pool);

    let user = seed_user(&pool, &[(Currency::Usd, 100_000)]).await;

    for i in 0..5 {
        engine
            .create_internal_transfer(internal_request(
                &user,
                &user,
                Currency::Eur,
                100 + i,
                unique_key("history"),
            ))
            .await
            .expect("seed history transfer");
    }

    let first_page = engine
        .get_transaction_history(&user.user_id, "", 2)
        .await
        .unwrap();
    assert_eq!(first_page.transactions.len(), 2);
    let next = first_page.next_cursor.expect("more pages exist");

    let second_page = engine
        .get_transaction_history(&user.user_id, &next, 2)
        .await
        .unwrap();
    assert_eq!(second_page.transactions.len(), 2);

    // Keyset pages never overlap.
    let first_ids: Vec<_> = first_page.transactions.iter().map(|t| &t.id).collect();
    for txn in &second_page.transactions {
        assert!(!first_ids.contains(&&txn.id));
    }

    // Newest first.
    assert!(
        first_page.transactions[0].created_at >= first_page.transactions[1].created_at
    );

    let err = engine
        .get_transaction_history(&user.user_id, "!!!not-a-cursor!!!", 2)
        .await
        .unwrap_err();
    assert_eq!(err.category(), "bad_request");
}

#[tokio::test]
async fn name_enquiry_prefers_internal_accounts() {
    let Some(pool) = test_pool().await else {
        eprintln!("skipping test - database not available");
        return;
    };
    let engine = engine(&pool);

    let user = seed_user(&pool, &[]).await;

    let internal = engine
        .enquire_account_name(user.account_number(Currency::Eur), &user.bank_code)
        .await
        .unwrap();
    assert!(internal.is_internal);
    assert_eq!(internal.currency, Currency::Eur);
    assert!(internal.account_name.starts_with("Holder"));

    let external = engine
        .enquire_account_name("8887776665", "999")
        .await
        .unwrap();
    assert!(!external.is_internal);
    assert_eq!(external.account_name, "Mock Account Holder 6665");
}
