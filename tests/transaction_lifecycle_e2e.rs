//! Transaction Lifecycle End-to-End Tests
//!
//! Exercises the full record/amend/remove flow through the service layer
//! against an in-memory database: position reconciliation on every
//! transaction event, rejection of overdraws with no partial state, and
//! serialization of concurrent mutations against one investment.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use lotbook::application::services::portfolio_service::{
    ClientDraft, InvestmentDraft, PortfolioError, PortfolioService, TransactionDraft,
    TransactionPatch,
};
use lotbook::domain::errors::ReconciliationError;
use lotbook::persistence::init_database;

async fn service() -> Arc<PortfolioService> {
    let pool = init_database("sqlite::memory:").await.unwrap();
    Arc::new(PortfolioService::new(pool, 30))
}

async fn register_user(service: &PortfolioService, email: &str) -> String {
    service
        .register("Test User", email, "a-long-enough-password")
        .await
        .unwrap()
        .id
}

async fn seed_investment(
    service: &PortfolioService,
    user_id: &str,
    quantity: Decimal,
) -> (String, String) {
    let client = service
        .create_client(
            user_id,
            ClientDraft {
                full_name: "Mehmet Kaya".to_string(),
                phone_number: None,
                city: Some("Ankara".to_string()),
                brokerage_firms: vec!["Acme Securities".to_string()],
                referral_source: None,
                notes: None,
                cash_position: dec!(0),
            },
        )
        .await
        .unwrap();

    let investment = service
        .create_investment(
            user_id,
            InvestmentDraft {
                client_id: client.id.clone(),
                stock_name: "Acme Industries".to_string(),
                stock_symbol: Some("ACME".to_string()),
                brokerage_firm: "Acme Securities".to_string(),
                acquisition_date: Utc::now(),
                quantity_lots: quantity,
                acquisition_cost: dec!(20),
                current_value: Some(dec!(25)),
            },
        )
        .await
        .unwrap();

    (client.id, investment.id)
}

fn sell(investment_id: &str, quantity: Decimal) -> TransactionDraft {
    TransactionDraft {
        investment_id: investment_id.to_string(),
        kind: "SELL".to_string(),
        transaction_date: Utc::now(),
        quantity_lots: quantity,
        price_per_lot: dec!(25),
        total_amount: dec!(25) * quantity,
        notes: None,
    }
}

fn buy(investment_id: &str, quantity: Decimal) -> TransactionDraft {
    TransactionDraft {
        investment_id: investment_id.to_string(),
        kind: "BUY".to_string(),
        transaction_date: Utc::now(),
        quantity_lots: quantity,
        price_per_lot: dec!(20),
        total_amount: dec!(20) * quantity,
        notes: None,
    }
}

fn is_insufficient(err: &PortfolioError) -> bool {
    matches!(
        err,
        PortfolioError::Reconciliation(ReconciliationError::InsufficientPosition { .. })
    )
}

#[tokio::test]
async fn test_partial_sell_then_overdraw_is_rejected() {
    let service = service().await;
    let user_id = register_user(&service, "seller@example.com").await;
    let (_, investment_id) = seed_investment(&service, &user_id, dec!(100)).await;

    // SELL 30 against 100 is accepted and leaves 70
    let committed = service
        .record_transaction(&user_id, sell(&investment_id, dec!(30)))
        .await
        .unwrap();
    assert_eq!(committed.investment_quantity, dec!(70));

    // SELL 80 against 70 would be -10: rejected, nothing written
    let err = service
        .record_transaction(&user_id, sell(&investment_id, dec!(80)))
        .await
        .unwrap_err();
    assert!(is_insufficient(&err));

    let detail = service
        .investment_detail(&user_id, &investment_id)
        .await
        .unwrap();
    assert_eq!(detail.investment.quantity_lots, "70");
    assert_eq!(detail.transactions.len(), 1);
}

#[tokio::test]
async fn test_sell_to_exactly_zero_is_accepted() {
    let service = service().await;
    let user_id = register_user(&service, "flat@example.com").await;
    let (_, investment_id) = seed_investment(&service, &user_id, dec!(25)).await;

    let committed = service
        .record_transaction(&user_id, sell(&investment_id, dec!(25)))
        .await
        .unwrap();
    assert_eq!(committed.investment_quantity, Decimal::ZERO);
}

#[tokio::test]
async fn test_buy_amend_to_sell_then_delete() {
    let service = service().await;
    let user_id = register_user(&service, "lifecycle@example.com").await;
    let (_, investment_id) = seed_investment(&service, &user_id, dec!(0)).await;

    // BUY 50 on an empty position
    let committed = service
        .record_transaction(&user_id, buy(&investment_id, dec!(50)))
        .await
        .unwrap();
    assert_eq!(committed.investment_quantity, dec!(50));
    let transaction_id = committed.transaction.id.clone();

    // Amending it to SELL 50 reverses the buy and applies the sell: 0
    let committed = service
        .amend_transaction(
            &user_id,
            &transaction_id,
            TransactionPatch {
                kind: Some("SELL".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(committed.investment_quantity, Decimal::ZERO);
    assert_eq!(committed.transaction.kind, "SELL");

    // Deleting the sell adds its quantity back
    let quantity = service
        .remove_transaction(&user_id, &transaction_id)
        .await
        .unwrap();
    assert_eq!(quantity, dec!(50));

    let detail = service
        .investment_detail(&user_id, &investment_id)
        .await
        .unwrap();
    assert!(detail.transactions.is_empty());
}

#[tokio::test]
async fn test_amend_rejected_when_it_would_overdraw() {
    let service = service().await;
    let user_id = register_user(&service, "amend@example.com").await;
    let (_, investment_id) = seed_investment(&service, &user_id, dec!(10)).await;

    let committed = service
        .record_transaction(&user_id, sell(&investment_id, dec!(5)))
        .await
        .unwrap();
    assert_eq!(committed.investment_quantity, dec!(5));

    // Growing the sell to 16 would put the position at -1
    let err = service
        .amend_transaction(
            &user_id,
            &committed.transaction.id,
            TransactionPatch {
                quantity_lots: Some(dec!(16)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(is_insufficient(&err));

    // The stored transaction and position are untouched
    let detail = service
        .investment_detail(&user_id, &investment_id)
        .await
        .unwrap();
    assert_eq!(detail.investment.quantity_lots, "5");
    assert_eq!(detail.transactions[0].quantity_lots, "5");
}

#[tokio::test]
async fn test_delete_of_buy_already_sold_on_is_rejected() {
    let service = service().await;
    let user_id = register_user(&service, "cascade-delete@example.com").await;
    let (_, investment_id) = seed_investment(&service, &user_id, dec!(0)).await;

    let bought = service
        .record_transaction(&user_id, buy(&investment_id, dec!(10)))
        .await
        .unwrap();
    service
        .record_transaction(&user_id, sell(&investment_id, dec!(8)))
        .await
        .unwrap();

    // Removing the buy would leave 2 - 10 = -8
    let err = service
        .remove_transaction(&user_id, &bought.transaction.id)
        .await
        .unwrap_err();
    assert!(is_insufficient(&err));

    let detail = service
        .investment_detail(&user_id, &investment_id)
        .await
        .unwrap();
    assert_eq!(detail.investment.quantity_lots, "2");
    assert_eq!(detail.transactions.len(), 2);
}

#[tokio::test]
async fn test_invalid_quantity_is_rejected_before_any_write() {
    let service = service().await;
    let user_id = register_user(&service, "zero@example.com").await;
    let (_, investment_id) = seed_investment(&service, &user_id, dec!(10)).await;

    let err = service
        .record_transaction(&user_id, sell(&investment_id, dec!(0)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PortfolioError::Reconciliation(ReconciliationError::InvalidQuantity { .. })
    ));

    let detail = service
        .investment_detail(&user_id, &investment_id)
        .await
        .unwrap();
    assert!(detail.transactions.is_empty());
}

#[tokio::test]
async fn test_concurrent_sells_never_overdraw() {
    let service = service().await;
    let user_id = register_user(&service, "race@example.com").await;
    let (_, investment_id) = seed_investment(&service, &user_id, dec!(100)).await;

    // Two SELL 60 requests against 100: only one may commit.
    let mut handles = Vec::new();
    for _ in 0..2 {
        let service = service.clone();
        let user_id = user_id.clone();
        let draft = sell(&investment_id, dec!(60));
        handles.push(tokio::spawn(async move {
            service.record_transaction(&user_id, draft).await
        }));
    }

    let mut accepted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(err) => {
                assert!(is_insufficient(&err));
                rejected += 1;
            }
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(rejected, 1);

    let detail = service
        .investment_detail(&user_id, &investment_id)
        .await
        .unwrap();
    assert_eq!(detail.investment.quantity_lots, "40");
    assert_eq!(detail.transactions.len(), 1);
}

#[tokio::test]
async fn test_decimal_quantities_reconcile_exactly() {
    let service = service().await;
    let user_id = register_user(&service, "decimal@example.com").await;
    let (_, investment_id) = seed_investment(&service, &user_id, dec!(0)).await;

    service
        .record_transaction(&user_id, buy(&investment_id, dec!(0.1)))
        .await
        .unwrap();
    service
        .record_transaction(&user_id, buy(&investment_id, dec!(0.2)))
        .await
        .unwrap();

    // Selling the exact running total reaches zero, no rounding surprises
    let committed = service
        .record_transaction(&user_id, sell(&investment_id, dec!(0.3)))
        .await
        .unwrap();
    assert_eq!(committed.investment_quantity, Decimal::ZERO);
}
