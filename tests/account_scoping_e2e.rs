//! Account, Scoping, and Aggregation End-to-End Tests
//!
//! Covers registration/login/session resolution, per-user scoping of every
//! entity, cascade deletes, direct-edit boundaries, and the dashboard
//! aggregation view.

use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;

use lotbook::application::services::portfolio_service::{
    ClientDraft, ClientPatch, InvestmentDraft, InvestmentPatch, PortfolioError, PortfolioService,
    TransactionDraft,
};
use lotbook::persistence::init_database;

async fn service() -> Arc<PortfolioService> {
    let pool = init_database("sqlite::memory:").await.unwrap();
    Arc::new(PortfolioService::new(pool, 30))
}

fn client_draft(name: &str) -> ClientDraft {
    ClientDraft {
        full_name: name.to_string(),
        phone_number: Some("+90 555 111 22 33".to_string()),
        city: Some("Izmir".to_string()),
        brokerage_firms: vec!["Acme Securities".to_string(), "Beta Broker".to_string()],
        referral_source: Some("Referral".to_string()),
        notes: None,
        cash_position: dec!(2500),
    }
}

fn investment_draft(client_id: &str) -> InvestmentDraft {
    InvestmentDraft {
        client_id: client_id.to_string(),
        stock_name: "Acme Industries".to_string(),
        stock_symbol: Some("ACME".to_string()),
        brokerage_firm: "Acme Securities".to_string(),
        acquisition_date: Utc::now(),
        quantity_lots: dec!(10),
        acquisition_cost: dec!(100),
        current_value: Some(dec!(110)),
    }
}

#[tokio::test]
async fn test_register_login_and_session_resolution() {
    let service = service().await;

    let user = service
        .register("Deniz Aydın", "deniz@example.com", "correct-horse-battery")
        .await
        .unwrap();

    // Duplicate e-mail is refused
    let err = service
        .register("Imposter", "deniz@example.com", "whatever-password")
        .await
        .unwrap_err();
    assert!(matches!(err, PortfolioError::EmailTaken));

    // Wrong password fails without revealing which part was wrong
    let err = service
        .login("deniz@example.com", "wrong-password")
        .await
        .unwrap_err();
    assert!(matches!(err, PortfolioError::InvalidCredentials));

    let (logged_in, token) = service
        .login("deniz@example.com", "correct-horse-battery")
        .await
        .unwrap();
    assert_eq!(logged_in.id, user.id);

    let resolved = service.resolve_session(&token).await.unwrap().unwrap();
    assert_eq!(resolved.user_id, user.id);

    assert!(service
        .resolve_session("not-a-real-token")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_entities_are_scoped_to_their_owner() {
    let service = service().await;
    let owner = service
        .register("Owner", "owner@example.com", "password-one")
        .await
        .unwrap();
    let intruder = service
        .register("Intruder", "intruder@example.com", "password-two")
        .await
        .unwrap();

    let client = service
        .create_client(&owner.id, client_draft("Fatma Şahin"))
        .await
        .unwrap();
    let investment = service
        .create_investment(&owner.id, investment_draft(&client.id))
        .await
        .unwrap();
    let committed = service
        .record_transaction(
            &owner.id,
            TransactionDraft {
                investment_id: investment.id.clone(),
                kind: "BUY".to_string(),
                transaction_date: Utc::now(),
                quantity_lots: dec!(5),
                price_per_lot: dec!(100),
                total_amount: dec!(500),
                notes: None,
            },
        )
        .await
        .unwrap();

    // Clients are looked up pre-scoped: a foreign client reads as absent
    let err = service
        .client_detail(&intruder.id, &client.id)
        .await
        .unwrap_err();
    assert!(matches!(err, PortfolioError::NotFound { .. }));

    // Investments and transactions resolve, then fail the ownership check
    let err = service
        .investment_detail(&intruder.id, &investment.id)
        .await
        .unwrap_err();
    assert!(matches!(err, PortfolioError::Unauthorized));

    let err = service
        .remove_transaction(&intruder.id, &committed.transaction.id)
        .await
        .unwrap_err();
    assert!(matches!(err, PortfolioError::Unauthorized));

    // The intruder's own listings stay empty
    assert!(service.list_clients(&intruder.id).await.unwrap().is_empty());
    assert!(service
        .list_investments(&intruder.id)
        .await
        .unwrap()
        .is_empty());
    assert!(service
        .list_transactions(&intruder.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_client_delete_cascades_investments_and_transactions() {
    let service = service().await;
    let user = service
        .register("Owner", "cascade@example.com", "password-three")
        .await
        .unwrap();

    let client = service
        .create_client(&user.id, client_draft("Kemal Öz"))
        .await
        .unwrap();
    let investment = service
        .create_investment(&user.id, investment_draft(&client.id))
        .await
        .unwrap();
    service
        .record_transaction(
            &user.id,
            TransactionDraft {
                investment_id: investment.id.clone(),
                kind: "BUY".to_string(),
                transaction_date: Utc::now(),
                quantity_lots: dec!(2),
                price_per_lot: dec!(100),
                total_amount: dec!(200),
                notes: Some("initial".to_string()),
            },
        )
        .await
        .unwrap();

    service.delete_client(&user.id, &client.id).await.unwrap();

    assert!(service.list_clients(&user.id).await.unwrap().is_empty());
    assert!(service.list_investments(&user.id).await.unwrap().is_empty());
    assert!(service
        .list_transactions(&user.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_client_patch_merges_onto_stored_fields() {
    let service = service().await;
    let user = service
        .register("Owner", "patch@example.com", "password-four")
        .await
        .unwrap();
    let client = service
        .create_client(&user.id, client_draft("Zeynep Arslan"))
        .await
        .unwrap();

    let updated = service
        .update_client(
            &user.id,
            &client.id,
            ClientPatch {
                full_name: Some("Zeynep Arslan-Yıldız".to_string()),
                cash_position: Some(dec!(3000)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.full_name, "Zeynep Arslan-Yıldız");
    assert_eq!(updated.cash_position, "3000");
    // Untouched fields survive the patch
    assert_eq!(updated.city.as_deref(), Some("Izmir"));
    assert_eq!(updated.phone_number, client.phone_number);
}

#[tokio::test]
async fn test_direct_investment_edit_never_touches_quantity() {
    let service = service().await;
    let user = service
        .register("Owner", "quantity-guard@example.com", "password-five")
        .await
        .unwrap();
    let client = service
        .create_client(&user.id, client_draft("Ali Vural"))
        .await
        .unwrap();
    let investment = service
        .create_investment(&user.id, investment_draft(&client.id))
        .await
        .unwrap();

    let updated = service
        .update_investment(
            &user.id,
            &investment.id,
            InvestmentPatch {
                stock_name: Some("Acme Industries A.Ş.".to_string()),
                current_value: Some(dec!(130)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.stock_name, "Acme Industries A.Ş.");
    assert_eq!(updated.current_value.as_deref(), Some("130"));
    assert_eq!(updated.quantity_lots, investment.quantity_lots);
}

#[tokio::test]
async fn test_negative_amounts_are_rejected_as_invalid_input() {
    let service = service().await;
    let user = service
        .register("Owner", "invalid@example.com", "password-six")
        .await
        .unwrap();
    let client = service
        .create_client(&user.id, client_draft("Hasan Demir"))
        .await
        .unwrap();

    let mut draft = investment_draft(&client.id);
    draft.acquisition_cost = dec!(-1);
    let err = service.create_investment(&user.id, draft).await.unwrap_err();
    assert!(matches!(err, PortfolioError::InvalidInput(_)));

    let investment = service
        .create_investment(&user.id, investment_draft(&client.id))
        .await
        .unwrap();
    let err = service
        .record_transaction(
            &user.id,
            TransactionDraft {
                investment_id: investment.id,
                kind: "BUY".to_string(),
                transaction_date: Utc::now(),
                quantity_lots: dec!(1),
                price_per_lot: dec!(-5),
                total_amount: dec!(5),
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PortfolioError::InvalidInput(_)));
}

#[tokio::test]
async fn test_dashboard_aggregates_positions_and_recent_activity() {
    let service = service().await;
    let user = service
        .register("Owner", "dashboard@example.com", "password-seven")
        .await
        .unwrap();

    let client = service
        .create_client(&user.id, client_draft("Emre Çelik"))
        .await
        .unwrap();

    // 10 lots at cost 100, marked 110
    service
        .create_investment(&user.id, investment_draft(&client.id))
        .await
        .unwrap();

    // 4 lots at cost 50, unmarked: values at zero, costs at 200
    service
        .create_investment(
            &user.id,
            InvestmentDraft {
                client_id: client.id.clone(),
                stock_name: "Beta Holding".to_string(),
                stock_symbol: None,
                brokerage_firm: "Beta Broker".to_string(),
                acquisition_date: Utc::now(),
                quantity_lots: dec!(4),
                acquisition_cost: dec!(50),
                current_value: None,
            },
        )
        .await
        .unwrap();

    let summary = service.dashboard_summary(&user.id).await.unwrap();
    assert_eq!(summary.total_clients, 1);
    assert_eq!(summary.total_investments, 2);
    assert_eq!(summary.total_transactions, 0);
    assert_eq!(summary.total_portfolio_value, dec!(1100));
    assert_eq!(summary.total_acquisition_cost, dec!(1200));
    assert_eq!(summary.total_profit_loss, dec!(-100));
    assert!(summary.recent_transactions.is_empty());

    // Recent activity caps at five, newest first
    let investments = service.list_investments(&user.id).await.unwrap();
    for i in 0..6 {
        service
            .record_transaction(
                &user.id,
                TransactionDraft {
                    investment_id: investments[0].id.clone(),
                    kind: "BUY".to_string(),
                    transaction_date: Utc::now() + chrono::Duration::seconds(i),
                    quantity_lots: dec!(1),
                    price_per_lot: dec!(100),
                    total_amount: dec!(100),
                    notes: None,
                },
            )
            .await
            .unwrap();
    }

    let summary = service.dashboard_summary(&user.id).await.unwrap();
    assert_eq!(summary.total_transactions, 6);
    assert_eq!(summary.recent_transactions.len(), 5);
    let dates: Vec<_> = summary
        .recent_transactions
        .iter()
        .map(|t| t.transaction_date)
        .collect();
    let mut sorted = dates.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(dates, sorted);
}
