//! PortfolioService - orchestrates account, client, investment, and
//! transaction operations over the persistence layer.
//!
//! Every operation is scoped to the authenticated user. Transaction
//! mutations go through the reconciliation engine, and reconciliations for
//! one investment are serialized behind a per-investment lock so the
//! read-reconcile-commit sequence never interleaves with another request's.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth;
use crate::auth::AuthUser;
use crate::domain::entities::investment::Valuation;
use crate::domain::entities::transaction::TransactionType;
use crate::domain::errors::ReconciliationError;
use crate::domain::services::reconciliation::{reconcile, PositionEvent};
use crate::domain::value_objects::{lots::Lots, money::Money};
use crate::persistence::models::*;
use crate::persistence::repository::{
    ClientRepository, InvestmentRepository, SessionRepository, TransactionRepository,
    UserRepository,
};
use crate::persistence::{DatabaseError, DbPool};

/// Operation failures surfaced to handlers.
#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("{0}")]
    Reconciliation(#[from] ReconciliationError),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("This e-mail address is already in use")]
    EmailTaken,

    #[error("Invalid e-mail or password")]
    InvalidCredentials,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// New client payload
#[derive(Debug, Clone, Deserialize)]
pub struct ClientDraft {
    pub full_name: String,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    #[serde(default)]
    pub brokerage_firms: Vec<String>,
    pub referral_source: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub cash_position: Decimal,
}

/// Partial client edit; absent fields keep their stored values
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientPatch {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub brokerage_firms: Option<Vec<String>>,
    pub referral_source: Option<String>,
    pub notes: Option<String>,
    pub cash_position: Option<Decimal>,
}

/// New investment payload
#[derive(Debug, Clone, Deserialize)]
pub struct InvestmentDraft {
    pub client_id: String,
    pub stock_name: String,
    pub stock_symbol: Option<String>,
    pub brokerage_firm: String,
    pub acquisition_date: DateTime<Utc>,
    #[serde(default)]
    pub quantity_lots: Decimal,
    pub acquisition_cost: Decimal,
    pub current_value: Option<Decimal>,
}

/// Partial investment edit; the stored quantity is never editable here
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvestmentPatch {
    pub stock_name: Option<String>,
    pub stock_symbol: Option<String>,
    pub brokerage_firm: Option<String>,
    pub acquisition_date: Option<DateTime<Utc>>,
    pub acquisition_cost: Option<Decimal>,
    pub current_value: Option<Decimal>,
}

/// New transaction payload
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionDraft {
    pub investment_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub transaction_date: DateTime<Utc>,
    pub quantity_lots: Decimal,
    pub price_per_lot: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
}

/// Partial transaction edit; absent fields keep their stored values
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionPatch {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub transaction_date: Option<DateTime<Utc>>,
    pub quantity_lots: Option<Decimal>,
    pub price_per_lot: Option<Decimal>,
    pub total_amount: Option<Decimal>,
    pub notes: Option<String>,
}

/// Client with its investments and transaction history
#[derive(Debug, Serialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: ClientRecord,
    pub investments: Vec<InvestmentRecord>,
    pub transactions: Vec<TransactionRecord>,
}

/// Investment with its owning client and transaction history
#[derive(Debug, Serialize)]
pub struct InvestmentDetail {
    #[serde(flatten)]
    pub investment: InvestmentRecord,
    pub client: ClientRecord,
    pub transactions: Vec<TransactionRecord>,
}

/// A committed transaction mutation: the persisted row plus the
/// investment's reconciled quantity.
#[derive(Debug, Serialize)]
pub struct CommittedTransaction {
    #[serde(flatten)]
    pub transaction: TransactionRecord,
    pub investment_quantity: Decimal,
}

/// Per-user aggregation for the dashboard view
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub total_clients: i64,
    pub total_investments: i64,
    pub total_transactions: i64,
    pub total_portfolio_value: Decimal,
    pub total_acquisition_cost: Decimal,
    pub total_profit_loss: Decimal,
    pub recent_transactions: Vec<TransactionRecord>,
}

pub struct PortfolioService {
    pool: DbPool,
    users: UserRepository,
    sessions: SessionRepository,
    clients: ClientRepository,
    investments: InvestmentRepository,
    transactions: TransactionRepository,
    session_ttl: Duration,
    investment_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PortfolioService {
    pub fn new(pool: DbPool, session_ttl_days: i64) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool.clone()),
            clients: ClientRepository::new(pool.clone()),
            investments: InvestmentRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            pool,
            session_ttl: Duration::days(session_ttl_days),
            investment_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Connectivity probe for the health endpoint
    pub async fn database_ok(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    // ---- Accounts & sessions ----

    /// Register a new user account
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserRecord, PortfolioError> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(PortfolioError::InvalidInput(
                "Name, e-mail, and password are required".to_string(),
            ));
        }

        if self.users.find_by_email(email).await?.is_some() {
            return Err(PortfolioError::EmailTaken);
        }

        let password_hash =
            auth::hash_password(password).map_err(PortfolioError::Internal)?;

        let user = self
            .users
            .create(CreateUser {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Verify credentials and issue a session token
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(UserRecord, String), PortfolioError> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) if auth::verify_password(password, &user.password_hash) => user,
            _ => {
                warn!("Failed login attempt for {}", email);
                return Err(PortfolioError::InvalidCredentials);
            }
        };

        let token = auth::generate_session_token();
        self.sessions
            .create(CreateSession {
                token_digest: auth::token_digest(&token),
                user_id: user.id.clone(),
                expires_at: Utc::now() + self.session_ttl,
            })
            .await?;

        info!("User {} logged in", user.id);
        Ok((user, token))
    }

    /// Resolve a bearer token to its user, if the session is still valid
    pub async fn resolve_session(&self, token: &str) -> Result<Option<AuthUser>, PortfolioError> {
        let session = self
            .sessions
            .find_active(&auth::token_digest(token), Utc::now())
            .await?;

        Ok(session.map(|s| AuthUser { user_id: s.user_id }))
    }

    // ---- Clients ----

    pub async fn create_client(
        &self,
        user_id: &str,
        draft: ClientDraft,
    ) -> Result<ClientRecord, PortfolioError> {
        if draft.full_name.trim().is_empty() {
            return Err(PortfolioError::InvalidInput(
                "Client full name is required".to_string(),
            ));
        }
        let cash_position = Money::new(draft.cash_position)
            .map_err(PortfolioError::InvalidInput)?;

        let brokerage_firms = serde_json::to_string(&draft.brokerage_firms)
            .map_err(|e| PortfolioError::Internal(format!("Failed to encode firms: {}", e)))?;

        let record = self
            .clients
            .create(CreateClient {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                full_name: draft.full_name,
                phone_number: draft.phone_number,
                city: draft.city,
                brokerage_firms,
                referral_source: draft.referral_source,
                notes: draft.notes,
                cash_position: cash_position.value(),
            })
            .await?;

        Ok(record)
    }

    pub async fn list_clients(&self, user_id: &str) -> Result<Vec<ClientRecord>, PortfolioError> {
        Ok(self.clients.list_for_user(user_id).await?)
    }

    pub async fn client_detail(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<ClientDetail, PortfolioError> {
        let client = self.require_client(user_id, client_id).await?;
        let investments = self.investments.list_for_client(client_id).await?;
        let transactions = self.transactions.list_for_client(client_id).await?;

        Ok(ClientDetail {
            client,
            investments,
            transactions,
        })
    }

    pub async fn update_client(
        &self,
        user_id: &str,
        client_id: &str,
        patch: ClientPatch,
    ) -> Result<ClientRecord, PortfolioError> {
        let existing = self.require_client(user_id, client_id).await?;

        let cash_position = match patch.cash_position {
            Some(value) => Money::new(value).map_err(PortfolioError::InvalidInput)?.value(),
            None => existing.cash_position_amount()?.value(),
        };

        let brokerage_firms = match patch.brokerage_firms {
            Some(firms) => serde_json::to_string(&firms)
                .map_err(|e| PortfolioError::Internal(format!("Failed to encode firms: {}", e)))?,
            None => existing.brokerage_firms,
        };

        let record = self
            .clients
            .update(
                client_id,
                UpdateClient {
                    full_name: patch.full_name.unwrap_or(existing.full_name),
                    phone_number: patch.phone_number.or(existing.phone_number),
                    city: patch.city.or(existing.city),
                    brokerage_firms,
                    referral_source: patch.referral_source.or(existing.referral_source),
                    notes: patch.notes.or(existing.notes),
                    cash_position,
                },
            )
            .await?;

        Ok(record)
    }

    pub async fn delete_client(&self, user_id: &str, client_id: &str) -> Result<(), PortfolioError> {
        self.require_client(user_id, client_id).await?;
        self.clients.delete(client_id).await?;
        info!("Deleted client {} for user {}", client_id, user_id);
        Ok(())
    }

    pub async fn list_client_investments(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<Vec<InvestmentRecord>, PortfolioError> {
        self.require_client(user_id, client_id).await?;
        Ok(self.investments.list_for_client(client_id).await?)
    }

    // ---- Investments ----

    pub async fn create_investment(
        &self,
        user_id: &str,
        draft: InvestmentDraft,
    ) -> Result<InvestmentRecord, PortfolioError> {
        if draft.stock_name.trim().is_empty() || draft.brokerage_firm.trim().is_empty() {
            return Err(PortfolioError::InvalidInput(
                "Stock name and brokerage firm are required".to_string(),
            ));
        }
        let quantity = Lots::new(draft.quantity_lots).map_err(PortfolioError::InvalidInput)?;
        let acquisition_cost =
            Money::new(draft.acquisition_cost).map_err(PortfolioError::InvalidInput)?;
        let current_value = draft
            .current_value
            .map(Money::new)
            .transpose()
            .map_err(PortfolioError::InvalidInput)?;

        // The owning client must belong to the caller
        self.require_client(user_id, &draft.client_id).await?;

        let record = self
            .investments
            .create(CreateInvestment {
                id: Uuid::new_v4().to_string(),
                client_id: draft.client_id,
                stock_name: draft.stock_name,
                stock_symbol: draft.stock_symbol,
                brokerage_firm: draft.brokerage_firm,
                acquisition_date: draft.acquisition_date,
                quantity_lots: quantity.value(),
                acquisition_cost: acquisition_cost.value(),
                current_value: current_value.map(|v| v.value()),
            })
            .await?;

        Ok(record)
    }

    pub async fn list_investments(
        &self,
        user_id: &str,
    ) -> Result<Vec<InvestmentRecord>, PortfolioError> {
        Ok(self.investments.list_for_user(user_id).await?)
    }

    pub async fn investment_detail(
        &self,
        user_id: &str,
        investment_id: &str,
    ) -> Result<InvestmentDetail, PortfolioError> {
        let (investment, client) = self.require_investment(user_id, investment_id).await?;
        let transactions = self.transactions.list_for_investment(investment_id).await?;

        Ok(InvestmentDetail {
            investment,
            client,
            transactions,
        })
    }

    pub async fn update_investment(
        &self,
        user_id: &str,
        investment_id: &str,
        patch: InvestmentPatch,
    ) -> Result<InvestmentRecord, PortfolioError> {
        let (existing, _client) = self.require_investment(user_id, investment_id).await?;

        let acquisition_cost = match patch.acquisition_cost {
            Some(value) => Money::new(value).map_err(PortfolioError::InvalidInput)?.value(),
            None => existing.acquisition_cost_amount()?.value(),
        };
        let current_value = match patch.current_value {
            Some(value) => Some(Money::new(value).map_err(PortfolioError::InvalidInput)?.value()),
            None => existing.current_value_amount()?.map(|v| v.value()),
        };

        let record = self
            .investments
            .update(
                investment_id,
                UpdateInvestment {
                    stock_name: patch.stock_name.unwrap_or(existing.stock_name),
                    stock_symbol: patch.stock_symbol.or(existing.stock_symbol),
                    brokerage_firm: patch.brokerage_firm.unwrap_or(existing.brokerage_firm),
                    acquisition_date: patch.acquisition_date.unwrap_or(existing.acquisition_date),
                    acquisition_cost,
                    current_value,
                },
            )
            .await?;

        Ok(record)
    }

    pub async fn delete_investment(
        &self,
        user_id: &str,
        investment_id: &str,
    ) -> Result<(), PortfolioError> {
        self.require_investment(user_id, investment_id).await?;
        self.investments.delete(investment_id).await?;
        info!("Deleted investment {} for user {}", investment_id, user_id);
        Ok(())
    }

    // ---- Transactions ----

    pub async fn list_transactions(
        &self,
        user_id: &str,
    ) -> Result<Vec<TransactionRecord>, PortfolioError> {
        Ok(self.transactions.list_for_user(user_id).await?)
    }

    pub async fn transaction_detail(
        &self,
        user_id: &str,
        transaction_id: &str,
    ) -> Result<TransactionRecord, PortfolioError> {
        let (transaction, _, _) = self.require_transaction(user_id, transaction_id).await?;
        Ok(transaction)
    }

    /// Record a new transaction and commit its reconciled position.
    pub async fn record_transaction(
        &self,
        user_id: &str,
        draft: TransactionDraft,
    ) -> Result<CommittedTransaction, PortfolioError> {
        let kind: TransactionType = draft.kind.parse().map_err(PortfolioError::InvalidInput)?;
        let price_per_lot =
            Money::new(draft.price_per_lot).map_err(PortfolioError::InvalidInput)?;
        let total_amount =
            Money::new(draft.total_amount).map_err(PortfolioError::InvalidInput)?;

        let (investment, client) = self.require_investment(user_id, &draft.investment_id).await?;

        let lock = self.investment_lock(&investment.id).await;
        let _guard = lock.lock().await;

        // Re-read under the lock; another request may have just committed.
        let current = self
            .investments
            .get(&investment.id)
            .await?
            .ok_or(PortfolioError::NotFound {
                entity: "Investment",
            })?
            .quantity()?;

        let new_quantity = reconcile(
            current,
            &PositionEvent::Create {
                kind,
                quantity: draft.quantity_lots,
            },
        )?;

        let record = self
            .transactions
            .create_reconciled(
                CreateTransaction {
                    id: Uuid::new_v4().to_string(),
                    investment_id: investment.id.clone(),
                    client_id: client.id,
                    kind,
                    transaction_date: draft.transaction_date,
                    quantity_lots: draft.quantity_lots,
                    price_per_lot: price_per_lot.value(),
                    total_amount: total_amount.value(),
                    notes: draft.notes,
                },
                new_quantity.value(),
            )
            .await?;

        info!(
            "Recorded {} {} lots on investment {}, position now {}",
            record.kind, record.quantity_lots, investment.id, new_quantity
        );
        Ok(CommittedTransaction {
            transaction: record,
            investment_quantity: new_quantity.value(),
        })
    }

    /// Amend a transaction: reverse its old delta, apply the new one, and
    /// commit both the row update and the reconciled position.
    pub async fn amend_transaction(
        &self,
        user_id: &str,
        transaction_id: &str,
        patch: TransactionPatch,
    ) -> Result<CommittedTransaction, PortfolioError> {
        let (existing, investment, _client) =
            self.require_transaction(user_id, transaction_id).await?;

        let lock = self.investment_lock(&investment.id).await;
        let _guard = lock.lock().await;

        // Re-read both rows under the lock for a consistent old delta.
        let existing = self
            .transactions
            .get(&existing.id)
            .await?
            .ok_or(PortfolioError::NotFound {
                entity: "Transaction",
            })?;
        let current = self
            .investments
            .get(&investment.id)
            .await?
            .ok_or(PortfolioError::NotFound {
                entity: "Investment",
            })?
            .quantity()?;

        let old_kind = existing.transaction_type()?;
        let old_quantity = existing.quantity_decimal()?;

        let new_kind = match &patch.kind {
            Some(raw) => raw.parse().map_err(PortfolioError::InvalidInput)?,
            None => old_kind,
        };
        let new_quantity_lots = patch.quantity_lots.unwrap_or(old_quantity);
        let price_per_lot = match patch.price_per_lot {
            Some(value) => Money::new(value).map_err(PortfolioError::InvalidInput)?.value(),
            None => existing.price_per_lot.parse().map_err(|e| {
                PortfolioError::Internal(format!("Bad stored price: {}", e))
            })?,
        };
        let total_amount = match patch.total_amount {
            Some(value) => Money::new(value).map_err(PortfolioError::InvalidInput)?.value(),
            None => existing.total_amount.parse().map_err(|e| {
                PortfolioError::Internal(format!("Bad stored total: {}", e))
            })?,
        };

        let new_position = reconcile(
            current,
            &PositionEvent::Update {
                old_kind,
                old_quantity,
                new_kind,
                new_quantity: new_quantity_lots,
            },
        )?;

        let record = self
            .transactions
            .update_reconciled(
                transaction_id,
                UpdateTransaction {
                    kind: new_kind,
                    transaction_date: patch
                        .transaction_date
                        .unwrap_or(existing.transaction_date),
                    quantity_lots: new_quantity_lots,
                    price_per_lot,
                    total_amount,
                    notes: patch.notes.or(existing.notes),
                },
                &investment.id,
                new_position.value(),
            )
            .await?;

        info!(
            "Amended transaction {} on investment {}, position now {}",
            transaction_id, investment.id, new_position
        );
        Ok(CommittedTransaction {
            transaction: record,
            investment_quantity: new_position.value(),
        })
    }

    /// Remove a transaction, reversing its delta, and commit the reconciled
    /// position. Returns the investment's new quantity.
    pub async fn remove_transaction(
        &self,
        user_id: &str,
        transaction_id: &str,
    ) -> Result<Decimal, PortfolioError> {
        let (existing, investment, _client) =
            self.require_transaction(user_id, transaction_id).await?;

        let lock = self.investment_lock(&investment.id).await;
        let _guard = lock.lock().await;

        let existing = self
            .transactions
            .get(&existing.id)
            .await?
            .ok_or(PortfolioError::NotFound {
                entity: "Transaction",
            })?;
        let current = self
            .investments
            .get(&investment.id)
            .await?
            .ok_or(PortfolioError::NotFound {
                entity: "Investment",
            })?
            .quantity()?;

        let new_position = reconcile(
            current,
            &PositionEvent::Delete {
                kind: existing.transaction_type()?,
                quantity: existing.quantity_decimal()?,
            },
        )?;

        self.transactions
            .delete_reconciled(transaction_id, &investment.id, new_position.value())
            .await?;

        info!(
            "Removed transaction {} on investment {}, position now {}",
            transaction_id, investment.id, new_position
        );
        Ok(new_position.value())
    }

    // ---- Dashboard ----

    pub async fn dashboard_summary(
        &self,
        user_id: &str,
    ) -> Result<DashboardSummary, PortfolioError> {
        let investments = self.investments.list_for_user(user_id).await?;

        let mut total_portfolio_value = Decimal::ZERO;
        let mut total_acquisition_cost = Decimal::ZERO;
        for investment in &investments {
            let valuation = Valuation::of(
                investment.quantity()?,
                investment.acquisition_cost_amount()?,
                investment.current_value_amount()?,
            );
            total_portfolio_value += valuation.market_value;
            total_acquisition_cost += valuation.cost_basis;
        }

        Ok(DashboardSummary {
            total_clients: self.clients.count_for_user(user_id).await?,
            total_investments: investments.len() as i64,
            total_transactions: self.transactions.count_for_user(user_id).await?,
            total_portfolio_value,
            total_acquisition_cost,
            total_profit_loss: total_portfolio_value - total_acquisition_cost,
            recent_transactions: self.transactions.recent_for_user(user_id, 5).await?,
        })
    }

    // ---- Scoping helpers ----

    /// Load a client owned by the caller, or `NotFound`. Clients are looked
    /// up pre-scoped, so foreign clients are indistinguishable from absent
    /// ones.
    async fn require_client(
        &self,
        user_id: &str,
        client_id: &str,
    ) -> Result<ClientRecord, PortfolioError> {
        self.clients
            .get_for_user(client_id, user_id)
            .await?
            .ok_or(PortfolioError::NotFound { entity: "Client" })
    }

    /// Load an investment and its owning client, enforcing that the client
    /// belongs to the caller.
    async fn require_investment(
        &self,
        user_id: &str,
        investment_id: &str,
    ) -> Result<(InvestmentRecord, ClientRecord), PortfolioError> {
        let investment = self
            .investments
            .get(investment_id)
            .await?
            .ok_or(PortfolioError::NotFound {
                entity: "Investment",
            })?;

        let client = self
            .clients
            .get(&investment.client_id)
            .await?
            .ok_or(PortfolioError::NotFound { entity: "Client" })?;

        if client.user_id != user_id {
            return Err(PortfolioError::Unauthorized);
        }

        Ok((investment, client))
    }

    /// Load a transaction with its investment and client, enforcing
    /// ownership through the chain.
    async fn require_transaction(
        &self,
        user_id: &str,
        transaction_id: &str,
    ) -> Result<(TransactionRecord, InvestmentRecord, ClientRecord), PortfolioError> {
        let transaction = self
            .transactions
            .get(transaction_id)
            .await?
            .ok_or(PortfolioError::NotFound {
                entity: "Transaction",
            })?;

        let (investment, client) = self
            .require_investment(user_id, &transaction.investment_id)
            .await?;

        Ok((transaction, investment, client))
    }

    /// Lock handle serializing reconciliations for one investment.
    async fn investment_lock(&self, investment_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.investment_locks.lock().await;
        locks
            .entry(investment_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
