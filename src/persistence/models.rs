//! Database Models
//!
//! Persistent data structures for users, sessions, clients, investments, and
//! transactions. Decimal columns are stored as TEXT; the typed accessors
//! parse them back into domain values and surface corruption as query errors.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::DatabaseError;
use crate::domain::entities::transaction::TransactionType;
use crate::domain::value_objects::{lots::Lots, money::Money};

/// User account record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Session record; only the SHA-256 digest of the bearer token is stored.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRecord {
    pub id: i64,
    pub token_digest: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Client record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClientRecord {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub brokerage_firms: String, // JSON array
    pub referral_source: Option<String>,
    pub notes: Option<String>,
    pub cash_position: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClientRecord {
    pub fn cash_position_amount(&self) -> Result<Money, DatabaseError> {
        self.cash_position.parse().map_err(|e| {
            DatabaseError::QueryError(format!("Bad cash position for client {}: {}", self.id, e))
        })
    }
}

/// Investment record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvestmentRecord {
    pub id: String,
    pub client_id: String,
    pub stock_name: String,
    pub stock_symbol: Option<String>,
    pub brokerage_firm: String,
    pub acquisition_date: DateTime<Utc>,
    pub quantity_lots: String,
    pub acquisition_cost: String,
    pub current_value: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvestmentRecord {
    pub fn quantity(&self) -> Result<Lots, DatabaseError> {
        self.quantity_lots.parse().map_err(|e| {
            DatabaseError::QueryError(format!("Bad quantity for investment {}: {}", self.id, e))
        })
    }

    pub fn acquisition_cost_amount(&self) -> Result<Money, DatabaseError> {
        self.acquisition_cost.parse().map_err(|e| {
            DatabaseError::QueryError(format!(
                "Bad acquisition cost for investment {}: {}",
                self.id, e
            ))
        })
    }

    pub fn current_value_amount(&self) -> Result<Option<Money>, DatabaseError> {
        match &self.current_value {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|e| {
                DatabaseError::QueryError(format!(
                    "Bad current value for investment {}: {}",
                    self.id, e
                ))
            }),
        }
    }
}

/// Transaction record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TransactionRecord {
    pub id: String,
    pub investment_id: String,
    pub client_id: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String, // "BUY" or "SELL"
    pub transaction_date: DateTime<Utc>,
    pub quantity_lots: String,
    pub price_per_lot: String,
    pub total_amount: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn transaction_type(&self) -> Result<TransactionType, DatabaseError> {
        self.kind.parse().map_err(|e| {
            DatabaseError::QueryError(format!("Bad type for transaction {}: {}", self.id, e))
        })
    }

    pub fn quantity_decimal(&self) -> Result<Decimal, DatabaseError> {
        self.quantity_lots.parse().map_err(|e| {
            DatabaseError::QueryError(format!("Bad quantity for transaction {}: {}", self.id, e))
        })
    }
}

/// Create user input
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Create session input
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub token_digest: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Create client input
#[derive(Debug, Clone)]
pub struct CreateClient {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub brokerage_firms: String,
    pub referral_source: Option<String>,
    pub notes: Option<String>,
    pub cash_position: Decimal,
}

/// Full-row client update; the caller merges partial edits onto the stored
/// record before handing it here.
#[derive(Debug, Clone)]
pub struct UpdateClient {
    pub full_name: String,
    pub phone_number: Option<String>,
    pub city: Option<String>,
    pub brokerage_firms: String,
    pub referral_source: Option<String>,
    pub notes: Option<String>,
    pub cash_position: Decimal,
}

/// Create investment input
#[derive(Debug, Clone)]
pub struct CreateInvestment {
    pub id: String,
    pub client_id: String,
    pub stock_name: String,
    pub stock_symbol: Option<String>,
    pub brokerage_firm: String,
    pub acquisition_date: DateTime<Utc>,
    pub quantity_lots: Decimal,
    pub acquisition_cost: Decimal,
    pub current_value: Option<Decimal>,
}

/// Full-row investment update. Quantity is deliberately absent: the stored
/// quantity changes only through reconciled transaction commits.
#[derive(Debug, Clone)]
pub struct UpdateInvestment {
    pub stock_name: String,
    pub stock_symbol: Option<String>,
    pub brokerage_firm: String,
    pub acquisition_date: DateTime<Utc>,
    pub acquisition_cost: Decimal,
    pub current_value: Option<Decimal>,
}

/// Create transaction input
#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub id: String,
    pub investment_id: String,
    pub client_id: String,
    pub kind: TransactionType,
    pub transaction_date: DateTime<Utc>,
    pub quantity_lots: Decimal,
    pub price_per_lot: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
}

/// Update transaction input
#[derive(Debug, Clone)]
pub struct UpdateTransaction {
    pub kind: TransactionType,
    pub transaction_date: DateTime<Utc>,
    pub quantity_lots: Decimal,
    pub price_per_lot: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
}
