//! Database Repository
//!
//! Data access layer for users, sessions, clients, investments, and
//! transactions. The transaction repository owns the atomic pair of writes
//! that commits a reconciled position change.

use super::models::*;
use super::{DatabaseError, DbPool};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, error};

/// User repository
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user account
    pub async fn create(&self, user: CreateUser) -> Result<UserRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create user: {}", e);
            DatabaseError::QueryError(format!("Failed to create user: {}", e))
        })?;

        debug!("Created user: {}", record.id);
        Ok(record)
    }

    /// Get user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to look up user by email: {}", e);
                DatabaseError::QueryError(format!("Failed to look up user: {}", e))
            })?;

        Ok(record)
    }

    /// Get user by ID
    pub async fn get(&self, id: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get user {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to get user: {}", e))
            })?;

        Ok(record)
    }
}

/// Session repository
pub struct SessionRepository {
    pool: DbPool,
}

impl SessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store a new session
    pub async fn create(&self, session: CreateSession) -> Result<(), DatabaseError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO sessions (token_digest, user_id, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&session.token_digest)
        .bind(&session.user_id)
        .bind(now)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create session: {}", e);
            DatabaseError::QueryError(format!("Failed to create session: {}", e))
        })?;

        debug!("Created session for user {}", session.user_id);
        Ok(())
    }

    /// Look up an unexpired session by token digest
    pub async fn find_active(
        &self,
        token_digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SessionRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT * FROM sessions WHERE token_digest = ?1 AND expires_at > ?2",
        )
        .bind(token_digest)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to look up session: {}", e);
            DatabaseError::QueryError(format!("Failed to look up session: {}", e))
        })?;

        Ok(record)
    }
}

/// Client repository
pub struct ClientRepository {
    pool: DbPool,
}

impl ClientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new client
    pub async fn create(&self, client: CreateClient) -> Result<ClientRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, ClientRecord>(
            r#"
            INSERT INTO clients (
                id, user_id, full_name, phone_number, city, brokerage_firms,
                referral_source, notes, cash_position, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            RETURNING *
            "#,
        )
        .bind(&client.id)
        .bind(&client.user_id)
        .bind(&client.full_name)
        .bind(&client.phone_number)
        .bind(&client.city)
        .bind(&client.brokerage_firms)
        .bind(&client.referral_source)
        .bind(&client.notes)
        .bind(client.cash_position.to_string())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create client: {}", e);
            DatabaseError::QueryError(format!("Failed to create client: {}", e))
        })?;

        debug!("Created client: {} for user {}", record.id, record.user_id);
        Ok(record)
    }

    /// Get all clients owned by a user
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<ClientRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, ClientRecord>(
            "SELECT * FROM clients WHERE user_id = ?1 ORDER BY full_name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list clients for user {}: {}", user_id, e);
            DatabaseError::QueryError(format!("Failed to list clients: {}", e))
        })?;

        Ok(records)
    }

    /// Get a client by ID, scoped to its owning user
    pub async fn get_for_user(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Option<ClientRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, ClientRecord>(
            "SELECT * FROM clients WHERE id = ?1 AND user_id = ?2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get client {}: {}", id, e);
            DatabaseError::QueryError(format!("Failed to get client: {}", e))
        })?;

        Ok(record)
    }

    /// Get a client by ID regardless of owner (for ownership checks)
    pub async fn get(&self, id: &str) -> Result<Option<ClientRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, ClientRecord>("SELECT * FROM clients WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get client {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to get client: {}", e))
            })?;

        Ok(record)
    }

    /// Overwrite a client's editable fields
    pub async fn update(
        &self,
        id: &str,
        update: UpdateClient,
    ) -> Result<ClientRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, ClientRecord>(
            r#"
            UPDATE clients
            SET full_name = ?1, phone_number = ?2, city = ?3, brokerage_firms = ?4,
                referral_source = ?5, notes = ?6, cash_position = ?7, updated_at = ?8
            WHERE id = ?9
            RETURNING *
            "#,
        )
        .bind(&update.full_name)
        .bind(&update.phone_number)
        .bind(&update.city)
        .bind(&update.brokerage_firms)
        .bind(&update.referral_source)
        .bind(&update.notes)
        .bind(update.cash_position.to_string())
        .bind(now)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to update client {}: {}", id, e);
            DatabaseError::QueryError(format!("Failed to update client: {}", e))
        })?;

        debug!("Updated client: {}", id);
        Ok(record)
    }

    /// Delete a client; investments and transactions cascade
    pub async fn delete(&self, id: &str) -> Result<(), DatabaseError> {
        let rows_affected = sqlx::query("DELETE FROM clients WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete client {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to delete client: {}", e))
            })?
            .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::QueryError(format!("Client not found: {}", id)));
        }

        debug!("Deleted client: {}", id);
        Ok(())
    }

    /// Count clients owned by a user
    pub async fn count_for_user(&self, user_id: &str) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clients WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to count clients for user {}: {}", user_id, e);
                DatabaseError::QueryError(format!("Failed to count clients: {}", e))
            })?;

        Ok(row.0)
    }
}

/// Investment repository
pub struct InvestmentRepository {
    pool: DbPool,
}

impl InvestmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a new investment
    pub async fn create(
        &self,
        investment: CreateInvestment,
    ) -> Result<InvestmentRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, InvestmentRecord>(
            r#"
            INSERT INTO investments (
                id, client_id, stock_name, stock_symbol, brokerage_firm,
                acquisition_date, quantity_lots, acquisition_cost, current_value,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            RETURNING *
            "#,
        )
        .bind(&investment.id)
        .bind(&investment.client_id)
        .bind(&investment.stock_name)
        .bind(&investment.stock_symbol)
        .bind(&investment.brokerage_firm)
        .bind(investment.acquisition_date)
        .bind(investment.quantity_lots.to_string())
        .bind(investment.acquisition_cost.to_string())
        .bind(investment.current_value.map(|v| v.to_string()))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create investment: {}", e);
            DatabaseError::QueryError(format!("Failed to create investment: {}", e))
        })?;

        debug!("Created investment: {} ({})", record.id, record.stock_name);
        Ok(record)
    }

    /// Get investment by ID
    pub async fn get(&self, id: &str) -> Result<Option<InvestmentRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, InvestmentRecord>(
            "SELECT * FROM investments WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get investment {}: {}", id, e);
            DatabaseError::QueryError(format!("Failed to get investment: {}", e))
        })?;

        Ok(record)
    }

    /// Get all investments owned (through clients) by a user
    pub async fn list_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<InvestmentRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, InvestmentRecord>(
            r#"
            SELECT investments.* FROM investments
            JOIN clients ON clients.id = investments.client_id
            WHERE clients.user_id = ?1
            ORDER BY investments.stock_name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list investments for user {}: {}", user_id, e);
            DatabaseError::QueryError(format!("Failed to list investments: {}", e))
        })?;

        Ok(records)
    }

    /// Get all investments for one client
    pub async fn list_for_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<InvestmentRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, InvestmentRecord>(
            "SELECT * FROM investments WHERE client_id = ?1 ORDER BY stock_name ASC",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list investments for client {}: {}", client_id, e);
            DatabaseError::QueryError(format!("Failed to list investments: {}", e))
        })?;

        Ok(records)
    }

    /// Overwrite an investment's directly editable fields. The stored
    /// quantity is not touched here; it changes only through reconciled
    /// transaction commits.
    pub async fn update(
        &self,
        id: &str,
        update: UpdateInvestment,
    ) -> Result<InvestmentRecord, DatabaseError> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, InvestmentRecord>(
            r#"
            UPDATE investments
            SET stock_name = ?1, stock_symbol = ?2, brokerage_firm = ?3,
                acquisition_date = ?4, acquisition_cost = ?5, current_value = ?6,
                updated_at = ?7
            WHERE id = ?8
            RETURNING *
            "#,
        )
        .bind(&update.stock_name)
        .bind(&update.stock_symbol)
        .bind(&update.brokerage_firm)
        .bind(update.acquisition_date)
        .bind(update.acquisition_cost.to_string())
        .bind(update.current_value.map(|v| v.to_string()))
        .bind(now)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to update investment {}: {}", id, e);
            DatabaseError::QueryError(format!("Failed to update investment: {}", e))
        })?;

        debug!("Updated investment: {}", id);
        Ok(record)
    }

    /// Delete an investment; transactions cascade
    pub async fn delete(&self, id: &str) -> Result<(), DatabaseError> {
        let rows_affected = sqlx::query("DELETE FROM investments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete investment {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to delete investment: {}", e))
            })?
            .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::QueryError(format!(
                "Investment not found: {}",
                id
            )));
        }

        debug!("Deleted investment: {}", id);
        Ok(())
    }
}

/// Transaction repository
pub struct TransactionRepository {
    pool: DbPool,
}

impl TransactionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get transaction by ID
    pub async fn get(&self, id: &str) -> Result<Option<TransactionRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, TransactionRecord>(
            "SELECT * FROM transactions WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get transaction {}: {}", id, e);
            DatabaseError::QueryError(format!("Failed to get transaction: {}", e))
        })?;

        Ok(record)
    }

    /// Get all transactions owned (through investments and clients) by a user
    pub async fn list_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<TransactionRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT transactions.* FROM transactions
            JOIN investments ON investments.id = transactions.investment_id
            JOIN clients ON clients.id = investments.client_id
            WHERE clients.user_id = ?1
            ORDER BY transactions.transaction_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list transactions for user {}: {}", user_id, e);
            DatabaseError::QueryError(format!("Failed to list transactions: {}", e))
        })?;

        Ok(records)
    }

    /// Get transactions for one client, newest first
    pub async fn list_for_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<TransactionRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            "SELECT * FROM transactions WHERE client_id = ?1 ORDER BY transaction_date DESC",
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list transactions for client {}: {}", client_id, e);
            DatabaseError::QueryError(format!("Failed to list transactions: {}", e))
        })?;

        Ok(records)
    }

    /// Get transactions for one investment, newest first
    pub async fn list_for_investment(
        &self,
        investment_id: &str,
    ) -> Result<Vec<TransactionRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            "SELECT * FROM transactions WHERE investment_id = ?1 ORDER BY transaction_date DESC",
        )
        .bind(investment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Failed to list transactions for investment {}: {}",
                investment_id, e
            );
            DatabaseError::QueryError(format!("Failed to list transactions: {}", e))
        })?;

        Ok(records)
    }

    /// Get a user's most recent transactions (last N by date)
    pub async fn recent_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<TransactionRecord>, DatabaseError> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT transactions.* FROM transactions
            JOIN investments ON investments.id = transactions.investment_id
            JOIN clients ON clients.id = investments.client_id
            WHERE clients.user_id = ?1
            ORDER BY transactions.transaction_date DESC
            LIMIT ?2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to get recent transactions for {}: {}", user_id, e);
            DatabaseError::QueryError(format!("Failed to get recent transactions: {}", e))
        })?;

        Ok(records)
    }

    /// Count transactions owned by a user
    pub async fn count_for_user(&self, user_id: &str) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM transactions
            JOIN investments ON investments.id = transactions.investment_id
            JOIN clients ON clients.id = investments.client_id
            WHERE clients.user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to count transactions for user {}: {}", user_id, e);
            DatabaseError::QueryError(format!("Failed to count transactions: {}", e))
        })?;

        Ok(row.0)
    }

    /// Insert a transaction and write its investment's reconciled quantity
    /// as one database transaction. Neither write lands without the other.
    pub async fn create_reconciled(
        &self,
        transaction: CreateTransaction,
        new_quantity: Decimal,
    ) -> Result<TransactionRecord, DatabaseError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction commit: {}", e);
            DatabaseError::QueryError(format!("Failed to begin commit: {}", e))
        })?;

        let record = sqlx::query_as::<_, TransactionRecord>(
            r#"
            INSERT INTO transactions (
                id, investment_id, client_id, type, transaction_date,
                quantity_lots, price_per_lot, total_amount, notes,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            RETURNING *
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.investment_id)
        .bind(&transaction.client_id)
        .bind(transaction.kind.to_string())
        .bind(transaction.transaction_date)
        .bind(transaction.quantity_lots.to_string())
        .bind(transaction.price_per_lot.to_string())
        .bind(transaction.total_amount.to_string())
        .bind(&transaction.notes)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to insert transaction: {}", e);
            DatabaseError::QueryError(format!("Failed to insert transaction: {}", e))
        })?;

        Self::write_quantity(&mut tx, &transaction.investment_id, new_quantity, now).await?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction create: {}", e);
            DatabaseError::QueryError(format!("Failed to commit: {}", e))
        })?;

        debug!(
            "Created transaction {} and set investment {} quantity to {}",
            record.id, transaction.investment_id, new_quantity
        );
        Ok(record)
    }

    /// Update a transaction and write its investment's reconciled quantity
    /// as one database transaction.
    pub async fn update_reconciled(
        &self,
        id: &str,
        update: UpdateTransaction,
        investment_id: &str,
        new_quantity: Decimal,
    ) -> Result<TransactionRecord, DatabaseError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction commit: {}", e);
            DatabaseError::QueryError(format!("Failed to begin commit: {}", e))
        })?;

        let record = sqlx::query_as::<_, TransactionRecord>(
            r#"
            UPDATE transactions
            SET type = ?1, transaction_date = ?2, quantity_lots = ?3,
                price_per_lot = ?4, total_amount = ?5, notes = ?6, updated_at = ?7
            WHERE id = ?8
            RETURNING *
            "#,
        )
        .bind(update.kind.to_string())
        .bind(update.transaction_date)
        .bind(update.quantity_lots.to_string())
        .bind(update.price_per_lot.to_string())
        .bind(update.total_amount.to_string())
        .bind(&update.notes)
        .bind(now)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to update transaction {}: {}", id, e);
            DatabaseError::QueryError(format!("Failed to update transaction: {}", e))
        })?;

        Self::write_quantity(&mut tx, investment_id, new_quantity, now).await?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction update: {}", e);
            DatabaseError::QueryError(format!("Failed to commit: {}", e))
        })?;

        debug!(
            "Updated transaction {} and set investment {} quantity to {}",
            id, investment_id, new_quantity
        );
        Ok(record)
    }

    /// Delete a transaction and write its investment's reconciled quantity
    /// as one database transaction.
    pub async fn delete_reconciled(
        &self,
        id: &str,
        investment_id: &str,
        new_quantity: Decimal,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin transaction commit: {}", e);
            DatabaseError::QueryError(format!("Failed to begin commit: {}", e))
        })?;

        let rows_affected = sqlx::query("DELETE FROM transactions WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to delete transaction {}: {}", id, e);
                DatabaseError::QueryError(format!("Failed to delete transaction: {}", e))
            })?
            .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::QueryError(format!(
                "Transaction not found: {}",
                id
            )));
        }

        Self::write_quantity(&mut tx, investment_id, new_quantity, now).await?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction delete: {}", e);
            DatabaseError::QueryError(format!("Failed to commit: {}", e))
        })?;

        debug!(
            "Deleted transaction {} and set investment {} quantity to {}",
            id, investment_id, new_quantity
        );
        Ok(())
    }

    async fn write_quantity(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        investment_id: &str,
        new_quantity: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let rows_affected =
            sqlx::query("UPDATE investments SET quantity_lots = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(new_quantity.to_string())
                .bind(now)
                .bind(investment_id)
                .execute(&mut **tx)
                .await
                .map_err(|e| {
                    error!("Failed to write quantity for {}: {}", investment_id, e);
                    DatabaseError::QueryError(format!("Failed to write quantity: {}", e))
                })?
                .rows_affected();

        if rows_affected == 0 {
            return Err(DatabaseError::QueryError(format!(
                "Investment not found: {}",
                investment_id
            )));
        }

        Ok(())
    }
}
