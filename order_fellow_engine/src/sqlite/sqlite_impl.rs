//! `SqliteDatabase` is the concrete storage backend of the order engine.
//!
//! It uses SQLite and implements all the traits defined in the [`crate::traits`] module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{accounts, credentials, db_url, history, new_pool, orders};
use crate::{
    db_types::{
        BusinessAccount,
        DeletedOrder,
        NewBusinessAccount,
        NewOrder,
        Order,
        OrderId,
        OrderUpdated,
        StatusHistoryEntry,
        WebhookCredential,
    },
    lifecycle::TransitionPolicy,
    order_objects::{ModifyOrder, OrderQueryFilter},
    traits::{CallerVerification, CredentialError, CredentialManagement, OrderManagement, OrderStoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{}] has been saved with status {}", order.id, order.tracking_status);
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn search_orders(&self, query: &OrderQueryFilter) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::search_orders(query, &mut conn).await?;
        Ok(result)
    }

    async fn update_order(
        &self,
        order_id: &OrderId,
        update: ModifyOrder,
        policy: TransitionPolicy,
    ) -> Result<OrderUpdated, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        // This must be the first statement in the transaction. It takes the write lock before the status is read.
        let current = orders::lock_order_status(order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderStoreError::OrderNotFound(*order_id))?;
        let transition = match update.tracking_status {
            Some(requested) => policy.plan(current, requested)?,
            None => None,
        };
        let new_status = transition.map(|t| t.to);
        orders::update_order_fields(order_id, update.address, update.item_summary, new_status, &mut tx).await?;
        orders::update_customer_for_order(order_id, update.customer, &mut tx).await?;
        if let Some(status) = new_status {
            history::append_status(order_id, status, &mut tx).await?;
        }
        let order =
            orders::fetch_order(order_id, &mut tx).await?.ok_or_else(|| OrderStoreError::OrderNotFound(*order_id))?;
        tx.commit().await?;
        match transition {
            Some(t) => debug!("🗃️ Order [{order_id}] moved from {} to {}", t.from, t.to),
            None => trace!("🗃️ Order [{order_id}] updated. Tracking status unchanged at {current}"),
        }
        Ok(OrderUpdated { order, transition })
    }

    async fn delete_order(&self, order_id: &OrderId) -> Result<DeletedOrder, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let entries = history::delete_history_for_order(order_id, &mut tx).await?;
        let deleted =
            orders::delete_order(order_id, &mut tx).await?.ok_or_else(|| OrderStoreError::OrderNotFound(*order_id))?;
        tx.commit().await?;
        debug!("🗃️ Order [{order_id}] deleted along with {entries} status history entries");
        Ok(deleted)
    }

    async fn fetch_status_history(&self, order_id: &OrderId) -> Result<Vec<StatusHistoryEntry>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let entries = history::fetch_history_for_order(order_id, &mut conn).await?;
        Ok(entries)
    }
}

impl CredentialManagement for SqliteDatabase {
    async fn create_account(&self, account: NewBusinessAccount) -> Result<BusinessAccount, CredentialError> {
        let mut tx = self.pool.begin().await?;
        let account = accounts::insert_account(account, &mut tx).await?;
        tx.commit().await?;
        Ok(account)
    }

    async fn fetch_account(&self, account_id: i64) -> Result<Option<BusinessAccount>, CredentialError> {
        let mut conn = self.pool.acquire().await?;
        let account = accounts::fetch_account_by_id(account_id, &mut conn).await?;
        Ok(account)
    }

    async fn fetch_account_by_email(&self, email: &str) -> Result<Option<BusinessAccount>, CredentialError> {
        let mut conn = self.pool.acquire().await?;
        let account = accounts::fetch_account_by_email(email, &mut conn).await?;
        Ok(account)
    }

    async fn set_verification_status(
        &self,
        account_id: i64,
        is_active: bool,
        kyc_approved: bool,
    ) -> Result<BusinessAccount, CredentialError> {
        let mut tx = self.pool.begin().await?;
        let account = accounts::set_verification_status(account_id, is_active, kyc_approved, &mut tx)
            .await?
            .ok_or(CredentialError::AccountNotFound(account_id))?;
        tx.commit().await?;
        Ok(account)
    }

    async fn fetch_active_credential(&self, account_id: i64) -> Result<Option<WebhookCredential>, CredentialError> {
        let mut conn = self.pool.acquire().await?;
        let credential = credentials::fetch_active_credential(account_id, &mut conn).await?;
        Ok(credential)
    }

    async fn store_credential(
        &self,
        account_id: i64,
        secret: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<WebhookCredential, CredentialError> {
        let mut tx = self.pool.begin().await?;
        if accounts::fetch_account_by_id(account_id, &mut tx).await?.is_none() {
            return Err(CredentialError::AccountNotFound(account_id));
        }
        let credential = credentials::upsert_credential(account_id, secret, expires_at, &mut tx).await?;
        tx.commit().await?;
        Ok(credential)
    }
}

impl CallerVerification for SqliteDatabase {
    async fn is_verified_caller(&self, account_id: i64) -> Result<bool, CredentialError> {
        let account = self.fetch_account(account_id).await?;
        Ok(account.map(|a| a.is_verified()).unwrap_or(false))
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Brings the schema up to date. Safe to call on every startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
