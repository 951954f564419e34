use chrono::{DateTime, Utc};
use mockall::mock;
use order_fellow_engine::{
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
    order_objects::{ModifyOrder, OrderQueryFilter},
    CallerVerification,
    CredentialError,
    CredentialManagement,
    OrderManagement,
    OrderStoreError,
    TransitionPolicy,
};

mock! {
    pub Backend {}
    impl Clone for Backend {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for Backend {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderStoreError>;
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError>;
        async fn search_orders(&self, query: &OrderQueryFilter) -> Result<Vec<Order>, OrderStoreError>;
        async fn update_order(&self, order_id: &OrderId, update: ModifyOrder, policy: TransitionPolicy) -> Result<OrderUpdated, OrderStoreError>;
        async fn delete_order(&self, order_id: &OrderId) -> Result<DeletedOrder, OrderStoreError>;
        async fn fetch_status_history(&self, order_id: &OrderId) -> Result<Vec<StatusHistoryEntry>, OrderStoreError>;
    }
    impl CredentialManagement for Backend {
        async fn create_account(&self, account: NewBusinessAccount) -> Result<BusinessAccount, CredentialError>;
        async fn fetch_account(&self, account_id: i64) -> Result<Option<BusinessAccount>, CredentialError>;
        async fn fetch_account_by_email(&self, email: &str) -> Result<Option<BusinessAccount>, CredentialError>;
        async fn set_verification_status(&self, account_id: i64, is_active: bool, kyc_approved: bool) -> Result<BusinessAccount, CredentialError>;
        async fn fetch_active_credential(&self, account_id: i64) -> Result<Option<WebhookCredential>, CredentialError>;
        async fn store_credential(&self, account_id: i64, secret: &str, expires_at: DateTime<Utc>) -> Result<WebhookCredential, CredentialError>;
    }
    impl CallerVerification for Backend {
        async fn is_verified_caller(&self, account_id: i64) -> Result<bool, CredentialError>;
    }
}
