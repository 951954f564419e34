use chrono::{Duration, Utc};
use order_fellow_engine::{
    db_types::Principal,
    helpers::WEBHOOK_SECRET_PREFIX,
    CredentialApi,
    CredentialError,
    CredentialManagement,
    CredentialPolicy,
    SignatureError,
    SqliteDatabase,
    ACCOUNT_HEADER,
    SIGNATURE_HEADER,
};
use order_fellow_engine::test_utils::prepare_env::{prepare_test_env, random_db_path};

async fn setup() -> CredentialApi<SqliteDatabase> {
    let db = prepare_test_env(&random_db_path()).await;
    CredentialApi::new(db, CredentialPolicy::default())
}

/// Registers and approves an account, and returns its id and webhook secret.
async fn verified_account(api: &CredentialApi<SqliteDatabase>, email: &str, username: &str) -> (i64, String) {
    let account = api.register_account(email, username).await.unwrap();
    api.approve_verification(account.id).await.unwrap();
    let credential = api.fetch_or_issue_credential(account.id).await.unwrap();
    (account.id, credential.secret.reveal().clone())
}

#[tokio::test]
async fn registration_validates_input() {
    let api = setup().await;
    let err = api.register_account("not-an-email", " ").await.unwrap_err();
    match err {
        CredentialError::ValidationError(fields) => {
            assert!(fields.contains("email"));
            assert!(fields.contains("username"));
        },
        e => panic!("Unexpected error {e}"),
    }
    api.register_account("shop@example.com", "shop").await.unwrap();
    let err = api.register_account("SHOP@example.com", "other").await.unwrap_err();
    assert!(matches!(err, CredentialError::ValidationError(_)));
}

#[tokio::test]
async fn credentials_are_only_issued_to_verified_accounts() {
    let api = setup().await;
    let account = api.register_account("shop@example.com", "shop").await.unwrap();
    assert!(!account.is_active);
    assert!(!account.kyc_approved);
    let err = api.fetch_or_issue_credential(account.id).await.unwrap_err();
    assert!(matches!(err, CredentialError::AccountNotVerified(id) if id == account.id));
    assert!(matches!(api.fetch_or_issue_credential(9999).await, Err(CredentialError::AccountNotFound(9999))));

    let account = api.approve_verification(account.id).await.unwrap();
    assert!(account.is_verified());
    let credential = api.fetch_or_issue_credential(account.id).await.unwrap();
    assert!(credential.secret.reveal().starts_with(WEBHOOK_SECRET_PREFIX));
    assert!(credential.expires_at > Utc::now() + Duration::days(89));
    // Asking again returns the same secret
    let again = api.fetch_or_issue_credential(account.id).await.unwrap();
    assert_eq!(again.secret, credential.secret);
}

#[tokio::test]
async fn account_changes_are_visible_to_other_connections() {
    let api = setup().await;
    let account = api.register_account("shop@example.com", "shop").await.unwrap();
    api.approve_verification(account.id).await.unwrap();

    // A second pool never shares a connection with the one that made the writes
    let other = SqliteDatabase::new_with_url(api.db().url(), 1).await.unwrap();
    let reread = other.fetch_account_by_email("shop@example.com").await.unwrap().expect("account was not committed");
    assert_eq!(reread.id, account.id);
    assert!(reread.is_active);
    assert!(reread.kyc_approved);
    let credential = api.fetch_or_issue_credential(account.id).await.unwrap();
    let stored = other.fetch_active_credential(account.id).await.unwrap().unwrap();
    assert_eq!(stored.secret, credential.secret);
}

#[tokio::test]
async fn valid_signatures_authenticate() {
    let api = setup().await;
    let (id, secret) = verified_account(&api, "shop@example.com", "shop").await;
    let principal = api.verify_signature(Some("shop@example.com"), Some(&secret)).await.unwrap();
    assert_eq!(principal, Principal { account_id: id, email: "shop@example.com".into() });
    // Account lookup ignores case
    let principal = api.verify_signature(Some("Shop@Example.com"), Some(&secret)).await.unwrap();
    assert_eq!(principal.account_id, id);
    assert!(api.is_verified_caller(&principal).await.unwrap());
}

#[tokio::test]
async fn missing_headers() {
    let api = setup().await;
    let err = api.verify_signature(None, Some("whsk_abc")).await.unwrap_err();
    assert!(matches!(err, SignatureError::MissingCredentialHeader(h) if h == ACCOUNT_HEADER));
    let err = api.verify_signature(Some("shop@example.com"), None).await.unwrap_err();
    assert!(matches!(err, SignatureError::MissingCredentialHeader(h) if h == SIGNATURE_HEADER));
}

#[tokio::test]
async fn unknown_and_inactive_accounts() {
    let api = setup().await;
    let err = api.verify_signature(Some("nobody@example.com"), Some("whsk_abc")).await.unwrap_err();
    assert!(matches!(err, SignatureError::UnknownOrInactiveAccount));

    // Registered but never activated
    api.register_account("new@example.com", "new").await.unwrap();
    let err = api.verify_signature(Some("new@example.com"), Some("whsk_abc")).await.unwrap_err();
    assert!(matches!(err, SignatureError::UnknownOrInactiveAccount));

    // Deactivated after a secret was issued
    let (id, secret) = verified_account(&api, "gone@example.com", "gone").await;
    api.db().set_verification_status(id, false, true).await.unwrap();
    let err = api.verify_signature(Some("gone@example.com"), Some(&secret)).await.unwrap_err();
    assert!(matches!(err, SignatureError::UnknownOrInactiveAccount));
}

#[tokio::test]
async fn active_but_unapproved_accounts_are_not_verified_callers() {
    let api = setup().await;
    let (id, secret) = verified_account(&api, "shop@example.com", "shop").await;
    api.db().set_verification_status(id, true, false).await.unwrap();
    let principal = api.verify_signature(Some("shop@example.com"), Some(&secret)).await.unwrap();
    assert!(!api.is_verified_caller(&principal).await.unwrap());
}

#[tokio::test]
async fn wrong_secrets_are_rejected() {
    let api = setup().await;
    let (_, secret) = verified_account(&api, "shop@example.com", "shop").await;
    let mut almost = secret.clone();
    almost.pop();
    almost.push('!');
    let doubled = format!("{secret}{secret}");
    for attempt in ["", "x", "whsk_", almost.as_str(), doubled.as_str()] {
        let err = api.verify_signature(Some("shop@example.com"), Some(attempt)).await.unwrap_err();
        assert!(matches!(err, SignatureError::SignatureMismatch), "{attempt} was accepted");
    }
}

#[tokio::test]
async fn expired_secrets() {
    let api = setup().await;
    let (id, _) = verified_account(&api, "shop@example.com", "shop").await;
    let stale = "whsk_stale-secret";
    api.db().store_credential(id, stale, Utc::now() - Duration::minutes(1)).await.unwrap();

    let err = api.verify_signature(Some("shop@example.com"), Some(stale)).await.unwrap_err();
    assert!(matches!(err, SignatureError::CredentialExpired));
    let err = api.verify_signature(Some("shop@example.com"), Some("whsk_wrong")).await.unwrap_err();
    assert!(matches!(err, SignatureError::SignatureMismatch));

    // Verification never rotates the secret
    let stored = api.db().fetch_active_credential(id).await.unwrap().unwrap();
    assert_eq!(stored.secret.reveal(), stale);
    assert!(stored.is_expired());

    // An explicit fetch replaces the expired secret
    let fresh = api.fetch_or_issue_credential(id).await.unwrap();
    assert_ne!(fresh.secret.reveal(), stale);
    assert!(!fresh.is_expired());
    api.verify_signature(Some("shop@example.com"), Some(fresh.secret.reveal().as_str())).await.unwrap();
}

#[tokio::test]
async fn regenerating_replaces_the_secret() {
    let api = setup().await;
    let (id, old) = verified_account(&api, "shop@example.com", "shop").await;
    let new = api.regenerate_credential(id).await.unwrap();
    assert_ne!(new.secret.reveal(), &old);
    let err = api.verify_signature(Some("shop@example.com"), Some(&old)).await.unwrap_err();
    assert!(matches!(err, SignatureError::SignatureMismatch));
    api.verify_signature(Some("shop@example.com"), Some(new.secret.reveal().as_str())).await.unwrap();
}

#[tokio::test]
async fn custom_credential_lifetime() {
    let db = prepare_test_env(&random_db_path()).await;
    let api = CredentialApi::new(db, CredentialPolicy::with_lifetime_days(7));
    let (id, _) = verified_account(&api, "shop@example.com", "shop").await;
    let credential = api.db().fetch_active_credential(id).await.unwrap().unwrap();
    assert!(credential.expires_at < Utc::now() + Duration::days(8));
    assert!(credential.expires_at > Utc::now() + Duration::days(6));
}
