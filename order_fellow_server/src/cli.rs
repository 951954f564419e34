use std::{env, env::VarError};

use log::info;
use order_fellow_engine::{db_types::WebhookCredential, CredentialApi, CredentialManagement, SqliteDatabase};

use crate::{config::ServerConfig, errors::ServerError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// No arguments. Run the server.
    Serve,
    /// Register a business account, approve it and print its webhook secret.
    Provision { email: String, username: String },
    /// Print an account's webhook secret, issuing a new one if the current secret has expired.
    Credential { email: String },
    /// Replace an account's webhook secret, whether or not it has expired.
    Rotate { email: String },
    /// Anything else. Help has already been printed.
    Help,
}

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> CliCommand {
    let command = parse_args(env::args().skip(1));
    if command == CliCommand::Help {
        display_readme();
        display_envs();
    }
    command
}

pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> CliCommand {
    let args = args.into_iter().collect::<Vec<_>>();
    match args.as_slice() {
        [] => CliCommand::Serve,
        [cmd, email, username] if cmd == "provision" => {
            CliCommand::Provision { email: email.clone(), username: username.clone() }
        },
        [cmd, email] if cmd == "credential" => CliCommand::Credential { email: email.clone() },
        [cmd, email] if cmd == "rotate" => CliCommand::Rotate { email: email.clone() },
        _ => CliCommand::Help,
    }
}

/// Creates a verified business account and issues its first webhook secret.
pub async fn provision_account(
    config: &ServerConfig,
    email: &str,
    username: &str,
) -> Result<WebhookCredential, ServerError> {
    let api = open_credential_api(config).await?;
    let account = api.register_account(email, username).await?;
    info!("🔐️ Registered business account #{} for {}", account.id, account.email);
    let account = api.approve_verification(account.id).await?;
    let credential = api.fetch_or_issue_credential(account.id).await?;
    Ok(credential)
}

/// Fetches the webhook secret of an existing account. An expired secret is replaced, as is a valid one if `rotate` is
/// set.
pub async fn issue_credential(
    config: &ServerConfig,
    email: &str,
    rotate: bool,
) -> Result<WebhookCredential, ServerError> {
    let api = open_credential_api(config).await?;
    let account = api
        .db()
        .fetch_account_by_email(email)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No business account is registered for {email}.")))?;
    let credential = if rotate {
        info!("🔐️ Rotating the webhook secret for account #{}", account.id);
        api.regenerate_credential(account.id).await?
    } else {
        api.fetch_or_issue_credential(account.id).await?
    };
    Ok(credential)
}

async fn open_credential_api(config: &ServerConfig) -> Result<CredentialApi<SqliteDatabase>, ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 1)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    Ok(CredentialApi::new(db, config.credential_policy))
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 11] = [
        "RUST_LOG",
        "MOF_HOST",
        "MOF_PORT",
        "MOF_DATABASE_URL",
        "MOF_DEFAULT_FROM_EMAIL",
        "MOF_EMAIL_BACKEND",
        "MOF_EMAIL_MAX_RETRIES",
        "MOF_EMAIL_RETRY_DELAY_SECS",
        "MOF_WEBHOOK_RATE_LIMIT",
        "MOF_ALLOW_BACKWARD_TRANSITIONS",
        "MOF_CREDENTIAL_LIFETIME_DAYS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
