use dotenvy::dotenv;
use log::{error, info};
use order_fellow_server::{
    cli::{handle_command_line_args, issue_credential, provision_account, CliCommand},
    config::ServerConfig,
    server::run_server,
};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let command = handle_command_line_args();
    let config = ServerConfig::from_env_or_default();
    match command {
        CliCommand::Help => {},
        CliCommand::Provision { email, username } => match provision_account(&config, &email, &username).await {
            Ok(credential) => {
                println!("Account {email} is verified. Its webhook secret is");
                println!("{}", credential.secret.reveal());
                println!("The secret expires on {}", credential.expires_at);
            },
            Err(e) => {
                error!("🔐️ Could not provision account {email}. {e}");
                eprintln!("{e}");
            },
        },
        CliCommand::Credential { email } => print_credential(&config, &email, false).await,
        CliCommand::Rotate { email } => print_credential(&config, &email, true).await,
        CliCommand::Serve => {
            info!("🚀️ Starting server on {}:{}", config.host, config.port);
            match run_server(config).await {
                Ok(_) => println!("Bye!"),
                Err(e) => eprintln!("{e}"),
            }
        },
    }
}

async fn print_credential(config: &ServerConfig, email: &str, rotate: bool) {
    match issue_credential(config, email, rotate).await {
        Ok(credential) => {
            println!("The webhook secret for {email} is");
            println!("{}", credential.secret.reveal());
            println!("The secret expires on {}", credential.expires_at);
        },
        Err(e) => {
            error!("🔐️ Could not fetch a webhook secret for {email}. {e}");
            eprintln!("{e}");
        },
    }
}
