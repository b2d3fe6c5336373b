//! coefin-server entry point.
//!
//! Loads `.env`, reads all settings, connects the pool, applies the
//! startup migrations and serves until SIGTERM/Ctrl+C.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use coefin_core::settings::{
    AuthSettings, DbCredentials, DbSettings, ExternalApiSettings, MailSettings, ServerSettings,
};
use tracing_subscriber::EnvFilter;

use coefin_server::db::{migrations, pool, Db};
use coefin_server::external::RestClient;
use coefin_server::http::{run_server, AppState};
use coefin_server::mail::SmtpMailer;

#[derive(Parser, Debug)]
#[command(name = "coefin-server", version, about = "Company financial analytics API")]
struct Args {
    /// Override SERVER_BIND
    #[arg(long)]
    bind: Option<String>,

    /// Override SERVER_PORT
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,coefin_server=debug")),
        )
        .init();

    let args = Args::parse();

    let credentials = DbCredentials::from_env().context("database credentials")?;
    let db_settings = DbSettings::from_env().context("database settings")?;
    let mail_settings = MailSettings::from_env().context("mail settings")?;
    let auth_settings = AuthSettings::from_env().context("auth settings")?;
    let external_settings = ExternalApiSettings::from_env().context("external API settings")?;

    let mut server_settings = ServerSettings::from_env().context("server settings")?;
    if let Some(bind) = args.bind {
        server_settings.bind = bind;
    }
    if let Some(port) = args.port {
        server_settings.port = port;
    }

    let pg_pool = pool::create_pool(&credentials, &db_settings)
        .await
        .context("failed to connect to the database")?;
    migrations::run(&pg_pool)
        .await
        .context("failed to apply migrations")?;

    let mailer = SmtpMailer::new(&mail_settings, &auth_settings.sys_email)
        .map_err(|e| anyhow::anyhow!("failed to configure the mailer: {e}"))?;
    let external = RestClient::new(&external_settings)
        .map_err(|e| anyhow::anyhow!("failed to configure the provider client: {e}"))?;

    let state = AppState::new(
        Db::new(pg_pool, &db_settings),
        &auth_settings,
        Arc::new(mailer),
        external,
    );

    run_server(Arc::new(state), &server_settings)
        .await
        .context("server failed")?;
    Ok(())
}
