//! Operator CLI for the admin console
//!
//! - `provision <phone>` adds a phone number to the admin allow-list
//! - `login` walks through the OTP login interactively and checks access
//! - `access <token>` resolves the session gate for an existing token

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Input, Select};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use admin_core::common::normalize_and_validate;
use admin_core::config::Config;
use admin_core::domains::auth::models::AdminRecord;
use admin_core::domains::auth::{
    AccessDecision, AdminSessionGate, JwtService, NoticeKind, OtpFlow,
};
use admin_core::kernel::{
    AuthPolicy, BaseAuthBackend, BaseSmsVerifier, PostgresAuthBackend, ProxySmsVerifier,
    ServerDeps, TwilioAdapter,
};
use twilio::TwilioService;

#[derive(Parser)]
#[command(name = "admin_cli")]
#[command(about = "Admin console operator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a phone number to the admin allow-list
    Provision { phone: String },

    /// Log in with an OTP and check dashboard access
    Login,

    /// Check dashboard access for a session token
    Access { token: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Provision { phone } => provision(&phone, &pool).await,
        Commands::Login => login(&config, pool).await,
        Commands::Access { token } => {
            let gate = AdminSessionGate::new(auth_backend(&config, pool));
            print_decision(&gate.resolve_access(Some(&token)).await);
            Ok(())
        }
    }
}

fn auth_backend(config: &Config, pool: PgPool) -> Arc<dyn BaseAuthBackend> {
    let jwt_service = JwtService::new(&config.jwt_secret, config.jwt_issuer.clone())
        .with_ttl(chrono::Duration::hours(config.session_ttl_hours));
    Arc::new(PostgresAuthBackend::new(pool, jwt_service))
}

/// The OTP proxy when configured, Twilio Verify otherwise
fn sms_verifier(config: &Config) -> Result<Arc<dyn BaseSmsVerifier>> {
    if let Some(url) = &config.otp_proxy_url {
        return Ok(Arc::new(ProxySmsVerifier::new(
            url.clone(),
            config.otp_proxy_key.clone(),
        )));
    }
    let options = config
        .twilio_options()
        .context("Set OTP_PROXY_URL or the TWILIO_* credentials")?;
    Ok(Arc::new(TwilioAdapter::new(Arc::new(TwilioService::new(
        options,
    )))))
}

async fn provision(raw_phone: &str, pool: &PgPool) -> Result<()> {
    let phone_number = normalize_and_validate(raw_phone)
        .map_err(|_| anyhow::anyhow!("'{}' is not a valid Indian phone number", raw_phone))?;
    let record = AdminRecord::provision(&phone_number, pool).await?;

    println!(
        "{} {} (verified: {}, login attempts: {})",
        style("✓ Provisioned").green().bold(),
        record.phone_number,
        record.is_verified,
        record.login_attempts
    );
    Ok(())
}

async fn login(config: &Config, pool: PgPool) -> Result<()> {
    let term = Term::stdout();
    let theme = ColorfulTheme::default();

    let auth = auth_backend(config, pool);
    let deps = ServerDeps::new(
        auth.clone(),
        sms_verifier(config)?,
        AuthPolicy {
            require_provisioned_admin: config.require_provisioned_admin,
        },
    );
    let flow = OtpFlow::new(deps);

    let session = 'login: loop {
        // Phone entry until an OTP is on its way
        loop {
            let input: String = Input::with_theme(&theme)
                .with_prompt("Phone number")
                .interact_text_on(&term)?;
            let result = flow.request_code(&input).await;
            print_notice(&flow).await;
            if result.is_ok() {
                break;
            }
        }

        // Code entry until verified or the operator gives up
        loop {
            let code: String = Input::with_theme(&theme)
                .with_prompt("Verification code")
                .allow_empty(true)
                .interact_text_on(&term)?;
            if let Err(err) = flow.enter_code(&code).await {
                println!("{} {}", style(err.title()).red().bold(), err);
                continue 'login;
            }

            match flow.submit_code().await {
                Ok(session) => {
                    print_notice(&flow).await;
                    break 'login session;
                }
                Err(_) => print_notice(&flow).await,
            }

            let options = ["Try another code", "Resend code", "Quit"];
            let choice = Select::with_theme(&theme)
                .with_prompt("What next?")
                .items(&options)
                .default(0)
                .interact_on(&term)?;
            match choice {
                0 => {}
                1 => {
                    let resent = flow.resend_otp().await;
                    print_notice(&flow).await;
                    // A failed resend drops the flow back to phone entry
                    if resent.is_err() {
                        continue 'login;
                    }
                }
                _ => bail!("Login aborted"),
            }
        }
    };

    println!("{} {}", style("Session token:").bold(), session.token);

    let decision = AdminSessionGate::new(auth).resolve_access(Some(&session.token)).await;
    print_decision(&decision);
    Ok(())
}

async fn print_notice(flow: &OtpFlow) {
    if let Some(notice) = flow.last_notice().await {
        let title = match notice.kind {
            NoticeKind::Success => style(notice.title).green().bold(),
            NoticeKind::Error => style(notice.title).red().bold(),
        };
        println!("{} {}", title, notice.message);
    }
}

fn print_decision(decision: &AccessDecision) {
    match decision {
        AccessDecision::Granted {
            phone_number,
            session,
        } => println!(
            "{} {} (session {} expires {})",
            style("✓ Access granted").green().bold(),
            phone_number,
            session.id,
            session.expires_at
        ),
        AccessDecision::Denied { reason } => println!(
            "{} {}",
            style("✗ Access denied:").red().bold(),
            reason.message()
        ),
    }
}
