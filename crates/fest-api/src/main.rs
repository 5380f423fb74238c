//! # fest-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the festival ticketing service.
//! Every flag can also be given through the environment.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use zeroize::Zeroizing;

use fest_api::notify::{LogNotifier, MailRelayNotifier, Notifier};
use fest_api::state::{AppConfig, AppState, DEFAULT_EVENT_NAME};
use fest_api::store::PgRepository;
use fest_state::CooldownPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "fest-api", version, about = "Festival ticketing API server")]
struct Args {
    /// Port to bind.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// PostgreSQL URL. Without it the service keeps everything in memory.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// HMAC secret for admin session tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    #[arg(long, env = "ADMIN_EMAIL")]
    admin_email: String,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: String,

    /// Event name used in emails.
    #[arg(long, env = "EVENT_NAME", default_value = DEFAULT_EVENT_NAME)]
    event_name: String,

    /// Re-entry cooldown in hours.
    #[arg(long, env = "COOLDOWN_HOURS", default_value_t = fest_state::DEFAULT_COOLDOWN_HOURS)]
    cooldown_hours: i64,

    /// Admin session lifetime in minutes.
    #[arg(long, env = "SESSION_TTL_MINUTES", default_value_t = 120)]
    session_ttl_minutes: i64,

    /// Upper bound on one email dispatch, in seconds.
    #[arg(long, env = "NOTIFY_TIMEOUT_SECS", default_value_t = 10)]
    notify_timeout_secs: u64,

    /// Scans allowed per client address per minute.
    #[arg(long, env = "SCAN_RATE_LIMIT", default_value_t = 120)]
    scan_rate_limit: u64,

    /// Rate-limit on the last X-Forwarded-For hop. Only behind a trusted proxy.
    #[arg(long, env = "TRUST_FORWARDED_FOR", default_value_t = false)]
    trust_forwarded_for: bool,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("admin_email", &self.admin_email)
            .field("event_name", &self.event_name)
            .field("cooldown_hours", &self.cooldown_hours)
            .field("session_ttl_minutes", &self.session_ttl_minutes)
            .field("notify_timeout_secs", &self.notify_timeout_secs)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn build_config(args: &Args) -> anyhow::Result<AppConfig> {
    if args.session_ttl_minutes <= 0 {
        anyhow::bail!("SESSION_TTL_MINUTES must be positive");
    }
    let cooldown = CooldownPolicy::from_hours(args.cooldown_hours).context("invalid COOLDOWN_HOURS")?;
    let mut config = AppConfig {
        port: args.port,
        jwt_secret: Zeroizing::new(args.jwt_secret.clone()),
        admin_email: args.admin_email.clone(),
        admin_password: Zeroizing::new(args.admin_password.clone()),
        event_name: args.event_name.clone(),
        cooldown,
        session_ttl: chrono::Duration::minutes(args.session_ttl_minutes),
        notify_timeout: Duration::from_secs(args.notify_timeout_secs),
        ..AppConfig::default()
    };
    config.rate_limit.max_requests = args.scan_rate_limit;
    config.rate_limit.trust_forwarded_for = args.trust_forwarded_for;
    Ok(config)
}

fn build_notifier() -> anyhow::Result<Arc<dyn Notifier>> {
    match fest_mailer::MailerConfig::from_env() {
        Ok(mail_config) => {
            tracing::info!(relay = %mail_config.relay_url, "mail relay configured");
            let client = fest_mailer::MailerClient::new(mail_config)
                .context("failed to create mail relay client")?;
            Ok(Arc::new(MailRelayNotifier::new(client)))
        }
        Err(e) => {
            tracing::warn!("mail relay not configured: {e}. Notifications will only be logged.");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);
    tracing::debug!(?args, "starting");

    let config = build_config(&args)?;
    let port = config.port;

    // Initialize database pool (optional; absent means in-memory only).
    let db_pool = fest_api::db::init_pool(args.database_url.as_deref())
        .await
        .context("database initialization failed")?;

    let mut state = AppState::with_config(config).with_notifier(build_notifier()?);
    if let Some(pool) = db_pool {
        state = state.with_repository(Arc::new(PgRepository::new(pool)));
    }

    fest_api::auth::provision_admin(&state)
        .await
        .map_err(|e| anyhow::anyhow!("admin provisioning failed: {e}"))?;

    let app = fest_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("fest-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
