//! RelayDesk CLI - Command-line admin console for the RelayDesk gateway
//!
//! Logs in against the gateway, keeps the session on disk between runs and browses
//! captured request content logs.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use relaydesk_api::{
    ApiClient, ApiClientConfig, HttpAuthBackend, RequestContentLogDetail,
    RequestContentLogFilters, RequestContentLogsApi, DEFAULT_PAGE, DEFAULT_PAGE_SIZE,
};
use relaydesk_core::format::{
    format_bytes, format_currency, format_date, format_number, format_relative_time,
    DEFAULT_DATE_PATTERN,
};
use relaydesk_core::{
    auth_error, config_error, init_logging, log_operation_error, ConsoleConfig, DurableStore,
    ErrorContext, LoginRequest, RegisterRequest, RelayDeskError, RelayDeskResult, User,
};
use relaydesk_session::{FileStore, RestoreOutcome, SessionManager};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "relaydesk")]
#[command(about = "Admin console for the RelayDesk API relay gateway")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    /// Create an account and log in
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        #[arg(short, long)]
        username: Option<String>,
    },

    /// End the stored session
    Logout,

    /// Show the account of the stored session
    Whoami,

    /// Keep the session alive and report identity changes until Ctrl-C
    Watch,

    /// Browse captured request content logs
    Logs {
        #[command(subcommand)]
        command: LogsCommand,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize default configuration
        #[arg(long)]
        init: bool,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[derive(Subcommand)]
enum LogsCommand {
    /// List captured requests, newest first
    List {
        #[arg(long, default_value_t = DEFAULT_PAGE)]
        page: u32,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,

        #[arg(long)]
        user_id: Option<i64>,

        #[arg(long)]
        api_key_id: Option<i64>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        platform: Option<String>,

        /// Session fingerprint
        #[arg(long)]
        session: Option<String>,

        /// Only requests at or after this RFC 3339 timestamp
        #[arg(long)]
        since: Option<DateTime<Utc>>,

        /// Only requests before this RFC 3339 timestamp
        #[arg(long)]
        until: Option<DateTime<Utc>>,
    },

    /// Show one captured request with its messages
    Show { id: i64 },

    /// Show every captured request of one conversation
    Session { fingerprint: String },
}

/// Wired-up session manager and gateway client
struct Console {
    manager: SessionManager,
    client: ApiClient,
}

impl Console {
    fn new(config: &ConsoleConfig) -> RelayDeskResult<Self> {
        let store: Arc<dyn DurableStore> =
            Arc::new(FileStore::new(config.storage.resolved_data_dir())?);

        let client =
            ApiClient::new(ApiClientConfig::from(&config.api))?.with_token_store(store.clone());
        let backend = Arc::new(HttpAuthBackend::new(client.clone()));
        let manager = SessionManager::new(backend, store, config.session.clone());

        Ok(Self { manager, client })
    }

    /// Restore the stored session or fail with a login hint
    async fn require_session(&self) -> RelayDeskResult<User> {
        session_user(self.manager.check_auth().await)
    }
}

fn session_user(outcome: RestoreOutcome) -> RelayDeskResult<User> {
    match outcome {
        RestoreOutcome::Restored { user } => Ok(user),
        RestoreOutcome::NoSession => Err(auth_error!("Not logged in", "cli")),
        RestoreOutcome::Discarded { error } => {
            warn!(error = %error, "Stored session was unreadable");
            Err(auth_error!(
                "Stored session was unreadable and has been cleared",
                "cli"
            ))
        }
    }
}

#[tokio::main]
async fn main() -> RelayDeskResult<()> {
    let cli = Cli::parse();

    let config = ConsoleConfig::load(cli.config.as_deref())?;

    let mut logging_config = config.logging.clone();
    if cli.verbose {
        logging_config.level = "debug".to_string();
        logging_config
            .filter_directives
            .retain(|directive| !directive.starts_with("relaydesk"));
    }

    init_logging(&logging_config).map_err(|e| RelayDeskError::Config {
        message: format!("Failed to initialize logging: {}", e),
        source: Some(e),
        context: ErrorContext::new("cli")
            .with_operation("init_logging")
            .with_suggestion("Check the [logging] section of your configuration"),
    })?;

    info!("Starting RelayDesk CLI v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Login { email, password } => handle_login(email, password, &config).await,
        Commands::Register {
            email,
            password,
            username,
        } => handle_register(email, password, username, &config).await,
        Commands::Logout => handle_logout(&config).await,
        Commands::Whoami => handle_whoami(&config).await,
        Commands::Watch => handle_watch(&config).await,
        Commands::Logs { command } => handle_logs(command, &config).await,
        Commands::Config {
            show,
            init,
            validate,
        } => handle_config(show, init, validate, &config).await,
    };

    if let Err(e) = &result {
        e.log();
        if let Some(context) = e.context() {
            for suggestion in &context.recovery_suggestions {
                eprintln!("hint: {}", suggestion);
            }
        }
    }

    result
}

async fn handle_login(
    email: String,
    password: String,
    config: &ConsoleConfig,
) -> RelayDeskResult<()> {
    let console = Console::new(config)?;
    let user = console
        .manager
        .login(&LoginRequest { email, password })
        .await?;

    println!("✅ Logged in as {}", user.display_string());
    if user.is_admin() {
        println!("🔑 Administrator access granted");
    }
    Ok(())
}

async fn handle_register(
    email: String,
    password: String,
    username: Option<String>,
    config: &ConsoleConfig,
) -> RelayDeskResult<()> {
    let console = Console::new(config)?;
    let user = console
        .manager
        .register(&RegisterRequest {
            email,
            password,
            username,
        })
        .await?;

    println!("✅ Registered and logged in as {}", user.display_string());
    Ok(())
}

async fn handle_logout(config: &ConsoleConfig) -> RelayDeskResult<()> {
    let console = Console::new(config)?;
    console.manager.restore().await;

    if let Some(e) = console.manager.logout().await {
        println!("⚠️  Gateway was not notified: {}", e);
    }
    println!("👋 Logged out");
    Ok(())
}

async fn handle_whoami(config: &ConsoleConfig) -> RelayDeskResult<()> {
    let console = Console::new(config)?;
    let (outcome, refreshed) = console.manager.restore_and_refresh().await;
    let cached = session_user(outcome)?;

    let user = match refreshed.unwrap_or(Ok(cached)) {
        Ok(user) => user,
        Err(e) if e.is_credential_rejected() => {
            println!("❌ Session expired, please log in again");
            return Err(e);
        }
        Err(e) => {
            log_operation_error!("whoami", e);
            let cached = console
                .manager
                .user()
                .await
                .ok_or_else(|| auth_error!("Not logged in", "cli"))?;
            println!("⚠️  Gateway unreachable, showing cached identity");
            cached
        }
    };

    print_user(&user);
    Ok(())
}

async fn handle_watch(config: &ConsoleConfig) -> RelayDeskResult<()> {
    let console = Console::new(config)?;
    let user = console.require_session().await?;

    println!(
        "👀 Watching session of {} (refresh every {}s, Ctrl-C to stop)",
        user.display_string(),
        config.session.refresh_interval_secs
    );

    let mut last_seen = Some(user);
    let mut ticker = tokio::time::interval(config.session.refresh_interval());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                signal?;
                println!("Stopping");
                break;
            }
            _ = ticker.tick() => {
                let current = console.manager.user().await;
                let now = format_date(Some(&Utc::now()), DEFAULT_DATE_PATTERN);
                match &current {
                    None => {
                        println!("[{}] ❌ Session ended", now);
                        break;
                    }
                    Some(user) if current != last_seen => {
                        println!("[{}] 🔄 Identity changed: {}", now, user.display_string());
                    }
                    Some(_) => {}
                }
                last_seen = current;
            }
        }
    }

    Ok(())
}

async fn handle_logs(command: LogsCommand, config: &ConsoleConfig) -> RelayDeskResult<()> {
    let console = Console::new(config)?;
    let user = console.require_session().await?;
    if !user.is_admin() {
        warn!("Request content logs require an administrator account");
    }

    let api = RequestContentLogsApi::new(console.client.clone());

    match command {
        LogsCommand::List {
            page,
            page_size,
            user_id,
            api_key_id,
            model,
            platform,
            session,
            since,
            until,
        } => {
            let filters = RequestContentLogFilters {
                user_id,
                api_key_id,
                model,
                platform,
                session_fingerprint: session,
                start_date: since,
                end_date: until,
            };
            let listing = api.list(page, page_size, &filters).await?;
            let now = Utc::now();

            for item in &listing.items {
                let who = item
                    .user_email
                    .clone()
                    .unwrap_or_else(|| format!("user #{}", item.user_id));
                println!(
                    "{:>8}  {}  {:>8}  {:<28}  {:<10}  {}  ({} msgs)",
                    item.id,
                    format_date(Some(&item.created_at), "YYYY-MM-DD HH:mm"),
                    format_relative_time(Some(item.created_at), now),
                    item.model,
                    item.platform,
                    who,
                    item.message_count.unwrap_or(0)
                );
            }
            println!(
                "📋 Page {}/{} · {} requests",
                listing.page,
                listing.pages.max(1),
                format_number(Some(listing.total as f64))
            );
        }
        LogsCommand::Show { id } => {
            let detail = api.get_by_id(id).await?;
            print_detail(&detail);
        }
        LogsCommand::Session { fingerprint } => {
            let conversation = api.get_session(&fingerprint).await?;
            if conversation.is_empty() {
                println!("No requests recorded for session {}", fingerprint);
            }
            for detail in &conversation {
                print_detail(detail);
                println!();
            }
        }
    }

    Ok(())
}

async fn handle_config(
    show: bool,
    init: bool,
    validate: bool,
    config: &ConsoleConfig,
) -> RelayDeskResult<()> {
    if init {
        let config_path = ConsoleConfig::default_path();
        ConsoleConfig::default().save_to_file(&config_path)?;
        println!("✅ Configuration initialized at: {:?}", config_path);
        println!("📝 Edit api.base_url to point at your gateway.");
    }

    if show {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| config_error!(format!("Failed to render configuration: {}", e), "cli"))?;
        println!("📋 Current configuration:");
        println!("{}", rendered);
    }

    if validate {
        match config.validate() {
            Ok(()) => println!("✅ Configuration is valid"),
            Err(e) => {
                println!("❌ Configuration validation failed: {}", e);
                return Err(e);
            }
        }
    }

    Ok(())
}

fn print_user(user: &User) {
    println!("👤 {}", user.display_string());
    println!("   id:    {}", user.id);
    println!("   role:  {}", user.role);
    if let Some(email) = user.profile_str("email") {
        println!("   email: {}", email);
    }
    if let Some(balance) = user.profile.get("balance").and_then(serde_json::Value::as_f64) {
        println!("   balance: {}", format_currency(Some(balance)));
    }
}

fn print_detail(detail: &RequestContentLogDetail) {
    let item = &detail.item;
    println!(
        "#{} · {} · {} · {}",
        item.id,
        item.model,
        item.platform,
        format_date(Some(&item.created_at), DEFAULT_DATE_PATTERN)
    );
    if let Some(fingerprint) = &item.session_fingerprint {
        println!("session: {}", fingerprint);
    }

    for message in detail.normalized_messages() {
        println!(
            "[{}] ({})",
            message.role,
            format_bytes(message.content.len() as u64, 1)
        );
        println!("{}", message.content);
    }
}
