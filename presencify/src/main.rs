//! Presencify - Main entry point
//!
//! Serves the agency site (landing, pricing, contact, portals) and offers
//! management commands for the local SQL backend.

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, debug, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use presencify::config::{self, BackendKind, Config};
use presencify::db::Database;
use presencify::model::{AppRole, ProjectStatus};
use presencify::store::SharedBackend;
use presencify::store::hosted::HostedBackend;
use presencify::store::sql::{NewProject, SqlBackend};
use presencify::web::{AppState, run_server};

/// How often expired sessions are swept.
const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Presencify - agency site with pricing calculator and client portals
#[derive(Parser)]
#[command(name = "presencify")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value_os_t = Config::default_path())]
    config: PathBuf,

    /// Data directory for the database and logs
    #[arg(short, long, default_value_os_t = Config::default_data_dir())]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server
    Serve {
        /// Address to listen on (overrides config)
        #[arg(long)]
        listen: Option<SocketAddr>,
    },

    /// Generate a default configuration file
    InitConfig {
        /// Output path (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Account management (SQL backend)
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Project management (SQL backend)
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Contact submissions (SQL backend)
    Submissions {
        #[command(subcommand)]
        command: SubmissionCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create an account with the client role
    Create {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Also grant the admin role
        #[arg(long)]
        admin: bool,
    },

    /// Grant the admin role to an existing account
    GrantAdmin {
        email: String,
    },

    /// List accounts
    List,
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Create a project for a client
    Create {
        #[arg(long)]
        title: String,

        /// Email of the client account that owns the project
        #[arg(long)]
        client_email: String,

        #[arg(long)]
        description: Option<String>,

        /// planning, in-progress, completed or on-hold
        #[arg(long, default_value = "planning")]
        status: ProjectStatus,

        /// Budget in whole dollars
        #[arg(long)]
        budget: Option<u32>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum SubmissionCommands {
    /// Show the most recent contact submissions
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    match cli.command {
        Commands::Serve { listen } => {
            // Long-running: log to stdout and a rotating file
            init_daemon_logging(&cli.data_dir, filter)?;
            serve(&cli.config, &cli.data_dir, listen).await
        }
        Commands::InitConfig { output } => {
            init_cli_logging(filter);
            generate_config(output)
        }
        Commands::User { command } => {
            init_cli_logging(filter);
            let backend = open_sql_backend(&cli.config, &cli.data_dir).await?;
            handle_user_command(command, &backend).await
        }
        Commands::Project { command } => {
            init_cli_logging(filter);
            let backend = open_sql_backend(&cli.config, &cli.data_dir).await?;
            handle_project_command(command, &backend).await
        }
        Commands::Submissions { command } => {
            init_cli_logging(filter);
            let backend = open_sql_backend(&cli.config, &cli.data_dir).await?;
            handle_submission_command(command, &backend).await
        }
    }
}

/// Initialize logging for CLI commands (stdout only).
fn init_cli_logging(filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

/// Initialize logging for the server (stdout + rotating file).
fn init_daemon_logging(data_dir: &Path, filter: EnvFilter) -> Result<()> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    // Daily rotation, e.g. presencify.2026-01-15.log
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("presencify")
        .filename_suffix("log")
        .build(&log_dir)
        .with_context(|| "Failed to create log file appender")?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The writer must outlive every log call; the server runs until exit
    std::mem::forget(guard);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false)) // stdout
        .with(fmt::layer().with_target(true).with_ansi(false).with_writer(non_blocking)) // file
        .init();

    info!("Logging to: {}", log_dir.display());
    Ok(())
}

fn ensure_data_dir(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        info!("Created data directory: {}", data_dir.display());
    }
    Ok(())
}

async fn connect_sql(config: &Config, data_dir: &Path) -> Result<SqlBackend> {
    let database = Database::new(&config.database, data_dir).await?;
    Ok(SqlBackend::new(database.pool(), config.session.timeout_secs))
}

/// Open the local database for management commands.
async fn open_sql_backend(config_path: &Path, data_dir: &Path) -> Result<SqlBackend> {
    ensure_data_dir(data_dir)?;
    let config = Config::load(config_path)?;

    if config.backend.kind != BackendKind::Sql {
        bail!(
            "Management commands need backend.kind = \"sql\"; manage hosted users and projects in the hosted project instead"
        );
    }

    connect_sql(&config, data_dir).await
}

/// Run the web server
async fn serve(config_path: &Path, data_dir: &Path, listen_override: Option<SocketAddr>) -> Result<()> {
    ensure_data_dir(data_dir)?;
    let config = Config::load(config_path)?;

    let listen_addr: SocketAddr = match listen_override {
        Some(addr) => addr,
        None => config
            .server
            .listen_addr
            .parse()
            .with_context(|| format!("Invalid listen address: {}", config.server.listen_addr))?,
    };

    let (backend, sql_backend): (SharedBackend, Option<Arc<SqlBackend>>) =
        match config.backend.kind {
            BackendKind::Sql => {
                let sql = Arc::new(connect_sql(&config, data_dir).await?);
                let shared: SharedBackend = sql.clone();
                (shared, Some(sql))
            }
            BackendKind::Hosted => {
                let hosted = config
                    .hosted
                    .as_ref()
                    .ok_or_else(|| anyhow!("backend.kind = \"hosted\" requires a [hosted] section"))?;
                let client = HostedBackend::new(hosted).context("Failed to build hosted client")?;
                info!(url = %hosted.url, "Using hosted backend");
                let shared: SharedBackend = Arc::new(client);
                (shared, None)
            }
        };

    let state = Arc::new(AppState::new(backend, &config));

    info!("Presencify starting...");

    // Spawn cleanup task for expired sessions (the hosted service expires its own)
    if let Some(sql) = sql_backend {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);

            loop {
                ticker.tick().await;

                match sql.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(n) => debug!("Removed {} expired sessions", n),
                    Err(e) => warn!("Failed to clean up expired sessions: {}", e),
                }
            }
        });
    }

    run_server(listen_addr, state).await
}

async fn handle_user_command(command: UserCommands, backend: &SqlBackend) -> Result<()> {
    match command {
        UserCommands::Create {
            email,
            password,
            name,
            admin,
        } => {
            let id = backend
                .create_account(&email, &password, name.as_deref())
                .await
                .context("Failed to create account")?;
            backend.grant_role(&id, AppRole::Client).await?;
            if admin {
                backend.grant_role(&id, AppRole::Admin).await?;
            }

            println!("Account created:");
            println!("  Email: {}", email.trim().to_lowercase());
            println!("  ID:    {}", id);
            println!("  Roles: {}", if admin { "client, admin" } else { "client" });
            Ok(())
        }

        UserCommands::GrantAdmin { email } => {
            let account = backend
                .find_account(&email)
                .await?
                .ok_or_else(|| anyhow!("No account with email {}", email))?;
            backend.grant_role(&account.id, AppRole::Admin).await?;
            println!("Granted admin role to {}.", account.email);
            Ok(())
        }

        UserCommands::List => {
            let accounts = backend.list_accounts().await?;

            if accounts.is_empty() {
                println!("No accounts.");
                return Ok(());
            }

            println!("{:<38} {:<32} {:<20} {:<17} {:<17}",
                "ID", "EMAIL", "NAME", "CREATED", "LAST LOGIN");
            println!("{}", "-".repeat(126));

            for account in accounts {
                let created = account.created_at.format("%Y-%m-%d %H:%M");
                let last_login = account
                    .last_login
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!("{:<38} {:<32} {:<20} {:<17} {:<17}",
                    account.id,
                    account.email,
                    account.full_name.as_deref().unwrap_or("-"),
                    created,
                    last_login);
            }

            Ok(())
        }
    }
}

async fn handle_project_command(command: ProjectCommands, backend: &SqlBackend) -> Result<()> {
    match command {
        ProjectCommands::Create {
            title,
            client_email,
            description,
            status,
            budget,
            start,
            end,
        } => {
            if let (Some(start), Some(end)) = (start, end)
                && end < start
            {
                bail!("End date {} is before start date {}", end, start);
            }

            let client = backend
                .find_account(&client_email)
                .await?
                .ok_or_else(|| anyhow!("No account with email {}", client_email))?;

            let id = backend
                .create_project(&NewProject {
                    title: title.clone(),
                    description,
                    status,
                    budget,
                    start_date: start,
                    end_date: end,
                    client_id: client.id,
                })
                .await
                .context("Failed to create project")?;

            println!("Project created:");
            println!("  Title:  {}", title);
            println!("  ID:     {}", id);
            println!("  Client: {}", client.email);
            println!("  Status: {}", status);
            Ok(())
        }
    }
}

async fn handle_submission_command(command: SubmissionCommands, backend: &SqlBackend) -> Result<()> {
    match command {
        SubmissionCommands::List { limit } => {
            let submissions = backend.list_submissions(limit).await?;

            if submissions.is_empty() {
                println!("No contact submissions.");
                return Ok(());
            }

            for s in submissions {
                println!("{} [{}] {} <{}>",
                    s.created_at.format("%Y-%m-%d %H:%M"), s.status, s.name, s.email);
                if let Some(company) = &s.company {
                    println!("  Company: {}", company);
                }
                if let Some(phone) = &s.phone {
                    println!("  Phone:   {}", phone);
                }
                if let Some(package) = &s.selected_package {
                    let addons = s
                        .selected_addons
                        .as_ref()
                        .filter(|a| !a.is_empty())
                        .map(|a| a.join(", "))
                        .unwrap_or_else(|| "none".to_string());
                    let total = s
                        .estimated_total
                        .map(presencify::pricing::format_usd)
                        .unwrap_or_else(|| "-".to_string());
                    println!("  Package: {} (add-ons: {}; est. {})", package, addons, total);
                }
                for line in s.message.lines() {
                    println!("  | {}", line);
                }
                println!();
            }

            Ok(())
        }
    }
}

fn generate_config(output: Option<PathBuf>) -> Result<()> {
    let config = config::default_config_template();

    match output {
        Some(path) => {
            std::fs::write(&path, &config)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Configuration written to: {}", path.display());
        }
        None => {
            print!("{}", config);
        }
    }

    Ok(())
}
