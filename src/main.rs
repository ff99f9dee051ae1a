use authadmin::{
    config::AdminConfig,
    error::{AppError, Result},
    models::User,
    runner::run_task,
    services::{
        credential_auditor::CredentialReport,
        diagnostics::{self, DiagnosticsError, LoginProbe},
        password_reset_service::ResetOutcome,
        schema_inspector::{ColumnSpec, TableInfo},
        user_service::{CreateUserRequest, PromoteOutcome},
    },
    AdminContext,
};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "authadmin")]
#[command(about = "Admin and diagnostic tasks for the users/auth store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and extend the store schema
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },

    /// User management commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// End-to-end smoke checks
    Probe {
        #[command(subcommand)]
        command: ProbeCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// List tables and their columns
    Tables,

    /// Show the columns of one table
    Describe {
        #[arg(short, long)]
        table: String,
    },

    /// Add a column if missing and make sure its index exists
    EnsureColumn {
        #[arg(short, long)]
        table: String,

        #[arg(short, long)]
        column: String,

        /// Declared column type, e.g. TEXT or VARCHAR(255)
        #[arg(long = "sql-type")]
        sql_type: String,

        /// Back the column with a unique index
        #[arg(long)]
        unique: bool,

        /// SQL literal used as the column default
        #[arg(long)]
        default: Option<String>,
    },

    /// Ensure the identity columns on the users table
    Upgrade,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long, default_value = "")]
        name: String,

        /// Password (will prompt if neither this nor --google-id is given)
        #[arg(short, long)]
        password: Option<String>,

        /// Link the account to a Google identity instead of a password
        #[arg(long)]
        google_id: Option<String>,

        /// Profile picture URL
        #[arg(long)]
        profile_picture: Option<String>,

        /// Mark email as verified
        #[arg(long)]
        verified: bool,
    },

    /// List all users
    List {
        /// Maximum number of users to display
        #[arg(short, long, default_value_t = 100)]
        limit: i64,

        /// Offset for pagination
        #[arg(short = 'o', long, default_value_t = 0)]
        offset: i64,
    },

    /// Report credential presence for the given accounts
    Audit {
        /// Email address (repeatable)
        #[arg(short, long = "email", required = true)]
        emails: Vec<String>,
    },

    /// Grant the admin role and set a new password
    Promote {
        #[arg(short, long)]
        email: String,

        /// New password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Set a new password and revoke every session of the user
    ResetPassword {
        #[arg(short, long)]
        email: String,

        /// New password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProbeCommands {
    /// Log in with known credentials and report the outcome
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Check the shape of the store statistics
    Stats,
}

fn get_password(prompt: &str) -> Result<String> {
    use std::io::{self, Write};
    print!("{}: ", prompt);
    io::stdout()
        .flush()
        .map_err(|e| AppError::Input(e.to_string()))?;

    rpassword::read_password().map_err(|e| AppError::Input(e.to_string()))
}

fn resolve_password(provided: Option<String>, prompt: &str, confirm: bool) -> Result<String> {
    if let Some(password) = provided {
        return Ok(password);
    }

    let password = get_password(prompt)?;
    if confirm && password != get_password("Confirm password")? {
        return Err(AppError::Input("Passwords do not match".to_string()));
    }
    Ok(password)
}

async fn with_context<T, F, Fut>(config: &AdminConfig, name: &str, task: F) -> Result<T>
where
    F: FnOnce(AdminContext) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    run_task(config, name, |db| async move {
        let ctx = AdminContext::from_config(db, config)?;
        task(ctx).await
    })
    .await
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authadmin=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AdminConfig::from_env()?;

    match cli.command {
        Commands::Schema { command } => run_schema(&config, command).await,
        Commands::User { command } => run_user(&config, command).await,
        Commands::Probe { command } => run_probe(&config, command).await,
    }
}

async fn run_schema(config: &AdminConfig, command: SchemaCommands) -> Result<()> {
    match command {
        SchemaCommands::Tables => {
            let tables = with_context(config, "list-tables", |ctx| async move {
                Ok::<_, AppError>(ctx.schema_inspector.describe_all().await?)
            })
            .await?;

            if tables.is_empty() {
                println!("No tables found.");
            }
            for table in &tables {
                print_table(table);
            }
        }

        SchemaCommands::Describe { table } => {
            let info = with_context(config, "describe-table", |ctx| async move {
                Ok::<_, AppError>(ctx.schema_inspector.describe_table(&table).await?)
            })
            .await?;
            print_table(&info);
        }

        SchemaCommands::EnsureColumn {
            table,
            column,
            sql_type,
            unique,
            default,
        } => {
            let spec = ColumnSpec {
                table,
                column,
                sql_type,
                unique,
                default,
            };
            let outcome = with_context(config, "ensure-column", |ctx| {
                let spec = spec.clone();
                async move {
                    let outcome = ctx.schema_inspector.ensure_column(&spec).await?;
                    Ok::<_, AppError>(outcome)
                }
            })
            .await?;

            print_column_outcome(&spec, outcome.column_added, outcome.index_created);
        }

        SchemaCommands::Upgrade => {
            let results = with_context(config, "upgrade-schema", |ctx| async move {
                Ok::<_, AppError>(ctx.schema_inspector.upgrade_identity_columns().await?)
            })
            .await?;

            for (spec, outcome) in &results {
                print_column_outcome(spec, outcome.column_added, outcome.index_created);
            }
        }
    }

    Ok(())
}

async fn run_user(config: &AdminConfig, command: UserCommands) -> Result<()> {
    match command {
        UserCommands::Create {
            email,
            name,
            password,
            google_id,
            profile_picture,
            verified,
        } => {
            let password = match (&google_id, password) {
                (Some(_), _) => None,
                (None, provided) => Some(resolve_password(provided, "Password", true)?),
            };

            let request = CreateUserRequest {
                email,
                name,
                password,
                google_id,
                profile_picture,
                email_verified: verified,
            };

            let user = with_context(config, "create-user", |ctx| async move {
                Ok::<_, AppError>(ctx.user_service.create_user(request).await?)
            })
            .await?;

            println!("✅ User created successfully!");
            print_user(&user);
        }

        UserCommands::List { limit, offset } => {
            let users = with_context(config, "list-users", |ctx| async move {
                let users = ctx.user_service.list_users(Some(limit), Some(offset)).await?;
                Ok::<_, AppError>(users)
            })
            .await?;

            if users.is_empty() {
                println!("No users found.");
            } else {
                println!(
                    "{:<5} {:<40} {:<8} {:<8} {:<10} {:<20}",
                    "ID", "Email", "Role", "Provider", "Verified", "Created"
                );
                println!("{}", "-".repeat(96));
                for user in users {
                    println!(
                        "{:<5} {:<40} {:<8} {:<8} {:<10} {:<20}",
                        user.id,
                        user.email,
                        user.role,
                        user.auth_provider,
                        if user.email_verified { "Yes" } else { "No" },
                        user.created_at
                    );
                }
            }
        }

        UserCommands::Audit { emails } => {
            let reports = with_context(config, "audit-credentials", |ctx| async move {
                Ok::<_, AppError>(ctx.credential_auditor.audit(&emails).await?)
            })
            .await?;

            for report in &reports {
                print_report(report);
            }
        }

        UserCommands::Promote { email, password } => {
            let password = resolve_password(password, "New password", true)?;

            let outcome = with_context(config, "promote-admin", |ctx| {
                let email = email.clone();
                async move {
                    let outcome = ctx.user_service.promote_to_admin(&email, &password).await?;
                    Ok::<_, AppError>(outcome)
                }
            })
            .await?;

            match outcome {
                PromoteOutcome::Promoted(user) => {
                    println!("✅ User '{}' is now an admin!", email);
                    print_user(&user);
                }
                PromoteOutcome::NotFound => {
                    println!("⚠️  User '{}' not found", email);
                }
            }
        }

        UserCommands::ResetPassword { email, password } => {
            let password = resolve_password(password, "New password", true)?;

            let outcome = with_context(config, "reset-password", |ctx| {
                let email = email.clone();
                async move {
                    let outcome = ctx
                        .password_reset_service
                        .reset_password(&email, &password)
                        .await?;
                    Ok::<_, AppError>(outcome)
                }
            })
            .await?;

            match outcome {
                ResetOutcome::Reset(reset) => {
                    println!("✅ Password updated successfully for '{}'!", email);
                    if reset.hash_verified {
                        println!("  Hash verification: OK");
                    } else {
                        println!("  ⚠️  Hash verification FAILED for the stored credential");
                    }
                    println!("  Sessions revoked: {}", reset.sessions_revoked);
                }
                ResetOutcome::NotFound => {
                    println!("⚠️  User '{}' not found", email);
                }
            }
        }
    }

    Ok(())
}

async fn run_probe(config: &AdminConfig, command: ProbeCommands) -> Result<()> {
    match command {
        ProbeCommands::Login { email, password } => {
            let password = resolve_password(password, "Password", false)?;

            let probe = with_context(config, "probe-login", |ctx| {
                let email = email.clone();
                async move {
                    let probe =
                        diagnostics::probe_login(&ctx.auth_service, &email, &password).await;
                    Ok::<_, AppError>(probe)
                }
            })
            .await?;

            match probe {
                LoginProbe::Success {
                    user_id,
                    email,
                    name,
                    role,
                    token_prefix,
                } => {
                    println!("✅ Login successful!");
                    println!("  ID: {}", user_id);
                    println!("  Email: {}", email);
                    println!("  Name: {}", name);
                    println!("  Role: {}", role);
                    println!("  Token: {}", token_prefix);
                }
                LoginProbe::InvalidCredentials => {
                    println!("⚠️  Invalid credentials for '{}'", email);
                }
                LoginProbe::Failed(message) => {
                    println!("❌ Login failed: {}", message);
                }
            }
        }

        ProbeCommands::Stats => {
            let probe = with_context(config, "probe-stats", |ctx| async move {
                Ok::<_, AppError>(diagnostics::probe_stats(&ctx.db).await?)
            })
            .await?;

            let rendered =
                serde_json::to_string_pretty(&probe.stats).map_err(DiagnosticsError::from)?;
            println!("{}", rendered);
            for check in &probe.checks {
                println!(
                    "  {} {:<36} expected {:?}, got {:?}",
                    if check.passed() { "✅" } else { "❌" },
                    check.path,
                    check.expected,
                    check.actual
                );
            }
            if probe.all_passed() {
                println!("✅ All stats checks passed");
            } else {
                println!("⚠️  {} stats check(s) failed", probe.failures().count());
            }
        }
    }

    Ok(())
}

fn print_user(user: &User) {
    println!("  ID: {}", user.id);
    println!("  Email: {}", user.email);
    println!("  Name: {}", user.name);
    println!("  Role: {}", user.role);
    println!("  Provider: {}", user.auth_provider);
    println!("  Verified: {}", user.email_verified);
    println!("  Updated: {}", user.updated_at);
}

fn print_report(report: &CredentialReport) {
    if !report.found {
        println!("⚠️  {}: not found", report.email);
        return;
    }

    println!("👤 {}", report.email);
    if let Some(id) = report.user_id {
        println!("  ID: {}", id);
    }
    println!("  Has password: {}", report.has_password);
    println!(
        "  Hash prefix: {}",
        report.hash_prefix.as_deref().unwrap_or("N/A")
    );
    if let Some(provider) = report.auth_provider {
        println!("  Provider: {}", provider);
    }
    if let Some(role) = report.role {
        println!("  Role: {}", role);
    }
    if let Some(verified) = report.email_verified {
        println!("  Verified: {}", verified);
    }
    println!("  Google linked: {}", report.has_google_id);
}

fn print_table(table: &TableInfo) {
    println!("📋 {}", table.name);
    for column in &table.columns {
        println!(
            "  {:<24} {:<12} {}{}",
            column.name,
            column.sql_type,
            if column.notnull { "NOT NULL " } else { "" },
            if column.pk > 0 { "PRIMARY KEY" } else { "" }
        );
    }
}

fn print_column_outcome(spec: &ColumnSpec, column_added: bool, index_created: bool) {
    if column_added {
        println!("✅ Added column {}.{}", spec.table, spec.column);
    } else {
        println!("ℹ️  Column {}.{} already exists", spec.table, spec.column);
    }
    if index_created {
        println!("✅ Created index {}", spec.index_name());
    } else {
        println!("ℹ️  Index {} already exists", spec.index_name());
    }
}
