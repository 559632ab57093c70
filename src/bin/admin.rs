//! CLI administration tool for blog-backend.
//!
//! Provides commands for managing users and system settings and for database
//! diagnostics without going through the web interface.
//!
//! # Usage
//!
//! ```bash
//! # Create an admin user (prompts for the password)
//! cargo run --bin admin -- user create --username admin --admin
//!
//! # List users
//! cargo run --bin admin -- user list
//!
//! # Change a system setting
//! cargo run --bin admin -- setting set DenyArea "Example Region"
//!
//! # View statistics
//! cargo run --bin admin -- stats
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string
//!
//! Running servers pick up changed settings on their next refresh.

use blog_backend::application::services::UserService;
use blog_backend::domain::repositories::{SettingsRepository, UserRepository};
use blog_backend::infrastructure::persistence::{PgSettingsRepository, PgUserRepository};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{Confirm, Input, Password};
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing blog-backend.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage system settings
    Setting {
        #[command(subcommand)]
        action: SettingAction,
    },

    /// Show statistics
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// User management subcommands.
#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Login name
        #[arg(short, long)]
        username: Option<String>,

        /// Display name (defaults to the username)
        #[arg(short, long)]
        nick: Option<String>,

        /// Contact address
        #[arg(short, long)]
        email: Option<String>,

        /// Grant admin rights
        #[arg(long)]
        admin: bool,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List all users
    List,
}

/// System setting subcommands.
#[derive(Subcommand)]
enum SettingAction {
    /// Create or replace a setting
    Set { name: String, value: String },

    /// List all settings
    List,
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::User { action } => handle_user_action(action, &pool).await?,
        Commands::Setting { action } => handle_setting_action(action, &pool).await?,
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Dispatches user management commands.
async fn handle_user_action(action: UserAction, pool: &PgPool) -> Result<()> {
    let repo: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(Arc::new(pool.clone())));
    let service = UserService::new(repo);

    match action {
        UserAction::Create {
            username,
            nick,
            email,
            admin,
            yes,
        } => create_user(&service, username, nick, email, admin, yes).await?,
        UserAction::List => list_users(&service).await?,
    }

    Ok(())
}

/// Creates a user with interactive prompts.
///
/// The password is always read from the terminal, never from arguments, and
/// stored as an Argon2id hash.
async fn create_user(
    service: &UserService<dyn UserRepository>,
    username: Option<String>,
    nick: Option<String>,
    email: Option<String>,
    is_admin: bool,
    skip_confirm: bool,
) -> Result<()> {
    println!("{}", "👤 Create User".bright_blue().bold());
    println!();

    let username = match username {
        Some(u) => u,
        None => Input::new().with_prompt("Username").interact_text()?,
    };
    let nick = nick.unwrap_or_else(|| username.clone());

    let password = Password::new()
        .with_prompt("Password")
        .with_confirmation("Repeat password", "Passwords don't match")
        .interact()?;

    println!();
    println!("{}", "User details:".bright_white().bold());
    println!("  Username: {}", username.cyan());
    println!("  Nick:     {}", nick.cyan());
    println!(
        "  Email:    {}",
        email.as_deref().unwrap_or("-").bright_black()
    );
    println!(
        "  Role:     {}",
        if is_admin {
            "ADMIN".yellow().bold()
        } else {
            "USER".normal()
        }
    );
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Create this user?")
            .default(true)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let user = service
        .create_user(&username, &nick, email, &password, is_admin)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create user: {}", e))?;

    println!();
    println!(
        "{} (id {})",
        "✅ User created successfully!".green().bold(),
        user.id.to_string().bright_white()
    );
    println!();

    Ok(())
}

/// Lists all users with role and status.
///
/// # Output Format
///
/// ```text
/// 📋 Users
///
///   ID  Username             Nick                 Last login           Role
///   ──────────────────────────────────────────────────────────────────────────
///   1   admin                Site Admin           2025-01-15 10:30     ADMIN
/// ```
async fn list_users(service: &UserService<dyn UserRepository>) -> Result<()> {
    println!("{}", "📋 Users".bright_blue().bold());
    println!();

    let users = service
        .list_users()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list users: {}", e))?;

    if users.is_empty() {
        println!("{}", "  No users found".yellow());
        println!();
        println!(
            "  Create one with: {} admin user create --admin",
            "cargo run --bin".bright_cyan()
        );
        return Ok(());
    }

    println!(
        "  {:<3} {:<20} {:<20} {:<20} {:<10}",
        "ID".bright_white().bold(),
        "Username".bright_white().bold(),
        "Nick".bright_white().bold(),
        "Last login".bright_white().bold(),
        "Role".bright_white().bold()
    );
    println!("  {}", "─".repeat(80).bright_black());

    for user in &users {
        let role = if user.locked {
            "LOCKED".red()
        } else if user.is_admin {
            "ADMIN".yellow()
        } else {
            "USER".green()
        };
        let last_login = user
            .last_login_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        println!(
            "  {:<3} {:<20} {:<20} {:<20} {}",
            user.id.to_string().bright_black(),
            user.username.cyan(),
            user.nick_name,
            last_login.bright_black(),
            role
        );
    }

    println!();
    println!("  Total: {}", users.len().to_string().bright_white().bold());
    println!();

    Ok(())
}

/// Dispatches system setting commands.
async fn handle_setting_action(action: SettingAction, pool: &PgPool) -> Result<()> {
    let repo = PgSettingsRepository::new(Arc::new(pool.clone()));

    match action {
        SettingAction::Set { name, value } => {
            repo.set(&name, &value)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to save setting: {}", e))?;
            println!(
                "{} {} = {}",
                "✅ Saved".green().bold(),
                name.cyan(),
                value.bright_white()
            );
        }
        SettingAction::List => {
            println!("{}", "⚙️  System Settings".bright_blue().bold());
            println!();

            let mut settings = repo
                .load_all()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;
            settings.sort();

            for (name, value) in &settings {
                println!("  {:<24} {}", name.cyan(), value);
            }
            println!();
        }
    }

    Ok(())
}

/// Displays user, login and variable counts.
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let users_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    let logins_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM login_records WHERE login_time > NOW() - INTERVAL '30 days'",
    )
    .fetch_one(pool)
    .await?;

    let variables_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM variables")
        .fetch_one(pool)
        .await?;

    println!(
        "  Users:            {}",
        users_count.to_string().bright_green().bold()
    );
    println!(
        "  Logins (30 days): {}",
        logins_count.to_string().bright_green().bold()
    );
    println!(
        "  Variables:        {}",
        variables_count.to_string().bright_green().bold()
    );
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!();
        }
    }

    Ok(())
}
