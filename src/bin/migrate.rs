use anyhow::{anyhow, Result};
use std::env;
use std::io;
use std::path::Path;
use std::str::FromStr;
use study_camp_bot::config::Config;
use study_camp_bot::database::DatabaseManager;

/// Tables the bot cannot run without.
const REQUIRED_TABLES: &[&str] = &[
    "users",
    "groups",
    "custom_slots",
    "group_tasks",
    "group_participants",
    "group_task_participations",
    "schedule_trackers",
    "user_reminders",
    "camps",
    "camp_tasks",
    "camp_participants",
    "camp_task_participations",
    "camp_reports",
    "activity_log",
    "system_stats",
];

enum MigrateCommand {
    Up,
    Check,
    Reset,
    Help,
}

impl FromStr for MigrateCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "migrate" | "up" => Ok(MigrateCommand::Up),
            "check" => Ok(MigrateCommand::Check),
            "reset" => Ok(MigrateCommand::Reset),
            "help" | "--help" | "-h" => Ok(MigrateCommand::Help),
            other => Err(anyhow!("Unknown command: {other}")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    dotenvy::dotenv().ok();

    let command = match env::args().nth(1).as_deref().unwrap_or("migrate").parse::<MigrateCommand>() {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}");
            print_help();
            std::process::exit(1);
        }
    };

    match command {
        MigrateCommand::Up => run_migrations().await,
        MigrateCommand::Check => check_database().await,
        MigrateCommand::Reset => reset_database().await,
        MigrateCommand::Help => {
            print_help();
            Ok(())
        }
    }
}

/// File path behind a `sqlite:` or `sqlite://` URL.
fn sqlite_path(url: &str) -> Option<&str> {
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .map(|path| path.split('?').next().unwrap_or(path))
}

async fn connect() -> Result<DatabaseManager> {
    let config = Config::from_env()?;
    println!("📊 Database: {}", config.database_url);

    if let Some(parent) = sqlite_path(&config.database_url).and_then(|path| Path::new(path).parent()) {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            println!("📁 Creating directory: {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }

    DatabaseManager::new(&config.database_url)
        .await
        .map_err(|e| anyhow!("Failed to connect to database: {}", e))
}

async fn run_migrations() -> Result<()> {
    println!("🔧 Study camp bot - database migrations");

    let db = connect().await?;
    db.run_migrations()
        .await
        .map_err(|e| anyhow!("Migration failed: {}", e))?;

    println!("✅ Migrations completed successfully!");
    Ok(())
}

async fn check_database() -> Result<()> {
    println!("🔍 Checking database connection and schema...");

    let db = connect().await?;
    let tables: Vec<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&db.pool)
            .await?;

    let missing: Vec<&str> = REQUIRED_TABLES
        .iter()
        .copied()
        .filter(|table| !tables.iter().any(|name| name == table))
        .collect();

    if missing.is_empty() {
        println!("✅ All {} tables present", REQUIRED_TABLES.len());
    } else {
        println!("⚠️  Missing tables: {}", missing.join(", "));
        println!("💡 Run 'migrate up' to create the schema");
    }
    Ok(())
}

async fn reset_database() -> Result<()> {
    println!("⚠️  WARNING: This will delete ALL points, camps and schedules!");
    println!("🤔 Type 'yes' to continue:");

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    if input.trim().to_lowercase() != "yes" {
        println!("❌ Reset cancelled.");
        return Ok(());
    }

    let config = Config::from_env()?;
    let path = sqlite_path(&config.database_url)
        .ok_or_else(|| anyhow!("Reset is only supported for SQLite databases"))?;

    if Path::new(path).exists() {
        std::fs::remove_file(path)?;
        println!("🗑️  Deleted database file: {path}");
    }

    run_migrations().await?;
    println!("✅ Database reset completed!");
    Ok(())
}

fn print_help() {
    println!("📚 Study camp bot - database tool");
    println!();
    println!("USAGE:");
    println!("    migrate [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("    migrate, up    Run database migrations (default)");
    println!("    check          Verify that every table exists");
    println!("    reset          Delete and recreate the SQLite database");
    println!("    help           Show this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    DATABASE_URL   Database connection string (default: sqlite:./data/study_bot.db)");
}
