use clap::{Parser, ValueEnum};
use db_infra::{orchestrate_migration, DatabaseSettings, DbKind};
use migration::MigrationCommand;

#[derive(Clone, Copy, ValueEnum)]
enum Command {
    /// Sync entity tables, then apply pending migrations
    Up,
    /// Roll back the last migration
    Down,
    /// List applied and pending migrations
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum Db {
    Sqlite,
    Mysql,
}

#[derive(Parser)]
#[command(name = "migration-cli")]
#[command(about = "Ech0 database migration tool")]
struct Args {
    /// Migration command to run
    #[arg(value_enum)]
    command: Command,

    /// Database backend, same values as `database.type` in config.yaml
    #[arg(short, long, value_enum, env = "ECH0_DB_TYPE", default_value = "sqlite")]
    db: Db,

    /// SQLite file path, or the full MySQL connection URL
    #[arg(short, long, env = "ECH0_DB_PATH", default_value = "data/ech0.db")]
    path: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .without_time()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_env_filter("migration=info,db_infra=info,sqlx=warn")
        .init();

    let args = Args::parse();

    let command = match args.command {
        Command::Up => MigrationCommand::Up,
        Command::Down => MigrationCommand::Down,
        Command::Status => MigrationCommand::Status,
    };

    let kind = match args.db {
        Db::Sqlite => DbKind::Sqlite,
        Db::Mysql => DbKind::MySql,
    };

    let settings = DatabaseSettings {
        kind: kind.as_str().to_string(),
        path: args.path,
    };

    if let Err(e) = orchestrate_migration(&settings, command).await {
        eprintln!("Migration failed: {e}");
        std::process::exit(1);
    }
}
