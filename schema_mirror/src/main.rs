use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use schema_mirror::config::{self, Config, LoggingConfig};
use schema_mirror::db::connection::ConnectionParams;
use schema_mirror::utils::logging::init_logging;
use schema_mirror::{ConsoleConfirm, FixedAnswer, ReplicationOutcome, SchemaMirrorClient, TracingProgress};

/// Replicate the table layout of one PostgreSQL schema into another
#[derive(Debug, Parser)]
#[command(name = "schema_mirror", version, about)]
struct Cli {
    /// TOML configuration file; flags and environment variables override it
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Database driver
    #[arg(long, env = "DRIVER", global = true)]
    driver: Option<String>,

    /// Seconds to wait for each connection before giving up
    #[arg(long, global = true)]
    connect_timeout: Option<u64>,

    /// trace, debug, info, warn or error
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(flatten)]
    source: SourceArgs,

    #[command(flatten)]
    target: TargetArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Drop every table of the target schema and rebuild it from the source
    Replace {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
        /// Print the statements that would run and change nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// List tables that exist on only one side
    Diff {
        #[arg(long)]
        json: bool,
    },
    /// Write a .env file listing every supported variable
    Init {
        #[arg(long, default_value = ".env")]
        path: PathBuf,
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
struct SourceArgs {
    #[arg(long, env = "SOURCE_HOST", global = true)]
    source_host: Option<String>,
    #[arg(long, env = "SOURCE_PORT", global = true)]
    source_port: Option<u16>,
    #[arg(long, env = "SOURCE_DATABASE", global = true)]
    source_database: Option<String>,
    #[arg(long, env = "SOURCE_SCHEMA", global = true)]
    source_schema: Option<String>,
    #[arg(long, env = "SOURCE_USER", global = true)]
    source_user: Option<String>,
    #[arg(long, env = "SOURCE_PASSWORD", global = true, hide_env_values = true)]
    source_password: Option<String>,
}

#[derive(Debug, Args)]
struct TargetArgs {
    #[arg(long, env = "TARGET_HOST", global = true)]
    target_host: Option<String>,
    #[arg(long, env = "TARGET_PORT", global = true)]
    target_port: Option<u16>,
    #[arg(long, env = "TARGET_DATABASE", global = true)]
    target_database: Option<String>,
    #[arg(long, env = "TARGET_SCHEMA", global = true)]
    target_schema: Option<String>,
    #[arg(long, env = "TARGET_USER", global = true)]
    target_user: Option<String>,
    #[arg(long, env = "TARGET_PASSWORD", global = true, hide_env_values = true)]
    target_password: Option<String>,
}

#[allow(clippy::too_many_arguments)]
fn override_params(
    params: &mut ConnectionParams,
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    schema: Option<String>,
    user: Option<String>,
    password: Option<String>,
) {
    if let Some(host) = host {
        params.host = host;
    }
    if let Some(port) = port {
        params.port = port;
    }
    if let Some(database) = database {
        params.database = database;
    }
    if schema.is_some() {
        params.schema = schema;
    }
    if let Some(user) = user {
        params.user = user;
    }
    if password.is_some() {
        params.password = password;
    }
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => config::load_from_file(path)?,
            None => Config::default(),
        };

        if let Some(driver) = &self.driver {
            config.driver = driver.clone();
        }
        if let Some(timeout) = self.connect_timeout {
            config.replication.connect_timeout_seconds = timeout;
        }

        let s = &self.source;
        override_params(
            &mut config.source,
            s.source_host.clone(),
            s.source_port,
            s.source_database.clone(),
            s.source_schema.clone(),
            s.source_user.clone(),
            s.source_password.clone(),
        );
        let t = &self.target;
        override_params(
            &mut config.target,
            t.target_host.clone(),
            t.target_port,
            t.target_database.clone(),
            t.target_schema.clone(),
            t.target_user.clone(),
            t.target_password.clone(),
        );

        Ok(config)
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Command::Init { path, force } = &cli.command {
        config::write_env_template(path, *force)?;
        println!("{} created", path.display());
        return Ok(());
    }

    let config = cli.load_config()?;
    let logging = config.logging.clone().unwrap_or_else(|| LoggingConfig {
        level: cli.log_level.clone(),
        ..LoggingConfig::default()
    });
    init_logging(&logging)?;

    let client = SchemaMirrorClient::connect(config)
        .await
        .context("could not open database connections")?;

    let result = execute(&client, cli.command).await;
    client.close().await;
    result
}

async fn execute(client: &SchemaMirrorClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Replace { dry_run: true, .. } => {
            let plan = client.plan().await?;
            for statement in plan.statements() {
                println!("{}", statement.sql);
            }
        }
        Command::Replace { yes, .. } => {
            let outcome = if yes {
                client.replace(FixedAnswer(true), TracingProgress).await?
            } else {
                client.replace(ConsoleConfirm::stdio(), TracingProgress).await?
            };

            match outcome {
                ReplicationOutcome::Committed(report) => println!("{}", report),
                ReplicationOutcome::Aborted => println!("Nothing was changed"),
            }
        }
        Command::Diff { json } => {
            let diff = client.diff().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&diff)?);
            } else {
                print!("{}", diff);
            }
        }
        Command::Init { .. } => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Flags win over the environment, which wins over .env.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "schema_mirror failed");
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
