use addinsync_lib::commands::{flag, log, manifest, sync};
use addinsync_lib::logging::{file_appender, get_log_dir, LogConfig};
use addinsync_lib::AppState;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "addinsync")]
#[command(about = "Keep locally installed addins in sync with a shared server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize every addin listed in the manifest
    Run {
        /// Manifest file (defaults to the configured one)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
        /// Run even if a sync already happened today
        #[arg(short, long)]
        force: bool,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the daily flag so the next run checks for updates
    Reset,
    /// Manage the manifest file
    Manifest {
        #[command(subcommand)]
        command: ManifestCommands,
    },
    /// Show or change logging settings
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
}

#[derive(Subcommand)]
enum ManifestCommands {
    /// Create a manifest template if none exists
    Init {
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },
    /// List the records of the manifest
    List {
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Print the current logging settings
    Show,
    /// Update logging settings
    Set {
        #[arg(long)]
        enabled: Option<bool>,
        #[arg(long)]
        level: Option<String>,
        /// Number of daily log files to keep
        #[arg(long)]
        retain: Option<usize>,
    },
}

/// 初始化日志系统
fn init_logging(config_dir: &Path) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let config = LogConfig::load(config_dir);

    if !config.enabled {
        // 日志已禁用，只初始化一个空的 subscriber
        let _ = tracing::subscriber::set_global_default(tracing_subscriber::registry());
        return None;
    }

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(config.tracing_level().into());

    let log_dir = get_log_dir(config_dir);
    let _ = std::fs::create_dir_all(&log_dir);

    // 文件日志创建失败时仅输出到控制台
    let (file_layer, guard) = match file_appender(&log_dir, &config) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("无法创建日志文件: {}", e);
            (None, None)
        }
    };

    // 在 debug 模式下也输出到控制台
    let console_layer = (cfg!(debug_assertions) || file_layer.is_none()).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer);
    let _ = tracing::subscriber::set_global_default(subscriber);

    guard
}

fn execute(state: &AppState, command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            manifest,
            force,
            json,
        } => {
            let options = sync::RunOptions { manifest, force };
            let result = sync::run_sync(state, &options)?;

            if json {
                if let sync::RunResult::Completed(report) = &result {
                    println!("{}", serde_json::to_string_pretty(report)?);
                    return Ok(());
                }
            }
            match (&result, result.notification()) {
                (_, Some(message)) => println!("{}", message),
                (sync::RunResult::AlreadyRanToday, None) => {
                    println!("Already checked for updates today. Use --force to run again.")
                }
                (_, None) => println!("All addins are up to date."),
            }
        }
        Commands::Reset => {
            if flag::reset_flag(state)? {
                println!("The next run will check for updates.");
            } else {
                println!("No flag file found.");
            }
        }
        Commands::Manifest { command } => match command {
            ManifestCommands::Init { manifest: path } => {
                match manifest::init_manifest(state, path.as_deref())? {
                    manifest::InitResult::Created(p) => println!("Created {}", p.display()),
                    manifest::InitResult::AlreadyExists(p) => {
                        println!("{} already exists", p.display())
                    }
                }
            }
            ManifestCommands::List { manifest: path } => {
                let parsed = manifest::list_manifest(state, path.as_deref())?;
                for r in &parsed.records {
                    println!(
                        "{} <- {}\n{} <- {}",
                        r.local_descriptor.display(),
                        r.remote_descriptor.display(),
                        r.local_binary.display(),
                        r.remote_binary.display()
                    );
                }
                for row in &parsed.skipped {
                    println!("line {} skipped: {}", row.line, row.reason);
                }
            }
        },
        Commands::Log { command } => {
            let config = match command {
                LogCommands::Show => log::get_log_config(state),
                LogCommands::Set {
                    enabled,
                    level,
                    retain,
                } => log::set_log_config(state, enabled, level, retain)?,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&config).context("序列化日志配置失败")?
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let state = match AppState::new() {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Failed to initialize application state: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    // 初始化日志系统
    let _guard = init_logging(&state.config_dir);

    match execute(&state, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
