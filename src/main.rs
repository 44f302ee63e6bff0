use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use datasweep::config;
use datasweep::search::{discover, discovery, ConsoleOutput, Query, SearchCoordinator, SearchMode};

/// Search local CSV, JSON, text and SQLite data files / 本地多格式数据搜索
#[derive(Parser, Debug)]
#[command(name = "datasweep")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("DATASWEEP_BUILD_TIME"), ")"))]
#[command(about, long_about = None)]
struct Cli {
    /// Config file, created with defaults when missing
    #[arg(long, global = true, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the data folder
    Search {
        /// Search terms, case-insensitive
        #[arg(required = true)]
        terms: Vec<String>,

        /// How terms combine
        #[arg(long, value_enum, default_value_t = ModeArg::Any)]
        mode: ModeArg,

        /// Only search these file names (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,

        /// Data folder, overrides config.json
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Report folder, overrides config.json
        #[arg(long)]
        reports_dir: Option<PathBuf>,

        /// Per-file console limit in characters
        #[arg(long)]
        per_file_limit: Option<usize>,

        /// Deferred output limit in characters
        #[arg(long)]
        global_limit: Option<usize>,

        /// Worker threads for flat files
        #[arg(long)]
        workers: Option<usize>,
    },

    /// List discovered data files
    Files {
        /// Data folder, overrides config.json
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Any,
    All,
    Exact,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Any => SearchMode::Any,
            ModeArg::All => SearchMode::All,
            ModeArg::Exact => SearchMode::Exact,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never mix with results / 日志输出到 stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "datasweep=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration / 加载配置
    config::init_config(&cli.config)?;

    match cli.command {
        Command::Files { data_dir } => {
            if let Some(dir) = data_dir {
                config::update_config(|c| c.data.data_dir = dir.to_string_lossy().into_owned())?;
            }

            let app_config = config::config()?;
            let files = discover(&app_config.get_data_dir())?;
            if files.is_empty() {
                println!("No supported data files in {:?}.", app_config.get_data_dir());
            }
            for (i, file) in files.iter().enumerate() {
                println!("  {}. {} [{}]", i + 1, file.file_name(), file.kind().label());
            }
        }
        Command::Search {
            terms,
            mode,
            files,
            data_dir,
            reports_dir,
            per_file_limit,
            global_limit,
            workers,
        } => {
            // CLI 参数覆盖配置文件
            config::update_config(|c| {
                if let Some(dir) = data_dir {
                    c.data.data_dir = dir.to_string_lossy().into_owned();
                }
                if let Some(dir) = reports_dir {
                    c.data.reports_dir = dir.to_string_lossy().into_owned();
                }
                if let Some(limit) = per_file_limit {
                    c.search.per_file_threshold = limit;
                }
                if let Some(limit) = global_limit {
                    c.search.global_threshold = limit;
                }
                if workers.is_some() {
                    c.search.max_workers = workers;
                }
            })?;
            let app_config = config::config()?;

            let query = Query::new(&terms, mode.into())?;

            let data_dir = app_config.get_data_dir();
            let discovered = match discover(&data_dir) {
                Ok(found) => found,
                Err(e) => {
                    anyhow::bail!("Data folder {:?} is not readable ({}). Create it and move your files there.", data_dir, e);
                }
            };

            let selected = discovery::select(discovered, &files);
            if selected.is_empty() {
                println!("No data files to search in {:?}.", data_dir);
                return Ok(());
            }

            println!(
                "\nSearching {} files. Mode: {}. Query: {}",
                selected.len(),
                query.mode(),
                terms.join(" ")
            );

            let coordinator = SearchCoordinator::from_config(&app_config);
            let mut output = ConsoleOutput;
            let summary = coordinator.run(&query, &selected, &mut output).await;

            if !summary.failed_files.is_empty() {
                tracing::warn!("{} files could not be searched", summary.failed_files.len());
            }
        }
    }

    Ok(())
}
