use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use crossbeam::channel;
use log::{info, warn, LevelFilter};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use menu_harvester_core::download::{HttpFetcher, ImageTarget};
use menu_harvester_core::extract::{extract_with, parse_document, ExtractContext, ExtractorKind};
use menu_harvester_core::fs_access::{FileAccess, FileHandle, LocalFileAccess, PromptFileAccess};
use menu_harvester_core::monitor::{SessionKind, Watcher};
use menu_harvester_core::persistence::StoreHistory;
use menu_harvester_core::server::{self, ServerState};
use menu_harvester_core::{logging, Config, Harvester, WatchCommand};

#[derive(Parser)]
#[command(name = "menu-harvester")]
#[command(about = "Harvest storefront and product images from captured API payloads")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Write a rotating log file into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PayloadKind {
    /// Try product shapes first, then the storefront shape
    Auto,
    Store,
    Products,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch captured payload files and extract images whenever they change
    Watch {
        /// Storefront payload file
        #[arg(long)]
        store: Option<PathBuf>,

        /// Product payload files
        #[arg(long)]
        products: Vec<PathBuf>,

        /// Download everything collected into this directory on exit
        #[arg(long)]
        download_to: Option<PathBuf>,
    },

    /// Extract images from a payload file once and print them as JSON
    Extract {
        file: PathBuf,

        #[arg(long, value_enum, default_value = "auto")]
        kind: PayloadKind,
    },

    /// Extract from payload files once and download every image
    Download {
        /// Storefront payload file
        #[arg(long)]
        store: Option<PathBuf>,

        /// Product payload files
        #[arg(long)]
        products: Vec<PathBuf>,

        /// Destination directory
        #[arg(long)]
        to: PathBuf,

        /// Save one image only: avatar, header, "poster N" or "product NAME"
        #[arg(long)]
        only: Option<ImageTarget>,
    },

    /// List, load or clear the storefront history
    History {
        #[arg(long)]
        clear: bool,

        /// Make the history entry with this id current again
        #[arg(long, conflicts_with = "clear")]
        load: Option<String>,
    },

    /// Show or clear the current storefront
    Current {
        #[arg(long)]
        clear: bool,
    },

    /// Serve the check-update / extract-images endpoints for one file
    Serve {
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        port: Option<u16>,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "menu-harvester.json")]
        path: PathBuf,
    },
}

fn main() -> Result<(), anyhow::Error> {
    dotenv::dotenv().ok();

    // Parse command line arguments
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.validate()?;

    // Set log level based on verbosity
    let level = match cli.verbose {
        0 => config.log_level.to_level_filter(),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    init_logging(cli.log_dir.as_deref(), level)?;

    match cli.command {
        Commands::Watch {
            store,
            products,
            download_to,
        } => watch(config, store, products, download_to),
        Commands::Extract { file, kind } => extract(&config, &file, kind),
        Commands::Download {
            store,
            products,
            to,
            only,
        } => download(config, store, products, to, only),
        Commands::History { clear, load } => history(&config, clear, load),
        Commands::Current { clear } => current(&config, clear),
        Commands::Serve { file, port } => serve(&config, file, port),
        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}

fn init_logging(log_dir: Option<&Path>, level: LevelFilter) -> anyhow::Result<()> {
    match log_dir {
        Some(dir) => logging::init_logger(dir, level)
            .map_err(|e| anyhow!("Failed to initialize logger: {}", e)),
        None => {
            env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or(level.to_string()),
            )
            .init();
            Ok(())
        }
    }
}

fn http_fetcher(config: &Config) -> anyhow::Result<HttpFetcher> {
    let timeout = config.request_timeout_secs.map(Duration::from_secs);
    Ok(HttpFetcher::new(timeout)?)
}

/// Open `path`, or ask for one on stdin when it was not given
fn choose_file(
    fs: &mut dyn FileAccess,
    path: Option<PathBuf>,
    prompt: &str,
) -> anyhow::Result<Option<FileHandle>> {
    let selected = match path {
        Some(path) => FileHandle::open(path),
        None => fs.select_file(prompt),
    };
    match selected {
        Ok(handle) => Ok(Some(handle)),
        Err(e) if e.is_cancelled() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn watch(
    config: Config,
    store: Option<PathBuf>,
    products: Vec<PathBuf>,
    download_to: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut watcher = Watcher::new(&config);
    let prompt_for_missing = store.is_none() && products.is_empty();

    {
        let stdin = std::io::stdin();
        let mut prompt = PromptFileAccess::new(stdin.lock(), std::io::stdout());

        let store_path = store;
        let store_prompt = "Storefront payload file (empty to skip)";
        if store_path.is_some() || prompt_for_missing {
            if let Some(handle) = choose_file(&mut prompt, store_path, store_prompt)? {
                watcher.watch("store", SessionKind::Storefront, handle, &prompt)?;
            }
        }

        let mut product_paths: Vec<Option<PathBuf>> = products.into_iter().map(Some).collect();
        if prompt_for_missing {
            product_paths.push(None);
        }
        for (i, path) in product_paths.into_iter().enumerate() {
            let label = if i == 0 {
                "products".to_string()
            } else {
                format!("products-{}", i + 1)
            };
            let products_prompt = "Product payload file (empty to skip)";
            if let Some(handle) = choose_file(&mut prompt, path, products_prompt)? {
                watcher.watch(&label, SessionKind::Products, handle, &prompt)?;
            }
        }
    }

    if !watcher.has_active_sessions() {
        bail!("No file selected to watch");
    }

    let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })
    .context("Failed to install Ctrl-C handler")?;

    let (command_tx, command_rx) = channel::unbounded();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(command) => {
                    if command_tx.send(command).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => eprintln!(
                    "Commands: status, clear-store, clear-products, download [DIR], \
                     save TARGET [--to DIR], stop LABEL, quit"
                ),
            }
        }
    });

    let mut fs = match &download_to {
        Some(dir) => LocalFileAccess::new().with_directory(dir),
        None => LocalFileAccess::new(),
    };
    let fetcher = http_fetcher(&config)?;
    let mut harvester = Harvester::new(config)?;

    println!("Watching; press Ctrl-C or type `quit` to stop");
    harvester.watch(&mut watcher, &mut fs, &fetcher, &command_rx, &shutdown_rx)?;

    if download_to.is_some() {
        let report = harvester.download_all(&fetcher, &mut fs, true)?;
        println!("{}", report.summary());
    }
    Ok(())
}

/// Map one line typed during `watch` to a command.
///
/// Everything after the command word is one argument, so directories and
/// product names may contain spaces.
fn parse_command(line: &str) -> Option<WatchCommand> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match (word, rest) {
        ("status", "") => WatchCommand::Status,
        ("clear-store", "") => WatchCommand::ClearStore,
        ("clear-products", "") => WatchCommand::ClearProducts,
        ("download", "") => WatchCommand::Download(None),
        ("download", dir) => WatchCommand::Download(Some(PathBuf::from(dir))),
        ("save", args) => {
            let (target, dir) = match args.split_once("--to") {
                Some((target, dir)) => (target, Some(PathBuf::from(dir.trim()))),
                None => (args, None),
            };
            WatchCommand::Save(target.parse().ok()?, dir)
        }
        ("stop", label) if !label.is_empty() => WatchCommand::Stop(label.to_string()),
        ("quit" | "exit", "") => WatchCommand::Quit,
        _ => return None,
    };
    Some(command)
}

fn extract(config: &Config, file: &Path, kind: PayloadKind) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let doc = parse_document(&content)?;

    let chain: &[ExtractorKind] = match kind {
        PayloadKind::Auto => &[
            ExtractorKind::ProductTags,
            ExtractorKind::ProductGroups,
            ExtractorKind::Storefront,
        ],
        PayloadKind::Store => SessionKind::Storefront.chain(),
        PayloadKind::Products => SessionKind::Products.chain(),
    };

    let ctx = ExtractContext::new(config.cdn_host.clone());
    match extract_with(&doc, chain, &ctx).matched() {
        Some(extraction) => {
            println!("{}", serde_json::to_string_pretty(&extraction)?);
            Ok(())
        }
        None => bail!("{} has no recognised image data", file.display()),
    }
}

fn download(
    config: Config,
    store: Option<PathBuf>,
    products: Vec<PathBuf>,
    to: PathBuf,
    only: Option<ImageTarget>,
) -> anyhow::Result<()> {
    let fetcher = http_fetcher(&config)?;
    let mut harvester = Harvester::new(config)?;

    let sources = store
        .into_iter()
        .map(|path| (SessionKind::Storefront, path))
        .chain(products.into_iter().map(|path| (SessionKind::Products, path)));

    for (kind, path) in sources {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let source = path.display().to_string();
        if !harvester.process_content(kind, &content, &source) {
            warn!("Nothing extracted from {}", source);
        }
    }

    let mut fs = LocalFileAccess::new().with_directory(to);
    let report = match only {
        Some(target) => harvester.save_image(&target, &fetcher, &mut fs)?,
        None => harvester.download_all(&fetcher, &mut fs, true)?,
    };
    println!("{}", report.summary());
    for failure in &report.failures {
        println!("  failed: {} ({})", failure.file_name, failure.message);
    }
    Ok(())
}

fn open_history(config: &Config) -> anyhow::Result<StoreHistory> {
    let dir = config.resolve_state_dir()?;
    Ok(StoreHistory::open(dir, config.history_limit)?)
}

fn history(config: &Config, clear: bool, load: Option<String>) -> anyhow::Result<()> {
    let mut history = open_history(config)?;

    if clear {
        history.clear_history()?;
        println!("Store history cleared");
        return Ok(());
    }

    if let Some(id) = load {
        match history.load_from_history(&id)? {
            Some(record) => println!("Loaded {} ({}) as current storefront", record.name, record.id),
            None => bail!("No storefront with id {} in history", id),
        }
        return Ok(());
    }

    if history.history().is_empty() {
        println!("Store history is empty");
    }
    for record in history.history() {
        println!(
            "{}\t{}\t{} images\t{}",
            record.id,
            record.name,
            record.image_count(),
            record.update_time.to_rfc3339()
        );
    }
    Ok(())
}

fn current(config: &Config, clear: bool) -> anyhow::Result<()> {
    let mut history = open_history(config)?;

    if clear {
        history.clear_current()?;
        println!("Current storefront cleared");
        return Ok(());
    }

    match history.current() {
        Some(record) => println!("{}", serde_json::to_string_pretty(record)?),
        None => println!("No current storefront"),
    }
    Ok(())
}

fn serve(config: &Config, file: PathBuf, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.server_port);
    let state = Arc::new(ServerState::new(file, config.cdn_host.clone()));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(server::serve(state, port))?;
    info!("Server exited");
    Ok(())
}
