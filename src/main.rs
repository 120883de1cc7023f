use clap::{Parser, Subcommand};
use infoscreen::cache::ImageCache;
use infoscreen::derivatives::ImageService;
use infoscreen::imaging::RustBackend;
use infoscreen::poller::{CycleReport, Poller};
use infoscreen::registry::{Screen, SourceRegistry};
use infoscreen::repository::Repository;
use infoscreen::{config, output, source};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "infoscreen")]
#[command(about = "Content feeds and resized images for info screens")]
#[command(long_about = "\
Content feeds and resized images for info screens

Each screen shows up to six feeds, configured as directories or files:

  content/                 # content_source_dir (also content2, content3)
  ├── 001-welcome.jpg      # Images and videos, in name order,
  ├── 002-tour.mp4         # subdirectories walked depth-first
  └── events/
      └── 001-concert.png
  mixin/                   # image_source_dir: shown between content pages
  ticker/                  # ticker_source_dir: *.txt, one entry per paragraph
  default.txt              # ticker_default_file: shown when ticker is empty

Changed feeds are copied into the repository (repo_root) under the hash of
their content, so unchanged files are never copied twice.

Run 'infoscreen gen-config' to generate a documented infoscreen.toml.")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "infoscreen.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one poll cycle over every feed and report what changed
    Sync,
    /// Run one poll cycle and print screen content as JSON
    Content {
        /// Only this screen (default: all screens)
        #[arg(long)]
        screen: Option<String>,
    },
    /// Poll feeds every sync interval until interrupted
    Watch {
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// Write a repository image fitted into WIDTH x HEIGHT as PNG
    Resize {
        /// Repository file name, e.g. as listed by `content`
        name: String,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        /// Output PNG file
        #[arg(long)]
        output: PathBuf,
    },
    /// Validate config and report feed digests without copying anything
    Check,
    /// Print a stock infoscreen.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    init_tracing(&config.logging)?;
    init_thread_pool(&config.processing);

    let repository = Repository::open(&config.repo_root)?;
    let registry = SourceRegistry::new(repository.clone());
    let screens: Vec<Screen> = config
        .screens
        .iter()
        .map(|s| registry.register_screen(s))
        .collect();
    info!(
        config = %cli.config.display(),
        screens = screens.len(),
        feeds = registry.keys().len(),
        "configuration loaded"
    );

    match cli.command {
        Command::Sync => {
            let started = Instant::now();
            let results = registry.poll_all();
            output::print_cycle_report(&CycleReport {
                cycle: 1,
                elapsed: started.elapsed(),
                results,
            });
            println!("==> Feeds");
            output::print_statuses(&registry.statuses());
        }
        Command::Content { screen } => {
            registry.poll_all();
            let selected: Vec<&Screen> = match &screen {
                Some(name) => vec![
                    screens
                        .iter()
                        .find(|s| &s.name == name)
                        .ok_or_else(|| format!("no screen named {name:?}"))?,
                ],
                None => screens.iter().collect(),
            };
            let content: BTreeMap<&str, _> = selected
                .into_iter()
                .map(|s| (s.name.as_str(), registry.screen_content(s)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&content)?);
        }
        Command::Watch { cycles } => {
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for report in rx {
                    output::print_cycle_report(&report);
                }
            });
            let poller = Poller::spawn(
                Arc::new(registry),
                config.sync.interval(),
                cycles,
                Some(tx),
            );
            let ran = poller.join();
            printer.join().map_err(|_| "output thread panicked")?;
            println!("==> Stopped after {} cycles", ran);
        }
        Command::Resize {
            name,
            width,
            height,
            output,
        } => {
            let service = ImageService::new(
                repository,
                ImageCache::new(config.cache.size_bytes()),
                RustBackend::new(),
            );
            let bytes = service.get_image(&name, width, height)?;
            std::fs::write(&output, &bytes)?;
            println!("==> Wrote {} ({} bytes)", output.display(), bytes.len());
        }
        Command::Check => {
            let results: Vec<_> = registry
                .keys()
                .into_iter()
                .map(|key| {
                    let fingerprint = source::fingerprint(&key);
                    (key, fingerprint)
                })
                .collect();
            output::print_fingerprints(&results);
            let unreadable = results.iter().filter(|(_, r)| r.is_err()).count();
            if unreadable > 0 {
                return Err(format!("{unreadable} feed(s) unreadable").into());
            }
            println!("==> Config is valid");
        }
        // Printed before the config is loaded.
        Command::GenConfig => {}
    }

    Ok(())
}

/// Install the global subscriber: `RUST_LOG` wins over `logging.level`, and
/// `logging.file` adds a plain-text copy of every line.
///
/// Logs go to stderr so `content` output stays valid JSON.
fn init_tracing(logging: &config::LoggingConfig) -> Result<(), std::io::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
