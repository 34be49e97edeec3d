use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use retro_skin::{
    assets::{DirectoryFetcher, ResourceLoader, StaticAssetResolver},
    dom::{MemoryDocument, PageFixture},
    regions::RegionKind,
    settings::{FileSettingsStore, MemorySettingsStore, SettingsStore},
    styles::Applicator,
    BuiltinThemes, Command, CommandRouter, CompatibilityProbe, EngineConfig, RetroTransformer,
    Settings, ThemeCatalog,
};

#[derive(Parser)]
#[command(
    name = "retro-skin",
    version,
    about = "Re-skin web pages with reversible retro themes",
    long_about = "Retro-Skin applies GeoCities, Windows 95, Vaporwave or Terminal styling to a page \
                  described as a TOML fixture, keeps it applied while the page changes, and can \
                  take it all back again."
)]
struct Cli {
    /// Engine configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Extra theme definitions (TOML, `[[themes]]` tables)
    #[arg(long, global = true)]
    themes_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand)]
enum Action {
    /// List the available themes
    Themes,

    /// Run the compatibility checks against a page fixture
    Probe {
        /// Page fixture (TOML)
        fixture: PathBuf,
    },

    /// Apply a theme to a page fixture and report what changed
    Apply {
        /// Page fixture (TOML)
        fixture: PathBuf,

        /// Theme to apply (geocities, windows95, vaporwave, terminal)
        #[arg(short, long)]
        theme: Option<String>,

        /// Settings file; created on first save
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Directory the theme assets are read from
        #[arg(short, long, default_value = "assets")]
        assets: PathBuf,

        /// Deactivate afterwards and verify the page was fully restored
        #[arg(long)]
        roundtrip: bool,
    },

    /// Send JSON commands (one per argument) to an engine on a page fixture
    Send {
        /// Page fixture (TOML)
        fixture: PathBuf,

        /// Commands, e.g. '{"type":"ACTIVATE"}'
        #[arg(required = true)]
        commands: Vec<String>,

        /// Settings file; created on first save
        #[arg(short, long)]
        settings: Option<PathBuf>,

        #[arg(short, long, default_value = "assets")]
        assets: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Ok(EngineConfig::from_file(path)?)
        }
        None => {
            info!("Using default configuration");
            Ok(EngineConfig::default())
        }
    }
}

fn load_catalog(path: Option<&Path>) -> Result<BuiltinThemes> {
    let mut catalog = BuiltinThemes::new();
    if let Some(path) = path {
        let added = catalog.load_file(path)?;
        info!("Loaded {} custom theme(s) from {:?}", added, path);
    }
    Ok(catalog)
}

fn load_page(path: &Path) -> Result<MemoryDocument> {
    let fixture = PageFixture::from_file(path)?;
    let doc = fixture
        .build()
        .with_context(|| format!("Building page from {:?}", path))?;
    Ok(doc)
}

fn build_engine(
    cli: &Cli,
    doc: MemoryDocument,
    assets: &Path,
) -> Result<RetroTransformer<MemoryDocument>> {
    let config = load_config(cli.config.as_deref())?;
    let catalog = load_catalog(cli.themes_file.as_deref())?;
    let base_url = assets.display().to_string();
    let loader = ResourceLoader::new(
        Box::new(StaticAssetResolver::new(&base_url)),
        Box::new(DirectoryFetcher::new(assets)),
        config.assets.retry_delay(),
    );
    Ok(RetroTransformer::new(doc, Box::new(catalog), loader, config))
}

fn settings_store(path: Option<&Path>) -> Box<dyn SettingsStore> {
    match path {
        Some(path) => Box::new(FileSettingsStore::new(path)),
        None => Box::new(MemorySettingsStore::new(Settings::default())),
    }
}

fn print_themes(catalog: &BuiltinThemes) {
    println!("Available themes:");
    for id in catalog.theme_ids() {
        if let Some(theme) = catalog.get_theme(&id) {
            let crash = if theme.crash_on_modal { " (crashes on modals)" } else { "" };
            println!("  {:<10} {}{}", id, theme.display_name, crash);
        }
    }
}

fn probe(path: &Path) -> Result<()> {
    let doc = load_page(path)?;
    let report = CompatibilityProbe::new().check(&doc);
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.critical {
        warn!("Page cannot be re-skinned");
    }
    Ok(())
}

async fn apply(
    cli: &Cli,
    fixture: &Path,
    theme: Option<&str>,
    settings_path: Option<&Path>,
    assets: &Path,
    roundtrip: bool,
) -> Result<()> {
    let doc = load_page(fixture)?;
    let elements_before = doc.connected_count();

    let store = settings_store(settings_path);
    let mut settings = store.load()?;
    settings.enabled = true;
    if let Some(theme) = theme {
        settings.current_theme = theme.to_string();
    }
    info!("Theme: {}", settings.current_theme);

    let mut engine = build_engine(cli, doc, assets)?.with_settings(settings);
    if !engine.activate().await {
        anyhow::bail!("Engine stayed inactive; see the log for the reason");
    }

    let doc = engine.document();
    let summary = engine.regions().last_summary();
    println!("Regions:");
    for kind in [
        RegionKind::Hero,
        RegionKind::Sidebar,
        RegionKind::Footer,
        RegionKind::MainContent,
    ] {
        println!("  {:<12} {}", kind.as_str(), summary.count(kind));
    }

    let applicators = engine.applicators();
    let stages: [(&str, bool); 5] = [
        ("elements", applicators.elements.is_applied()),
        ("background", applicators.background.is_applied()),
        ("fonts", applicators.fonts.is_applied()),
        ("cursor", applicators.cursor.is_applied()),
        ("vintage", applicators.vintage.is_applied()),
    ];
    println!("Applicators:");
    for (name, applied) in stages {
        println!("  {:<12} {}", name, if applied { "applied" } else { "off" });
    }
    if let Some(count) = applicators.vintage.counter_value() {
        println!("Visitor counter: {:06}", count);
    }
    println!(
        "Tagged elements: {} of {}",
        doc.engine_tagged_nodes().len(),
        elements_before
    );

    if roundtrip {
        engine.deactivate();
        let doc = engine.document();
        let leftovers = doc.engine_tagged_nodes().len();
        let extra_nodes = doc.connected_count().saturating_sub(elements_before);
        if leftovers > 0 || extra_nodes > 0 {
            anyhow::bail!(
                "Restore incomplete: {} tagged node(s), {} leftover node(s)",
                leftovers,
                extra_nodes
            );
        }
        println!("Round trip: page restored");
    }
    Ok(())
}

async fn send(
    cli: &Cli,
    fixture: &Path,
    commands: &[String],
    settings_path: Option<&Path>,
    assets: &Path,
) -> Result<()> {
    let doc = load_page(fixture)?;
    let engine = build_engine(cli, doc, assets)?;
    let mut router = CommandRouter::new(engine, settings_store(settings_path));

    for raw in commands {
        if serde_json::from_str::<Command>(raw).is_err() {
            warn!("Not a command: {}", raw);
        }
        println!("{}", router.dispatch_json(raw).await);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    info!("Starting Retro-Skin v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Action::Themes => {
            let catalog = load_catalog(cli.themes_file.as_deref())?;
            print_themes(&catalog);
        }
        Action::Probe { fixture } => probe(fixture)?,
        Action::Apply {
            fixture,
            theme,
            settings,
            assets,
            roundtrip,
        } => {
            apply(
                &cli,
                fixture,
                theme.as_deref(),
                settings.as_deref(),
                assets,
                *roundtrip,
            )
            .await?
        }
        Action::Send {
            fixture,
            commands,
            settings,
            assets,
        } => send(&cli, fixture, commands, settings.as_deref(), assets).await?,
    }
    Ok(())
}
