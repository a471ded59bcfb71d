// report-monitor CLI
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tracing::{info, warn};

use report_monitor::config::{AppConfig, ZoneMode};
use report_monitor::enrichment::CommandEnricher;
use report_monitor::extraction::{PdfToText, TextExtractor, ZoneScript};
use report_monitor::logging::init_logging;
use report_monitor::setup::run_setup;
use report_monitor::sinks::{ClipboardSink, Delivered, TextFileSink};
use report_monitor::{ChangeWatcher, Pipeline, ProfileCatalog, RedactionEngine, ZoneProfileStore};

#[derive(Parser, Debug)]
#[command(author, version, about = "Watch a folder for medical report PDFs and save clean text")]
struct Args {
    /// Config file (default: user config dir)
    #[arg(long, global = true, env = "REPORT_MONITOR_CONFIG")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watch the configured folder until `q` is pressed (default)
    Watch,
    /// Ask for folders and options and write the config file
    Setup,
    /// Process one PDF and exit
    Process { pdf: PathBuf },
    /// Redact an already-extracted text file and print the result
    Clean {
        text: PathBuf,
        /// Use this profile instead of matching one
        #[arg(long)]
        profile: Option<String>,
    },
    /// List document and zone profiles
    Profiles,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config_path = AppConfig::resolve_path(args.config.as_deref())?;

    match args.command.unwrap_or(Commands::Watch) {
        Commands::Watch => watch(&config_path),
        Commands::Setup => setup(&config_path).map(|_| ()),
        Commands::Process { pdf } => process(&config_path, &pdf),
        Commands::Clean { text, profile } => clean(&config_path, &text, profile.as_deref()),
        Commands::Profiles => list_profiles(&config_path),
    }
}

fn setup(config_path: &Path) -> Result<AppConfig> {
    let base = if config_path.exists() {
        AppConfig::load(config_path)?
    } else {
        AppConfig::default()
    };

    let stdin = io::stdin();
    let config = run_setup(&mut stdin.lock(), &mut io::stdout(), base)?;
    config.save(config_path)?;
    println!("Configuration saved to {}", config_path.display());
    Ok(config)
}

fn load_or_setup(config_path: &Path) -> Result<AppConfig> {
    if config_path.exists() {
        return AppConfig::load(config_path);
    }
    if !atty::is(atty::Stream::Stdin) {
        bail!(
            "no configuration at {}; run `report-monitor setup` first",
            config_path.display()
        );
    }
    setup(config_path)
}

/// Config when one exists; commands that work on single files do not need it.
fn optional_config(config_path: &Path) -> Result<Option<AppConfig>> {
    if config_path.exists() {
        AppConfig::load(config_path).map(Some)
    } else {
        Ok(None)
    }
}

fn build_catalog(config: Option<&AppConfig>) -> Result<ProfileCatalog> {
    let custom = match config.and_then(|c| c.profiles_file.as_deref()) {
        Some(path) => ProfileCatalog::load_file(path)?,
        None => Vec::new(),
    };
    Ok(ProfileCatalog::builtin_with(custom))
}

fn load_zone_store(dir: &Path) -> Option<Arc<ZoneProfileStore>> {
    let store = ZoneProfileStore::new();
    match store.load_all(dir) {
        Ok(_) => Some(Arc::new(store)),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "zone extraction disabled");
            None
        }
    }
}

fn build_pipeline(config: &AppConfig) -> Result<Pipeline> {
    let catalog = Arc::new(build_catalog(Some(config))?);

    let pdftotext = PdfToText::new(&config.pdftotext_path);
    if !pdftotext.is_available() {
        warn!(tool = %config.pdftotext_path.display(), "pdftotext not found; extraction will fail");
    }
    let mut pipeline = Pipeline::new(catalog, Box::new(pdftotext.clone()));

    let zone_extractor: Option<Box<dyn TextExtractor>> = match config.zones.mode {
        ZoneMode::Off => None,
        ZoneMode::Pdftotext => Some(Box::new(pdftotext.clone())),
        ZoneMode::Script => config.zones.script_path.as_ref().map(|script| {
            Box::new(ZoneScript::new(&config.zones.python, script, pdftotext.clone()))
                as Box<dyn TextExtractor>
        }),
    };
    if let (Some(extractor), Some(dir)) = (zone_extractor, config.zones.profiles_dir.as_deref()) {
        if let Some(store) = load_zone_store(dir) {
            info!(extractor = extractor.name(), "zone extraction enabled");
            pipeline = pipeline.with_zones(store, extractor);
        }
    }

    if config.enrichment.enabled {
        let enricher = CommandEnricher::new(&config.enrichment.command, config.enrichment.args.clone())
            .with_timeout(Duration::from_millis(config.enrichment.timeout_ms))
            .with_min_output_chars(config.enrichment.min_output_chars);
        if !enricher.is_available() {
            warn!(command = %config.enrichment.command, "analysis command not found");
        }
        pipeline = pipeline.with_enricher(Box::new(enricher));
    }

    pipeline = pipeline.with_sink(Box::new(TextFileSink::new(config.output_dir())));
    if config.clipboard {
        pipeline = pipeline.with_sink(Box::new(ClipboardSink));
    }
    Ok(pipeline)
}

fn watch(config_path: &Path) -> Result<()> {
    let config = load_or_setup(config_path)?;
    config.validate()?;

    let pipeline = build_pipeline(&config)?;
    let sinks = pipeline.sink_names().join(", ");
    let mut handle = ChangeWatcher::start(&config.watch_dir, config.watch.policy(), move |path| {
        pipeline.on_arrival(path)
    })?;

    println!("Watching:   {}", handle.directory().display());
    println!("Output dir: {}", config.output_dir().display());
    println!("Outputs:    {sinks}");
    println!("Press 'q' to quit.");

    let waited = wait_for_quit();
    handle.stop();
    waited
}

/// Restores cooked mode even if the key loop fails.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

fn wait_for_quit() -> Result<()> {
    if atty::is(atty::Stream::Stdin) {
        let _raw = RawModeGuard::enable()?;
        loop {
            if !event::poll(Duration::from_millis(250))? {
                continue;
            }
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                    // raw mode swallows SIGINT
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(())
                    }
                    _ => {}
                }
            }
        }
    }

    for line in io::stdin().lock().lines() {
        if line?.trim().eq_ignore_ascii_case("q") {
            return Ok(());
        }
    }
    // stdin closed (service mode): run until the process is terminated
    info!("stdin closed, running until terminated");
    loop {
        thread::park();
    }
}

fn process(config_path: &Path, pdf: &Path) -> Result<()> {
    let config = load_or_setup(config_path)?;
    config.validate()?;
    let pipeline = build_pipeline(&config)?;

    let doc = pipeline
        .handle(pdf)
        .with_context(|| format!("failed to process {}", pdf.display()))?;

    println!("Processed:  {}", doc.processed_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Profile:    {}", doc.report.profile_name);
    println!("Identifier: {}", doc.report.identifier);
    if let Some(zone) = &doc.zone_profile {
        println!("Zones:      {zone}");
    }
    for output in &doc.outputs {
        match output {
            Delivered::File(path) => println!("Saved:      {}", path.display()),
            Delivered::Clipboard => println!("Copied to clipboard"),
        }
    }
    Ok(())
}

fn clean(config_path: &Path, text: &Path, profile: Option<&str>) -> Result<()> {
    let config = optional_config(config_path)?;
    let catalog = build_catalog(config.as_ref())?;
    let raw = fs::read_to_string(text).with_context(|| format!("cannot read {}", text.display()))?;

    let engine = RedactionEngine::new();
    let report = match profile {
        Some(name) => {
            let Some(profile) = catalog.get(name) else {
                let names: Vec<_> = catalog.profiles().iter().map(|p| p.name()).collect();
                bail!("unknown profile '{name}' (available: {})", names.join(", "));
            };
            engine.process(&raw, profile)?
        }
        None => engine.match_and_process(&catalog, &raw)?,
    };

    let mut out = io::stdout().lock();
    writeln!(out, "# profile: {}", report.profile_name)?;
    writeln!(out, "# identifier: {}", report.identifier)?;
    writeln!(out, "{}", report.body)?;
    Ok(())
}

fn list_profiles(config_path: &Path) -> Result<()> {
    let config = optional_config(config_path)?;
    let catalog = build_catalog(config.as_ref())?;

    println!("Document profiles (match order):");
    for profile in catalog.profiles() {
        println!(
            "  {:<16} identify={} capture={} exclude={} retain={} breaks={}",
            profile.name(),
            profile.identification().len(),
            profile.identifier_capture().len(),
            profile.exclusion().len(),
            profile.retention().len(),
            profile.section_breaks().len(),
        );
    }
    println!("  {:<16} (default)", catalog.default_profile().name());

    let Some(dir) = config.as_ref().and_then(|c| c.zones.profiles_dir.as_deref()) else {
        return Ok(());
    };
    println!("\nZone profiles in {}:", dir.display());
    match load_zone_store(dir) {
        Some(store) => {
            for zone_profile in store.profiles().iter() {
                let rules = if zone_profile.identification_rules.is_empty() {
                    "no rules".to_string()
                } else {
                    zone_profile.identification_rules.join(" + ")
                };
                println!(
                    "  {:<16} zones={} [{}]",
                    zone_profile.profile_name,
                    zone_profile.zones.len(),
                    rules
                );
            }
        }
        None => println!("  (none loaded)"),
    }
    Ok(())
}
