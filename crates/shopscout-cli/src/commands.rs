//! Subcommand implementations.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use url::Url;

use shopscout::config::resolve_config_path;
use shopscout::renderer::chromium::{find_chromium, ChromiumRenderer, LaunchOptions};
use shopscout::sink::build_sinks;
use shopscout::{
    write_all, FieldExtractor, Harvest, IdentityPool, Layout, PageKind, Pipeline, Record,
    ScrapeConfig, SinkKind, Target, TargetState,
};

fn extractor(config: &ScrapeConfig) -> Result<FieldExtractor> {
    let layout = Layout::load(config.layout_path.as_deref())?;
    let origin = Url::parse(&config.site_origin)
        .with_context(|| format!("invalid site origin: {}", config.site_origin))?;
    Ok(FieldExtractor::new(layout, origin))
}

/// Render `targets`, then hand the records to every requested sink.
pub async fn scrape(config: &ScrapeConfig, targets: Vec<Target>, sinks: &[SinkKind]) -> Result<()> {
    let extractor = extractor(config)?;
    let identities = Arc::new(IdentityPool::new(config.user_agents.clone()));

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if interrupt(&stop) {
                    eprintln!("  interrupted twice, exiting");
                    std::process::exit(130);
                }
                tracing::warn!("interrupt received, finishing current target (Ctrl-C again to quit)");
            }
        });
    }

    let launch = LaunchOptions {
        headless: config.headless,
        user_agent: identities.next().map(String::from),
        chromium_path: config.chromium_path.clone(),
        ..LaunchOptions::default()
    };
    let renderer = ChromiumRenderer::launch(&launch)
        .await
        .context("failed to initialize browser")?;

    let pipeline = Pipeline::new(extractor, config.pipeline_options())
        .with_identities(identities)
        .with_stop_signal(stop);
    let harvest = pipeline.run(&renderer, &targets).await?;

    print_outcomes(&harvest);

    if harvest.records.is_empty() {
        tracing::warn!("no products scraped");
        return Ok(());
    }

    let mut sinks = build_sinks(
        sinks,
        &config.output_dir,
        &config.file_prefix,
        &config.database_path(),
    );
    let reports = write_all(&mut sinks, &harvest.records);
    for report in &reports {
        match &report.error {
            None => eprintln!("  saved {} records to {}", report.written, report.sink),
            Some(e) => eprintln!("  failed to save to {}: {e}", report.sink),
        }
    }
    if !reports.is_empty() && reports.iter().all(|r| !r.is_ok()) {
        tracing::error!("every sink failed; records were not persisted");
    }

    eprintln!();
    eprintln!("Scraping completed! Total products: {}", harvest.records.len());
    Ok(())
}

/// Record an interrupt on `stop`. Returns true if one was already pending.
fn interrupt(stop: &AtomicBool) -> bool {
    stop.swap(true, Ordering::Relaxed)
}

fn print_outcomes(harvest: &Harvest) {
    eprintln!();
    for outcome in &harvest.outcomes {
        let mark = match outcome.state {
            TargetState::Done => "OK",
            _ => "!!",
        };
        eprintln!(
            "  [{mark}] {:<14} {:>3} records  {}",
            outcome.target.category, outcome.records, outcome.target.url
        );
        if let Some(e) = &outcome.error {
            eprintln!("       {e}");
        }
    }
    if harvest.cancelled {
        eprintln!("  run interrupted before all targets were attempted");
    }
}

/// Extract records from a saved page and print them as JSON.
pub fn parse(
    config: &ScrapeConfig,
    file: &Path,
    kind: PageKind,
    category: Option<&str>,
    url: Option<&str>,
) -> Result<()> {
    let records = parse_records(config, file, kind, category, url)?;
    if records.is_empty() {
        tracing::warn!("no products found in {}", file.display());
    }
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn parse_records(
    config: &ScrapeConfig,
    file: &Path,
    kind: PageKind,
    category: Option<&str>,
    url: Option<&str>,
) -> Result<Vec<Record>> {
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let extractor = extractor(config)?;
    let page_url = url.unwrap_or(&config.site_origin);

    let harvest = extractor.extract_page(&html, kind, page_url, config.max_products);
    Ok(harvest
        .records
        .into_iter()
        .map(|r| r.with_category(category.unwrap_or_default()))
        .collect())
}

/// Report browser availability and the effective configuration.
pub fn doctor(config: &ScrapeConfig, config_flag: Option<&Path>) -> Result<()> {
    println!("Shopscout Doctor");
    println!("================");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    let chromium = config.chromium_path.clone().or_else(find_chromium);
    match &chromium {
        Some(path) if path.exists() => println!("[OK] Chromium found: {}", path.display()),
        Some(path) => println!("[!!] Chromium path does not exist: {}", path.display()),
        None => println!("[!!] Chromium NOT found. Set SHOPSCOUT_CHROMIUM_PATH or install Chrome."),
    }

    match resolve_config_path(config_flag) {
        Some(path) => println!("[OK] Config file: {}", path.display()),
        None => println!("[OK] Config file: none (built-in defaults)"),
    }

    match Layout::load(config.layout_path.as_deref()) {
        Ok(layout) => println!(
            "[OK] Selector layout: {} container queries",
            layout.containers.len()
        ),
        Err(e) => println!("[!!] Selector layout invalid: {e}"),
    }

    let out = &config.output_dir;
    if out.is_dir() {
        println!("[OK] Output directory: {}", out.display());
    } else {
        println!("[??] Output directory will be created: {}", out.display());
    }

    println!();
    println!("Effective config:");
    println!("{}", serde_json::to_string_pretty(config)?);

    println!();
    if chromium.as_deref().is_some_and(Path::exists) {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}
