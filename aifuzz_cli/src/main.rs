use aifuzz_core::config::AifuzzConfig;
use aifuzz_core::detector::{CommandDetector, Detector};
use aifuzz_core::engine::FuzzEngine;
use aifuzz_core::observer::Observer;
use aifuzz_core::oracle::{Classification, StatusOracle};
use aifuzz_core::path_source::{GeminiPathSource, PathSource, WordlistPathSource};
use aifuzz_core::report::{self, ReportLine, Summary};
use aifuzz_core::task::ProbeResult;
use aifuzz_core::transport::ReqwestTransport;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use url::Url;

/// Probe a web server with candidate paths suggested from its technology fingerprint.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Target URL to fuzz
    url: String,
    /// Directory to save results
    #[clap(long, default_value = "results")]
    output_dir: PathBuf,
    #[clap(short, long, value_parser, default_value = "config.toml")]
    config_file: PathBuf,
    /// Read candidate paths from this file instead of fingerprinting and generating them
    #[clap(short, long)]
    wordlist: Option<PathBuf>,
    #[clap(long)]
    concurrency: Option<usize>,
    #[clap(long)]
    max_retries: Option<u32>,
    #[clap(long)]
    timeout_ms: Option<u64>,
}

/// Drives an indicatif bar from engine progress.
#[derive(Default)]
struct ProgressBarObserver {
    bar: Option<ProgressBar>,
}

impl Observer for ProgressBarObserver {
    fn name(&self) -> &'static str {
        "ProgressBarObserver"
    }

    fn on_start(&mut self, total: usize) -> Result<(), anyhow::Error> {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} Fuzzing [{bar:40.cyan/blue}] {pos}/{len} ({elapsed_precise})")?
                .progress_chars("=> "),
        );
        self.bar = Some(bar);
        Ok(())
    }

    fn on_result(&mut self, _result: &ProbeResult) -> Result<(), anyhow::Error> {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
        Ok(())
    }

    fn on_finish(&mut self) -> Result<(), anyhow::Error> {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        Ok(())
    }
}

fn step(number: u8, title: &str) {
    let heading = format!("Step {number}: {title}");
    println!("\n{}", heading.bold().cyan());
    println!("{}", "=".repeat(heading.len()).cyan());
}

fn paint(line: &ReportLine) -> String {
    let label = line.class.label();
    let label = match line.class {
        Classification::Hit => label.green().bold(),
        Classification::Forbidden => label.yellow(),
        Classification::Absent => label.dimmed(),
        Classification::Other => label.blue(),
        Classification::Error => label.red(),
    };
    format!("{label} {}", line.detail)
}

async fn collect_paths<S: PathSource>(
    source: &S,
    target: &str,
    fingerprint: &str,
) -> Result<Vec<String>, anyhow::Error> {
    source
        .generate_paths(target, fingerprint)
        .await
        .with_context(|| format!("Path generation via {} failed", source.name()))
}

fn load_config(cli: &Cli) -> Result<AifuzzConfig, anyhow::Error> {
    println!("Loading configuration from {:?}", cli.config_file);
    let mut config = AifuzzConfig::load_from_file(&cli.config_file)?;

    if let Some(concurrency) = cli.concurrency {
        config.fuzzing.concurrent_requests = concurrency;
    }
    if let Some(max_retries) = cli.max_retries {
        config.fuzzing.max_retries = max_retries;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.fuzzing.timeout_ms = timeout_ms;
    }
    config.validate()?;

    log::debug!("Effective fuzzing settings: {:#?}", config.fuzzing);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let target = Url::parse(&cli.url).with_context(|| format!("Invalid target URL {:?}", cli.url))?;
    let config = load_config(&cli)?;

    let paths = match &cli.wordlist {
        Some(wordlist) => {
            step(1, "Loading Wordlist");
            collect_paths(&WordlistPathSource::new(wordlist), target.as_str(), "").await?
        }
        None => {
            step(1, "Technology Detection");
            let detector = CommandDetector::new(config.detector.command_config());
            let fingerprint = detector
                .detect(target.as_str())
                .await
                .context("Technology detection failed")?;
            println!("Detected technologies:\n{fingerprint}");

            step(2, "AI Path Generation");
            let source = GeminiPathSource::new(config.gemini_settings()?)?;
            collect_paths(&source, target.as_str(), &fingerprint).await?
        }
    };
    println!("Generated {} paths to fuzz", paths.len());
    if paths.is_empty() {
        log::warn!("No candidate paths to probe");
    }

    step(3, "Fuzzing URLs");
    let transport = ReqwestTransport::new(&config.fuzzing.transport_settings())?;
    let engine = FuzzEngine::new(transport, config.fuzzing.fuzz_config());
    let mut progress = ProgressBarObserver::default();
    let start_time = Instant::now();
    let results = engine.fuzz(&target, &paths, &mut progress).await;
    println!(
        "Probed {} paths in {:.2?}",
        results.len(),
        start_time.elapsed()
    );

    step(4, "Results");
    let oracle = StatusOracle::new();
    for line in report::report_lines(&oracle, &results) {
        println!("{}", paint(&line));
    }
    println!("\n{}", Summary::from_results(&oracle, &results));

    let saved = report::save_results(&results, &cli.output_dir)?;
    println!("\nResults saved to: {}", saved.display());

    Ok(())
}
