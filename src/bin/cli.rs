use colored::*;
use sec_amendments::{
    core::config::{EMAIL_VAR, PASSWORD_VAR},
    filings::form,
    utils::{http::HttpSession, rate_limit::FixedDelay},
    workflow, ConfigError, ProgressTracker, RunOutcome, RunReport, ScraperConfig,
};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "sec-amendments",
    about = "Export amended SEC filings from the StockTitan live feed to CSV"
)]
struct Opt {
    /// JSON file overriding the built-in site configuration
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// CSV file to write (default: sec_amendments_<timestamp>.csv)
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Listing page path or absolute URL
    #[structopt(long)]
    listing_url: Option<String>,

    /// Pause before each detail-page request, in milliseconds
    #[structopt(long)]
    delay_ms: Option<u64>,

    /// Number of records echoed after the export
    #[structopt(long, default_value = "5")]
    preview: usize,

    /// Hide the progress bar
    #[structopt(long)]
    no_progress: bool,
}

fn print_setup_help(err: &ConfigError) {
    eprintln!("{} {}", "Not running:".red().bold(), err);
    eprintln!(
        "Please set {} and {} environment variables",
        EMAIL_VAR.bold(),
        PASSWORD_VAR.bold()
    );
    eprintln!("e.g. {}=you@example.com {}=... sec-amendments", EMAIL_VAR, PASSWORD_VAR);
    eprintln!(
        "or create a {} file in the working directory with your credentials:",
        ".env".bold()
    );
    eprintln!("  {}=you@example.com", EMAIL_VAR);
    eprintln!("  {}=your-real-password", PASSWORD_VAR);
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max).collect::<String>())
    }
}

fn print_report(report: &RunReport, preview: usize) {
    let Some(path) = &report.output else {
        println!("{}", "No amendment filings found. The page structure may have changed.".yellow());
        println!("Please check the target URL and verify the page layout.");
        return;
    };

    println!("{} {}", "Data saved to".green(), path.display());
    println!("Total amendments found: {}", report.retained);
    println!("Summaries fetched: {}", report.summarized);

    if preview == 0 {
        return;
    }
    println!("\n{}", "Sample of collected data:".bold());
    for record in report.records.iter().take(preview) {
        println!(
            "  {} {} {:<8} {:<10} {} {}",
            record.date.dimmed(),
            record.time.dimmed(),
            record.symbol.cyan(),
            record.form_type.yellow(),
            format!("(amends {})", form::base_form(&record.form_type)).dimmed(),
            truncate(&format!("{} - {}", record.company, record.title), 60)
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opt = Opt::from_args();

    let mut config = ScraperConfig::load(opt.config.as_deref())?;
    if let Some(listing_url) = opt.listing_url {
        config.listing_path = listing_url;
    }
    if let Some(delay_ms) = opt.delay_ms {
        config.request_delay_ms = delay_ms;
    }

    let limiter = FixedDelay::from_millis(config.request_delay_ms);
    let progress = ProgressTracker::new(!opt.no_progress);
    let user_agent = config.user_agent.clone();

    let result = workflow::launch(
        |key| std::env::var(key).ok(),
        &config,
        || HttpSession::open(&user_agent),
        limiter,
        progress,
        opt.output.as_deref(),
    )
    .await;

    match result {
        Ok(RunOutcome::Done(report)) => print_report(&report, opt.preview),
        Ok(RunOutcome::Failed { stage, reason }) => {
            eprintln!("{} {}", format!("{} failed:", stage).red().bold(), reason);
        }
        Err(e) => match e.downcast_ref::<ConfigError>() {
            Some(config_err) if config_err.is_credentials() => {
                print_setup_help(config_err);
                std::process::exit(2);
            }
            _ => return Err(e),
        },
    }

    Ok(())
}
