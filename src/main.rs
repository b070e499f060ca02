use cydust::app::{App, Mode};
use cydust::config::Config;
use cydust::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (info and above unless RUST_LOG says otherwise)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments before touching config or the database
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match Mode::from_args(&args) {
        Ok(mode) => mode,
        Err(usage) => {
            eprintln!("{usage}");
            std::process::exit(2);
        }
    };

    // Load configuration
    let config = Config::load()?;

    // Initialize app
    let app = App::new(config).await?;

    match mode {
        // --scrape: one scrape, then exit
        Mode::Scrape => {
            let report = app.scrape_once().await?;
            println!(
                "Scraped {} stations: {} new, {} duplicate, {} skipped, {} failed",
                report.stations_seen, report.inserted, report.duplicates, report.skipped, report.failed
            );
        }
        // --notify: one notification pass, then exit
        Mode::Notify => {
            let report = app.notify_once().await?;
            println!(
                "Notified {} subscribers ({} filtered, {} without data, {} failed)",
                report.delivered, report.filtered, report.no_data, report.failed
            );
        }
        // --check <station>: print the latest stored observations
        Mode::Check(query) => {
            println!("{}", app.history(&query).await?);
        }
        // No flags: run until Ctrl-C
        Mode::Daemon => app.run().await?,
    }

    Ok(())
}
