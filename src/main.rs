use clap::Parser;
use depot_kpi::core::render::render_report;
use depot_kpi::core::source::TableSource;
use depot_kpi::utils::{logger, validation::Validate};
use depot_kpi::{CliConfig, DepotError, LocalStorage, ReportWriter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting depot-kpi");
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = run(config).await {
        tracing::error!(
            "❌ Report failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(config: CliConfig) -> Result<(), DepotError> {
    config.validate()?;
    let settings = config.load_settings()?;

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let writer = ReportWriter::new(
        &settings.output.path,
        settings.output_formats()?,
        settings.output.bundle,
    );
    let preview_rows = settings.output.preview_rows;

    let sheet = config.sheet_selection();
    let job = config.into_job(&settings)?;
    tracing::info!("Running the {} report", job.name());

    let source = TableSource::with_sheet(LocalStorage::new(".".to_string()), sheet);
    let run = job.run(source, writer, monitor_enabled).await?;

    print!("{}", render_report(&run.report, preview_rows));
    println!("✅ Report completed successfully!");
    println!("📁 Output saved to: {}", run.output_path);
    Ok(())
}
