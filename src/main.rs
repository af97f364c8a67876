//! Waypoint Survey command line entry point

mod cli;

use anyhow::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = cli::load_config(&args)?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = match rolling_logger::init_logger(&config.log_dir, "WaypointSurvey") {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialize logger: {}", e);
            None
        }
    };

    if let Err(e) = cli::handle_commands(&args, &config).await.map(|handled| {
        if !handled {
            cli::print_help();
        }
    }) {
        let _ = rolling_logger::error(&format!("{:#}", e));
        return Err(e);
    }
    Ok(())
}
