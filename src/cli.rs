use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::sync::Mutex;

use waypoint_survey::domain::{ExportFormat, WaypointRecord};
use waypoint_survey::geocoding::Nominatim;
use waypoint_survey::markers::HeadlessSurface;
use waypoint_survey::repository::{open_db, HttpRemoteStore, LocalStore, RemoteStore, StaticSession};
use waypoint_survey::{Notice, SurveyConfig, SurveyController};

/// Bearer token for authenticated backend calls
const TOKEN_VAR: &str = "SURVEY_TOKEN";

pub fn print_help() {
    println!("waypoint-survey <command>");
    println!();
    println!("  convert <input.geojson|input.kml> <json|xml|geojson|kml>");
    println!("      Import a file and write it to stdout in another format");
    println!("  list [--db <path>]");
    println!("      List saved waypoints (backend, or a local database)");
    println!("  default [--db <path>]");
    println!("      Print the saved default location");
    println!("  search <place name>");
    println!("      Geocode a place and print its coordinates");
    println!();
    println!("Configuration: --config <file.json>, SURVEY_API_BASE_URL, SURVEY_TIMEOUT_SECS,");
    println!("SURVEY_ROUTING_API_KEY, SURVEY_GEOCODER_URL, SURVEY_LOG_DIR, {}", TOKEN_VAR);
}

/// Value following `flag`, if present
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

pub fn load_config(args: &[String]) -> Result<SurveyConfig> {
    let file = flag_value(args, "--config").map(Path::new);
    Ok(SurveyConfig::load(file)?)
}

fn remote_store(config: &SurveyConfig, args: &[String]) -> Result<Arc<dyn RemoteStore>> {
    if let Some(db) = flag_value(args, "--db") {
        let conn = open_db(&PathBuf::from(db)).map_err(|e| anyhow!(e))?;
        return Ok(Arc::new(LocalStore::new(Arc::new(Mutex::new(conn)))));
    }
    let session = StaticSession(env::var(TOKEN_VAR).ok());
    let store = HttpRemoteStore::new(
        &config.api_base_url,
        Arc::new(session),
        config.request_timeout(),
    )?;
    Ok(Arc::new(store))
}

fn print_record(record: &WaypointRecord) {
    println!(
        "{}\t{}\t{:.6}\t{:.6}\t{}",
        record.id,
        record.name,
        record.latitude,
        record.longitude,
        record.notes.as_deref().unwrap_or("")
    );
}

/// Dispatch a subcommand. Returns `false` when `args` names none.
pub async fn handle_commands(args: &[String], config: &SurveyConfig) -> Result<bool> {
    match args.get(1).map(|s| s.as_str()) {
        Some("convert") => {
            let (Some(input), Some(format)) = (args.get(2), args.get(3)) else {
                bail!("usage: waypoint-survey convert <input> <json|xml|geojson|kml>");
            };
            let format = ExportFormat::from_str(format)
                .ok_or_else(|| anyhow!("unknown export format {:?}", format))?;
            let contents = std::fs::read_to_string(input)
                .with_context(|| format!("reading {}", input))?;

            let store = remote_store(config, args)?;
            let mut controller = SurveyController::new(store, HeadlessSurface::new());
            let summary = controller.import_file(input, &contents)?;
            let notice = summary.notice();
            tracing::info!("{}", notice.message);
            let _ = rolling_logger::info(&notice.message);

            let file = controller.export(format, chrono::Utc::now());
            let notice = Notice::exported(controller.collection().len(), format);
            tracing::info!(file = %file.file_name, "{}", notice.message);
            print!("{}", file.contents);
            eprintln!("{} ({} bytes, {})", file.file_name, file.contents.len(), file.mime_type);
            Ok(true)
        }
        Some("list") => {
            let store = remote_store(config, args)?;
            let records = store.list().await?;
            for record in &records {
                print_record(record);
            }
            tracing::info!(count = records.len(), "listed saved waypoints");
            Ok(true)
        }
        Some("default") => {
            let store = remote_store(config, args)?;
            let record = store.default_location().await?;
            print_record(&record);
            Ok(true)
        }
        Some("search") => {
            let query = args
                .iter()
                .skip(2)
                .take_while(|a| !a.starts_with("--"))
                .cloned()
                .collect::<Vec<_>>()
                .join(" ");
            let geocoder = Nominatim::new(&config.geocoder_url, config.request_timeout())?;
            let store = remote_store(config, args)?;
            let mut controller = SurveyController::new(store, HeadlessSurface::new());
            let place = controller.search_location(&geocoder, &query).await?;
            println!(
                "{:.6}\t{:.6}\t{}",
                place.coordinates.lat, place.coordinates.lng, place.display_name
            );
            let _ = rolling_logger::info(&Notice::found(&place).message);
            Ok(true)
        }
        Some("help") | Some("--help") | Some("-h") => {
            print_help();
            Ok(true)
        }
        _ => Ok(false),
    }
}
