use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use series_sync::source::{HttpSourceClient, SourceClient, SourceRegistry};
use series_sync::store::{FileDataStore, StaticCalendar, StaticEntityCatalog};
use series_sync::sync::{SyncBindings, SyncConfig, SyncCoordinator, SyncError};
use series_sync::utils::SystemClock;

/// Incrementally synchronize time-series records of tracked entities
#[derive(Parser, Debug)]
#[command(name = "series-sync", version)]
struct Args {
	/// Run configuration (JSON)
	#[arg(short, long)]
	config: PathBuf,

	/// Entity catalog (JSON array of entities)
	#[arg(short, long)]
	entities: PathBuf,

	/// Trading calendar (JSON object of region to trading days)
	#[arg(long)]
	calendar: Option<PathBuf>,

	/// Directory the records are persisted under
	#[arg(long, default_value = "data")]
	data_dir: PathBuf,

	/// Base URL of the HTTP record source
	#[arg(long)]
	source_url: String,

	/// Per-request timeout in seconds
	#[arg(long, default_value_t = 30)]
	timeout_secs: u64,
}

async fn run(args: Args) -> Result<bool, SyncError> {
	let config = SyncConfig::load(&args.config).await?;

	let catalog = StaticEntityCatalog::from_json_file(&args.entities)
		.await
		.map_err(|e| SyncError::Catalog(format!("{}: {}", args.entities.display(), e)))?;
	let calendar = match &args.calendar {
		Some(path) => StaticCalendar::from_json_file(path)
			.await
			.map_err(|e| SyncError::Calendar(format!("{}: {}", path.display(), e)))?,
		None => StaticCalendar::new(),
	};
	info!("Loaded catalog and calendar");

	let source = HttpSourceClient::new(args.source_url.clone(), Duration::from_secs(args.timeout_secs))
		.map_err(|e| SyncError::Configuration(format!("Failed to build source client: {}", e)))?;
	let mut sources = SourceRegistry::new();
	sources.register(config.schema.name.clone(), config.schema.provider.clone(), move || {
		Ok(Arc::new(source.clone()) as Arc<dyn SourceClient>)
	});

	let bindings = SyncBindings {
		store: Arc::new(FileDataStore::new(args.data_dir.clone())),
		catalog: Arc::new(catalog),
		calendar: Arc::new(calendar),
		sources,
		clock: Arc::new(SystemClock::new(config.utc_offset_minutes)),
	};

	let summary = SyncCoordinator::new(config, bindings)?.run().await?;
	Ok(!summary.all_failed())
}

#[tokio::main]
async fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting series sync");
	let args = Args::parse();

	match run(args).await {
		Ok(true) => ExitCode::SUCCESS,
		Ok(false) => {
			error!("Every entity failed to sync");
			ExitCode::FAILURE
		}
		Err(e) => {
			error!("Sync run aborted: {}", e);
			ExitCode::FAILURE
		}
	}
}
