use anyhow::Context;
use atomicwrites::{AllowOverwrite, AtomicFile};
use carscope_api::{Resources, RestApi, ServerConfig, SessionStore};
use carscope_core::{analytics, Dataset, VehicleRecord};
use carscope_features::find_nearest;
use carscope_model::{BatchPrediction, TreeModel};
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Vehicle price exploration service
#[derive(Parser, Debug)]
#[command(name = "carscope")]
#[command(about = "Vehicle price prediction and dataset insights", long_about = None)]
struct Cli {
    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Predict prices for every row of a CSV file
    Batch {
        /// Input CSV
        input: PathBuf,
        /// Output CSV with a Predicted_price column
        output: PathBuf,
        /// Path to the model artifact
        #[arg(short, long, default_value = "model/vehicle_price_model.json")]
        model: PathBuf,
    },
    /// Find the dataset vehicle closest to the given numbers
    Similar {
        #[command(flatten)]
        dataset: DatasetArgs,
        #[arg(long)]
        year: Option<f64>,
        #[arg(long)]
        mileage: Option<f64>,
        #[arg(long)]
        cylinders: Option<f64>,
        #[arg(long)]
        doors: Option<f64>,
    },
    /// Print dataset and price statistics
    Stats {
        #[command(flatten)]
        dataset: DatasetArgs,
    },
}

#[derive(Args, Debug)]
struct DatasetArgs {
    /// Path to the dataset CSV
    #[arg(short, long, default_value = "dataset/dataset.csv")]
    dataset: PathBuf,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    dataset: DatasetArgs,

    /// Path to the model artifact
    #[arg(short, long, default_value = "model/vehicle_price_model.json")]
    model: PathBuf,

    /// HTTP API port
    #[arg(long, default_value_t = 8080)]
    http_port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Evict sessions idle for this many seconds
    #[arg(long, default_value_t = 1800)]
    session_idle_secs: u64,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        ServerConfig {
            dataset_path: args.dataset.dataset,
            model_path: args.model,
            bind: args.bind,
            http_port: args.http_port,
            session_idle: Duration::from_secs(args.session_idle_secs),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Serve(args) => serve(args.into()).await,
        Command::Batch {
            input,
            output,
            model,
        } => batch(input, output, model),
        Command::Similar {
            dataset,
            year,
            mileage,
            cylinders,
            doors,
        } => {
            let query = VehicleRecord::new()
                .with("year", year)
                .with("mileage", mileage)
                .with("cylinders", cylinders)
                .with("doors", doors);
            similar(dataset, query)
        }
        Command::Stats { dataset } => stats(dataset),
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    info!("Starting carscope v{}", env!("CARGO_PKG_VERSION"));
    info!("Dataset: {:?}", config.dataset_path);
    info!("Model: {:?}", config.model_path);
    info!("HTTP API port: {}", config.http_port);

    let resources = Arc::new(
        Resources::load(&config)
            .with_context(|| format!("loading dataset {:?}", config.dataset_path))?,
    );
    let sessions = Arc::new(SessionStore::with_idle_ttl(config.session_idle));
    info!("Resources initialized");

    let sweeper = sessions.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            let evicted = sweeper.sweep();
            if evicted > 0 {
                info!("Evicted {} idle sessions, {} active", evicted, sweeper.len());
            }
        }
    });

    let bind = config.bind.clone();
    let http_port = config.http_port;
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on {}:{}", bind, http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(resources, sessions, bind, http_port).await {
                eprintln!("HTTP server error: {}", e);
            }
        })
    });

    info!("carscope started successfully");
    info!("HTTP API: http://localhost:{}/", config.http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}

fn batch(input: PathBuf, output: PathBuf, model_path: PathBuf) -> anyhow::Result<()> {
    let model = TreeModel::load(&model_path)
        .with_context(|| format!("loading model {:?}", model_path))?;
    let csv = std::fs::read(&input).with_context(|| format!("reading {:?}", input))?;

    let batch = BatchPrediction::from_csv(&model, &csv)?;
    for notice in batch.insights().notices {
        warn!("{}", notice);
    }

    let out = batch.to_csv()?;
    AtomicFile::new(&output, AllowOverwrite)
        .write(|f| f.write_all(&out))
        .with_context(|| format!("writing {:?}", output))?;
    info!("Wrote {} predictions to {:?}", batch.len(), output);
    Ok(())
}

fn similar(args: DatasetArgs, query: VehicleRecord) -> anyhow::Result<()> {
    let dataset = Dataset::load(&args.dataset)?;
    let nearest = find_nearest(&dataset, &query)?;
    println!("Closest vehicle: {}", analytics::vehicle_label(&nearest.record));
    println!("{}", serde_json::to_string_pretty(&nearest)?);
    Ok(())
}

fn stats(args: DatasetArgs) -> anyhow::Result<()> {
    let dataset = Dataset::load(&args.dataset)?;
    let report = serde_json::json!({
        "dataset": analytics::dataset_info(&dataset),
        "price": analytics::price_stats(&dataset)?,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
