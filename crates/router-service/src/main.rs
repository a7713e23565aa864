use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use router_config::{Config, ConfigLoader};
use router_core::{Router, RouterBuilder, SwapRequest};
use router_types::{Address, Decimal, Side, Source};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod factories;

#[derive(Parser)]
#[command(name = "swap-router")]
#[command(about = "Smart order router for token swaps", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
	#[command(subcommand)]
	command: Option<Commands>,

	#[arg(short, long, value_name = "FILE", default_value = "config/router.toml")]
	config: PathBuf,

	/// Overrides `router.log_level` from the configuration
	#[arg(long, env = "ROUTER_LOG_LEVEL")]
	log_level: Option<String>,

	#[arg(long, value_enum, default_value_t = LogFormat::Text)]
	log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
	Text,
	Json,
}

#[derive(Subcommand)]
enum Commands {
	/// Start the HTTP API
	Serve,
	/// Route one request and print the result as JSON
	Quote {
		#[arg(long)]
		maker_token: Address,
		#[arg(long)]
		taker_token: Address,
		/// Amount in base units of the sold (sell) or bought (buy) token
		#[arg(long)]
		amount: Decimal,
		#[arg(long, default_value = "sell")]
		side: Side,
		#[arg(long, default_value_t = Address::ZERO)]
		taker_address: Address,
		/// Comma separated sources to restrict routing to
		#[arg(long, value_delimiter = ',')]
		include: Vec<Source>,
		/// Comma separated sources to leave out
		#[arg(long, value_delimiter = ',')]
		exclude: Vec<Source>,
	},
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

	let log_level = cli.log_level.as_deref().unwrap_or(&config.router.log_level);
	setup_tracing(log_level, cli.log_format)?;

	match cli.command {
		Some(Commands::Serve) | None => serve(config).await,
		Some(Commands::Quote {
			maker_token,
			taker_token,
			amount,
			side,
			taker_address,
			include,
			exclude,
		}) => {
			let request = SwapRequest {
				maker_token,
				taker_token,
				amount,
				side,
				taker_address,
				included_sources: include,
				excluded_sources: exclude,
				native_orders: Vec::new(),
			};
			quote(config, request).await
		}
		Some(Commands::Validate) => validate_config(config),
	}
}

fn build_router(config: Config) -> Result<Router> {
	factories::register(RouterBuilder::new(config))
		.build()
		.context("Failed to build router")
}

async fn serve(config: Config) -> Result<()> {
	info!("Starting swap router");
	info!("Router name: {}", config.router.name);
	info!("HTTP port: {}", config.router.http_port);

	let port = config.router.http_port;
	let name = config.router.name.clone();
	let router = Arc::new(build_router(config)?);

	api::ApiServer::new(port, name, router)
		.run(shutdown_signal())
		.await
		.context("HTTP server failed")?;

	info!("Swap router stopped");
	Ok(())
}

async fn quote(config: Config, request: SwapRequest) -> Result<()> {
	let router = build_router(config)?;
	let quote = router
		.route(&request)
		.await
		.context("Failed to route request")?;
	println!("{}", serde_json::to_string_pretty(&quote)?);
	Ok(())
}

fn validate_config(config: Config) -> Result<()> {
	info!("Configuration is valid");
	info!("Router name: {}", config.router.name);
	info!("Sampler: {}", config.sampler.implementation);
	info!("Order materializer: {}", config.order.implementation);
	info!("Quote mode: {}", config.quotes.mode);
	for name in config.quotes.counterparties.keys() {
		info!("  Counterparty: {}", name);
	}

	// Instantiating checks the implementation tables as well.
	build_router(config)?;
	info!("All implementations instantiated");
	Ok(())
}

fn setup_tracing(log_level: &str, format: LogFormat) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	let registry = tracing_subscriber::registry().with(env_filter);
	match format {
		LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json())
			.try_init()?,
	}

	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			warn!("Failed to install Ctrl+C handler: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				warn!("Failed to install signal handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	info!("Shutdown signal received, stopping services...");
}
