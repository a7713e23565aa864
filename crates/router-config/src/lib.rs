//! Configuration loading for the swap router.

use rust_decimal::Decimal;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub mod types;

pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

impl From<ConfigError> for router_types::RouterError {
	fn from(err: ConfigError) -> Self {
		router_types::RouterError::Configuration(err.to_string())
	}
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "ROUTER_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		let Some(file_path) = &self.file_path else {
			return Err(ConfigError::FileNotFound(
				"No configuration file specified".to_string(),
			));
		};
		let content = tokio::fs::read_to_string(file_path)
			.await
			.map_err(|e| match e.kind() {
				std::io::ErrorKind::NotFound => ConfigError::FileNotFound(file_path.clone()),
				_ => ConfigError::IoError(e),
			})?;
		debug!(path = %file_path, "Loaded configuration file");

		self.load_str(&content)
	}

	/// Parses, overrides and validates configuration text.
	pub fn load_str(&self, content: &str) -> Result<Config, ConfigError> {
		let substituted = substitute_env_vars(content)?;
		let mut config: Config =
			toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))?;

		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;

		Ok(config)
	}

	fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			config.router.log_level = log_level;
		}

		if let Ok(http_port) = env::var(format!("{}HTTP_PORT", self.env_prefix)) {
			config.router.http_port = http_port
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid HTTP port: {}", e)))?;
		}

		Ok(())
	}
}

/// Replaces every `${VAR_NAME}` with the variable's value.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = regex::Regex::new(r"\$\{([^}]+)\}")
		.map_err(|e| ConfigError::ParseError(e.to_string()))?;
	let mut result = content.to_string();

	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
	let routing = &config.routing;

	if config.router.name.is_empty() {
		return Err(invalid("router.name must not be empty"));
	}
	if routing.num_samples == 0 {
		return Err(invalid("routing.num_samples must be at least 1"));
	}
	if routing.sample_distribution_base <= Decimal::ZERO {
		return Err(invalid("routing.sample_distribution_base must be positive"));
	}
	if routing.bridge_slippage.is_sign_negative() || routing.bridge_slippage >= Decimal::ONE {
		return Err(invalid("routing.bridge_slippage must be in [0, 1)"));
	}
	if routing.max_fallback_slippage.is_sign_negative() {
		return Err(invalid("routing.max_fallback_slippage must not be negative"));
	}
	if routing.gas_price.is_sign_negative() {
		return Err(invalid("routing.gas_price must not be negative"));
	}
	if routing.run_limit == 0 {
		return Err(invalid("routing.run_limit must be at least 1"));
	}

	let included = routing.included_sources()?;
	let excluded = routing.excluded_sources()?;
	if !included.is_empty() && !excluded.is_empty() {
		return Err(invalid(
			"routing.included_sources and routing.excluded_sources are mutually exclusive",
		));
	}

	for (section, table) in [("fees", &config.fees), ("gas", &config.gas)] {
		for (name, cost) in table {
			if cost.is_sign_negative() {
				return Err(ConfigError::ValidationError(format!(
					"{}.{} must not be negative",
					section, name
				)));
			}
		}
	}
	config.fee_schedule()?;
	config.gas_schedule()?;
	config.exchange_proxy_overhead()?;

	if config.sampler.implementation.is_empty() {
		return Err(invalid("sampler.implementation must not be empty"));
	}
	if config.sampler.timeout_ms == 0 {
		return Err(invalid("sampler.timeout_ms must be at least 1"));
	}
	if config.quotes.timeout_ms == 0 {
		return Err(invalid("quotes.timeout_ms must be at least 1"));
	}
	for (name, counterparty) in &config.quotes.counterparties {
		if !counterparty.is_table() {
			return Err(ConfigError::ValidationError(format!(
				"quotes.counterparties.{} must be a table",
				name
			)));
		}
	}

	Ok(())
}

fn invalid(message: &str) -> ConfigError {
	ConfigError::ValidationError(message.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use router_types::{QuoteKind, Source, SourceFlags};
	use std::io::Write;

	const MINIMAL: &str = r#"
[router]
name = "test-router"

[sampler]
implementation = "rate_table"
"#;

	#[test]
	fn test_defaults() {
		let config = ConfigLoader::new().load_str(MINIMAL).unwrap();
		assert_eq!(config.router.log_level, "info");
		assert_eq!(config.routing.num_samples, 13);
		assert_eq!(config.routing.run_limit, 32768);
		assert_eq!(config.routing.protocol_fee_multiplier, 70_000);
		assert!(config.routing.allow_fallback);
		assert_eq!(config.order.implementation, "bridge");
		assert_eq!(config.quotes.mode, QuoteKind::Indicative);
		assert!(config.quotes.counterparties.is_empty());
	}

	#[test]
	fn test_full_config() {
		let content = r#"
[router]
name = "test-router"
http_port = 8080

[routing]
num_samples = 5
sample_distribution_base = 1
gas_price = "50000000000"
excluded_sources = ["Kyber", "mstable"]

[fees]
Native = 1000

[gas]
Native = 150000
Uniswap = "90000"

[exchange_proxy_overhead]
base = 10000
sources = { LiquidityProvider = 130000 }

[sampler]
implementation = "rate_table"
timeout_ms = 500
pools = { Balancer = ["0x0000000000000000000000000000000000000b01"] }

[sampler.curves]
Uniswap = [1.0, 0.9]

[order]
chain_id = 1

[order.bridges]
Uniswap = "0x36691c4f426eb8f42f150ebde43069a31cb080ad"

[quotes]
mode = "firm"

[quotes.counterparties.alpha]
url = "https://alpha.example.org"
"#;
		let config = ConfigLoader::new().load_str(content).unwrap();
		assert_eq!(config.router.http_port, 8080);
		assert_eq!(
			config.routing.excluded_sources().unwrap(),
			vec![Source::Kyber, Source::MStable]
		);

		let gas = config.gas_schedule().unwrap();
		assert_eq!(gas.cost_of(Source::Uniswap, Decimal::ONE), Decimal::from(90_000));
		assert!(!gas.contains(Source::Kyber));

		let overhead = config.exchange_proxy_overhead().unwrap();
		let gas_price = Decimal::from(50_000_000_000u64);
		assert_eq!(
			overhead.cost(Source::LiquidityProvider.flag()),
			Decimal::from(140_000) * gas_price
		);
		assert_eq!(overhead.cost(SourceFlags::empty()), Decimal::ZERO);

		assert!(config.sampler.pools.is_some());
		let sampler = config.sampler.implementation_config();
		assert!(sampler.get("curves").is_some());
		assert!(sampler.get("implementation").is_none());
		assert!(config.order.implementation_config().get("bridges").is_some());
		assert_eq!(config.quotes.mode, QuoteKind::Firm);
		assert!(config.quotes.counterparties.contains_key("alpha"));
	}

	#[test]
	fn test_rejects_invalid_routing() {
		let loader = ConfigLoader::new();
		let with_routing = |routing: &str| format!("{}\n[routing]\n{}\n", MINIMAL, routing);

		assert!(loader.load_str(&with_routing("bridge_slippage = 1.5")).is_err());
		assert!(loader.load_str(&with_routing("num_samples = 0")).is_err());
		assert!(loader
			.load_str(&with_routing(
				"included_sources = [\"Uniswap\"]\nexcluded_sources = [\"Kyber\"]"
			))
			.is_err());
		assert!(loader
			.load_str(&with_routing("included_sources = [\"Nowhere\"]"))
			.is_err());

		let bad_fee = format!("{}\n[fees]\nNowhere = 1\n", MINIMAL);
		assert!(matches!(
			loader.load_str(&bad_fee),
			Err(ConfigError::ValidationError(_))
		));
	}

	#[test]
	fn test_env_substitution() {
		env::set_var("ROUTER_TEST_SUBSTITUTED_NAME", "from-env");
		let content = MINIMAL.replace("test-router", "${ROUTER_TEST_SUBSTITUTED_NAME}");
		let config = ConfigLoader::new().load_str(&content).unwrap();
		assert_eq!(config.router.name, "from-env");

		let missing = MINIMAL.replace("test-router", "${ROUTER_TEST_UNSET_VARIABLE}");
		assert!(matches!(
			ConfigLoader::new().load_str(&missing),
			Err(ConfigError::EnvVarNotFound(name)) if name == "ROUTER_TEST_UNSET_VARIABLE"
		));
	}

	#[test]
	fn test_env_overrides() {
		env::set_var("ROUTERTEST_LOG_LEVEL", "debug");
		env::set_var("ROUTERTEST_HTTP_PORT", "9999");
		let config = ConfigLoader::new()
			.with_env_prefix("ROUTERTEST_")
			.load_str(MINIMAL)
			.unwrap();
		assert_eq!(config.router.log_level, "debug");
		assert_eq!(config.router.http_port, 9999);

		env::set_var("ROUTERBAD_HTTP_PORT", "not-a-port");
		assert!(ConfigLoader::new()
			.with_env_prefix("ROUTERBAD_")
			.load_str(MINIMAL)
			.is_err());
	}

	#[tokio::test]
	async fn test_load_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(MINIMAL.as_bytes()).unwrap();

		let config = ConfigLoader::new().with_file(file.path()).load().await.unwrap();
		assert_eq!(config.router.name, "test-router");

		let missing = ConfigLoader::new()
			.with_file("/nonexistent/router.toml")
			.load()
			.await;
		assert!(matches!(missing, Err(ConfigError::FileNotFound(_))));
		assert!(matches!(
			ConfigLoader::new().load().await,
			Err(ConfigError::FileNotFound(_))
		));
	}
}
