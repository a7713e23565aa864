//! Configuration types for the router.

use crate::ConfigError;
use router_types::{Address, CostSchedule, ExchangeProxyOverhead, QuoteKind, Source, SourceFlags};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::Duration;

/// Complete router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	/// Service identity, logging and ports
	pub router: RouterSettings,
	#[serde(default)]
	pub routing: RoutingConfig,
	/// Per-fill fee in wei, by source name
	#[serde(default)]
	pub fees: BTreeMap<String, Decimal>,
	/// Per-fill gas units, by source name
	#[serde(default)]
	pub gas: BTreeMap<String, Decimal>,
	#[serde(default)]
	pub exchange_proxy_overhead: OverheadConfig,
	pub sampler: SamplerConfig,
	#[serde(default)]
	pub order: OrderConfig,
	#[serde(default)]
	pub quotes: QuotesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSettings {
	pub name: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
	#[serde(default = "default_http_port")]
	pub http_port: u16,
}

/// Knobs of a routing request that do not come with the request itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
	/// Wrapped ether, used to price gas in the traded tokens
	#[serde(default = "default_weth_token")]
	pub weth_token: Address,
	#[serde(default = "default_num_samples")]
	pub num_samples: usize,
	/// Geometric spacing of sampled amounts; 1 spaces them linearly
	#[serde(default = "default_sample_distribution_base")]
	pub sample_distribution_base: Decimal,
	#[serde(default = "default_bridge_slippage")]
	pub bridge_slippage: Decimal,
	#[serde(default = "default_true")]
	pub allow_fallback: bool,
	#[serde(default = "default_max_fallback_slippage")]
	pub max_fallback_slippage: Decimal,
	#[serde(default)]
	pub included_sources: Vec<String>,
	#[serde(default)]
	pub excluded_sources: Vec<String>,
	/// Gas price in wei
	#[serde(default)]
	pub gas_price: Decimal,
	#[serde(default = "default_protocol_fee_multiplier")]
	pub protocol_fee_multiplier: u64,
	#[serde(default = "default_run_limit")]
	pub run_limit: usize,
}

impl Default for RoutingConfig {
	fn default() -> Self {
		Self {
			weth_token: default_weth_token(),
			num_samples: default_num_samples(),
			sample_distribution_base: default_sample_distribution_base(),
			bridge_slippage: default_bridge_slippage(),
			allow_fallback: true,
			max_fallback_slippage: default_max_fallback_slippage(),
			included_sources: Vec::new(),
			excluded_sources: Vec::new(),
			gas_price: Decimal::ZERO,
			protocol_fee_multiplier: default_protocol_fee_multiplier(),
			run_limit: default_run_limit(),
		}
	}
}

impl RoutingConfig {
	pub fn included_sources(&self) -> Result<Vec<Source>, ConfigError> {
		parse_sources(&self.included_sources)
	}

	pub fn excluded_sources(&self) -> Result<Vec<Source>, ConfigError> {
		parse_sources(&self.excluded_sources)
	}
}

/// Settlement overhead in gas, priced at the routing gas price.
///
/// A path pays `base` once, `per_additional_source` for every source after
/// the first and the `sources` entry of each source it touches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverheadConfig {
	#[serde(default)]
	pub base: Decimal,
	#[serde(default)]
	pub per_additional_source: Decimal,
	#[serde(default)]
	pub sources: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
	/// Name of the sampler implementation
	pub implementation: String,
	#[serde(default = "default_sampler_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default = "default_pool_cache_ttl_secs")]
	pub pool_cache_ttl_secs: u64,
	/// Static pool discovery table, by source name
	#[serde(default)]
	pub pools: Option<toml::Value>,
	/// Remaining keys are handed to the sampler implementation
	#[serde(flatten)]
	pub config: toml::Table,
}

impl SamplerConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}

	pub fn pool_cache_ttl(&self) -> Duration {
		Duration::from_secs(self.pool_cache_ttl_secs)
	}

	pub fn implementation_config(&self) -> toml::Value {
		toml::Value::Table(self.config.clone())
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfig {
	#[serde(default = "default_order_implementation")]
	pub implementation: String,
	#[serde(flatten)]
	pub config: toml::Table,
}

impl Default for OrderConfig {
	fn default() -> Self {
		Self {
			implementation: default_order_implementation(),
			config: toml::Table::new(),
		}
	}
}

impl OrderConfig {
	pub fn implementation_config(&self) -> toml::Value {
		toml::Value::Table(self.config.clone())
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotesConfig {
	/// Which kind of quote the negotiation loop asks for
	#[serde(default = "default_quote_mode")]
	pub mode: QuoteKind,
	#[serde(default = "default_quote_timeout_ms")]
	pub timeout_ms: u64,
	/// One table per counterparty; `implementation` defaults to `http`
	#[serde(default)]
	pub counterparties: BTreeMap<String, toml::Value>,
}

impl Default for QuotesConfig {
	fn default() -> Self {
		Self {
			mode: default_quote_mode(),
			timeout_ms: default_quote_timeout_ms(),
			counterparties: BTreeMap::new(),
		}
	}
}

impl QuotesConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}
}

impl Config {
	/// Fee schedule in wei per fill.
	pub fn fee_schedule(&self) -> Result<CostSchedule, ConfigError> {
		constant_schedule(&self.fees)
	}

	/// Gas schedule in gas units per fill.
	pub fn gas_schedule(&self) -> Result<CostSchedule, ConfigError> {
		constant_schedule(&self.gas)
	}

	/// Overhead in wei as a function of the sources a path touches.
	pub fn exchange_proxy_overhead(&self) -> Result<ExchangeProxyOverhead, ConfigError> {
		let overhead = &self.exchange_proxy_overhead;
		let per_source = overhead
			.sources
			.iter()
			.map(|(name, gas)| Ok((parse_source(name)?, *gas)))
			.collect::<Result<HashMap<Source, Decimal>, ConfigError>>()?;
		if overhead.base.is_zero()
			&& overhead.per_additional_source.is_zero()
			&& per_source.is_empty()
		{
			return Ok(ExchangeProxyOverhead::zero());
		}

		let base = overhead.base;
		let additional = overhead.per_additional_source;
		let gas_price = self.routing.gas_price;
		Ok(ExchangeProxyOverhead::from_fn(move |flags: SourceFlags| {
			let extra_sources = Decimal::from(flags.count().saturating_sub(1));
			let gas = flags
				.sources()
				.iter()
				.filter_map(|s| per_source.get(s))
				.fold(base + additional * extra_sources, |acc, g| acc + *g);
			gas * gas_price
		}))
	}
}

fn constant_schedule(table: &BTreeMap<String, Decimal>) -> Result<CostSchedule, ConfigError> {
	table.iter().try_fold(CostSchedule::new(), |schedule, (name, cost)| {
		Ok(schedule.with_constant(parse_source(name)?, *cost))
	})
}

fn parse_source(name: &str) -> Result<Source, ConfigError> {
	Source::from_str(name).map_err(ConfigError::ValidationError)
}

fn parse_sources(names: &[String]) -> Result<Vec<Source>, ConfigError> {
	names.iter().map(|n| parse_source(n)).collect()
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_http_port() -> u16 {
	3000
}

fn default_weth_token() -> Address {
	Address::new([
		0xc0, 0x2a, 0xaa, 0x39, 0xb2, 0x23, 0xfe, 0x8d, 0x0a, 0x0e, 0x5c, 0x4f, 0x27, 0xea, 0xd9,
		0x08, 0x3c, 0x75, 0x6c, 0xc2,
	])
}

fn default_num_samples() -> usize {
	13
}

fn default_sample_distribution_base() -> Decimal {
	Decimal::new(105, 2)
}

fn default_bridge_slippage() -> Decimal {
	Decimal::new(5, 3)
}

fn default_max_fallback_slippage() -> Decimal {
	Decimal::new(5, 2)
}

fn default_true() -> bool {
	true
}

fn default_protocol_fee_multiplier() -> u64 {
	70_000
}

fn default_run_limit() -> usize {
	1 << 15
}

fn default_sampler_timeout_ms() -> u64 {
	2_000
}

fn default_pool_cache_ttl_secs() -> u64 {
	3_600
}

fn default_order_implementation() -> String {
	"bridge".to_string()
}

fn default_quote_mode() -> QuoteKind {
	QuoteKind::Indicative
}

fn default_quote_timeout_ms() -> u64 {
	1_000
}
