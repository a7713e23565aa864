//! Assembles a [`Router`] from configuration and named factories.

use crate::{Router, RoutingSettings};
use router_config::Config;
use router_order::{OrderError, OrderInterface, OrderService};
use router_quotes::{QuoteError, QuoteProviderInterface, QuoteService};
use router_sampler::{
	PoolDiscoveryInterface, PoolsCache, SamplerError, SamplerInterface, SamplerService,
};
use router_sources::SourceCatalog;
use router_types::RouterError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Counterparty implementation used when a table names none.
const DEFAULT_QUOTE_IMPLEMENTATION: &str = "http";

// Type aliases for factory functions
type SamplerFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn SamplerInterface>, SamplerError> + Send>;
type PoolDiscoveryFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn PoolDiscoveryInterface>, SamplerError> + Send>;
type QuoteFactory = Box<
	dyn Fn(&str, &toml::Value) -> Result<Box<dyn QuoteProviderInterface>, QuoteError> + Send,
>;
type OrderFactory =
	Box<dyn Fn(&toml::Value) -> Result<Box<dyn OrderInterface>, OrderError> + Send>;

// Factory pattern for creating services from config
pub struct RouterBuilder {
	config: Config,
	sampler_factories: HashMap<String, SamplerFactory>,
	pool_discovery_factory: Option<PoolDiscoveryFactory>,
	quote_factories: HashMap<String, QuoteFactory>,
	order_factories: HashMap<String, OrderFactory>,
}

impl RouterBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			sampler_factories: HashMap::new(),
			pool_discovery_factory: None,
			quote_factories: HashMap::new(),
			order_factories: HashMap::new(),
		}
	}

	pub fn with_sampler_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn SamplerInterface>, SamplerError> + Send + 'static,
	{
		self.sampler_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_pool_discovery_factory<F>(mut self, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn PoolDiscoveryInterface>, SamplerError>
			+ Send
			+ 'static,
	{
		self.pool_discovery_factory = Some(Box::new(factory));
		self
	}

	pub fn with_quote_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&str, &toml::Value) -> Result<Box<dyn QuoteProviderInterface>, QuoteError>
			+ Send
			+ 'static,
	{
		self.quote_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn with_order_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn OrderInterface>, OrderError> + Send + 'static,
	{
		self.order_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	pub fn build(self) -> Result<Router, RouterError> {
		let config = &self.config;
		let settings = RoutingSettings::from_config(config)?;

		// Create the sampler
		let sampler_factory = self
			.sampler_factories
			.get(&config.sampler.implementation)
			.ok_or_else(|| {
				RouterError::Configuration(format!(
					"Unknown sampler implementation: {}",
					config.sampler.implementation
				))
			})?;
		let sampler = sampler_factory(&config.sampler.implementation_config())?;

		let discovery = match (&config.sampler.pools, &self.pool_discovery_factory) {
			(Some(pools), Some(factory)) => Some(factory(pools)?),
			(Some(_), None) => {
				return Err(RouterError::Configuration(
					"Pools configured but no pool discovery factory provided".into(),
				))
			}
			(None, _) => None,
		};

		let sampler = SamplerService::new(
			sampler,
			discovery,
			Arc::new(PoolsCache::new(config.sampler.pool_cache_ttl())),
			SourceCatalog::standard(),
			config.sampler.timeout(),
		);

		// Create counterparties
		let mut providers = Vec::new();
		for (name, table) in &config.quotes.counterparties {
			let implementation = table
				.get("implementation")
				.and_then(|v| v.as_str())
				.unwrap_or(DEFAULT_QUOTE_IMPLEMENTATION);
			let factory = self.quote_factories.get(implementation).ok_or_else(|| {
				RouterError::Configuration(format!(
					"Unknown quote implementation '{}' for counterparty {}",
					implementation, name
				))
			})?;
			providers.push(factory(name, table)?);
		}
		let quotes = QuoteService::new(providers, config.quotes.mode, config.quotes.timeout());

		// Create the order materializer
		let order_factory = self
			.order_factories
			.get(&config.order.implementation)
			.ok_or_else(|| {
				RouterError::Configuration(format!(
					"Unknown order implementation: {}",
					config.order.implementation
				))
			})?;
		let orders = OrderService::new(order_factory(&config.order.implementation_config())?);

		info!(
			router = %config.router.name,
			sampler = %config.sampler.implementation,
			counterparties = quotes.len(),
			quote_mode = %config.quotes.mode,
			"Router assembled"
		);

		Ok(Router::new(sampler, quotes, orders, settings))
	}
}
