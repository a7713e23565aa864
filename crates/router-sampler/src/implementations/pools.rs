//! Pool discovery from a fixed pool list.

use crate::{PoolDiscoveryInterface, SamplerError};
use async_trait::async_trait;
use router_types::{Address, ConfigSchema, Schema, Source, ValidationError};
use std::collections::HashMap;
use std::str::FromStr;

/// Returns the same configured pools for every pair of a source.
#[derive(Debug, Clone, Default)]
pub struct StaticPoolDiscovery {
	pools: HashMap<Source, Vec<Address>>,
}

impl StaticPoolDiscovery {
	pub fn new(pools: HashMap<Source, Vec<Address>>) -> Self {
		Self { pools }
	}
}

#[async_trait]
impl PoolDiscoveryInterface for StaticPoolDiscovery {
	async fn discover_pools(
		&self,
		source: Source,
		_maker_token: Address,
		_taker_token: Address,
	) -> Result<Vec<Address>, SamplerError> {
		Ok(self.pools.get(&source).cloned().unwrap_or_default())
	}
}

pub struct StaticPoolSchema;

impl ConfigSchema for StaticPoolSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)?;
		let Some(table) = config.as_table() else {
			return Ok(());
		};
		for (name, pools) in table {
			Source::from_str(name).map_err(|message| ValidationError::InvalidValue {
				field: name.clone(),
				message,
			})?;
			let pools = pools.as_array().ok_or_else(|| ValidationError::TypeMismatch {
				field: name.clone(),
				expected: "array".to_string(),
				actual: pools.type_str().to_string(),
			})?;
			for pool in pools {
				let valid = pool.as_str().is_some_and(|s| Address::from_str(s).is_ok());
				if !valid {
					return Err(ValidationError::InvalidValue {
						field: name.clone(),
						message: format!("invalid pool address {}", pool),
					});
				}
			}
		}
		Ok(())
	}
}

/// Factory function to create static pool discovery from configuration.
///
/// The table maps source names to arrays of pool addresses.
pub fn create_pool_discovery(
	config: &toml::Value,
) -> Result<Box<dyn PoolDiscoveryInterface>, SamplerError> {
	StaticPoolSchema
		.validate(config)
		.map_err(|e| SamplerError::InvalidConfig(e.to_string()))?;

	let mut pools = HashMap::new();
	if let Some(table) = config.as_table() {
		for (name, list) in table {
			let source = Source::from_str(name).map_err(SamplerError::InvalidConfig)?;
			let addresses = list
				.as_array()
				.into_iter()
				.flatten()
				.filter_map(|v| v.as_str())
				.filter_map(|s| Address::from_str(s).ok())
				.collect();
			pools.insert(source, addresses);
		}
	}
	Ok(Box::new(StaticPoolDiscovery::new(pools)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_configured_pools_are_returned() {
		let config: toml::Value = toml::from_str(
			r#"
			Balancer = ["0x0000000000000000000000000000000000000b01", "0x0000000000000000000000000000000000000b02"]
			"#,
		)
		.unwrap();
		let discovery = create_pool_discovery(&config).unwrap();
		let pools = discovery
			.discover_pools(Source::Balancer, Address::ZERO, Address::ZERO)
			.await
			.unwrap();
		assert_eq!(pools.len(), 2);
		let none = discovery
			.discover_pools(Source::Cream, Address::ZERO, Address::ZERO)
			.await
			.unwrap();
		assert!(none.is_empty());
	}

	#[test]
	fn test_invalid_pool_is_rejected() {
		let config: toml::Value = toml::from_str(r#"Balancer = ["0x12"]"#).unwrap();
		assert!(create_pool_discovery(&config).is_err());
	}
}
