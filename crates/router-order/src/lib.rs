//! Order materialization for the swap router.
//!
//! Turns a selected path into the orders a taker submits. Native fills are
//! re-emitted as the resting orders they came from. Every other fill becomes
//! a synthetic order whose maker is a bridge contract that sources the
//! liquidity during settlement.

use router_types::{Address, ConfigSchema, Order, Path, RouterError, Side, Source};
use thiserror::Error;

pub mod asset_data;

/// Re-export implementations
pub mod implementations {
	pub mod bridge;
}

/// Errors that can occur while materializing orders.
#[derive(Debug, Error)]
pub enum OrderError {
	/// No bridge contract is configured for the source.
	#[error("No bridge configured for {0}")]
	MissingBridge(Source),
	/// A fill does not carry the data its source needs.
	#[error("Invalid fill: {0}")]
	InvalidFill(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

impl From<OrderError> for RouterError {
	fn from(err: OrderError) -> Self {
		match err {
			OrderError::InvalidConfig(msg) => RouterError::Configuration(msg),
			other => RouterError::Materialization(other.to_string()),
		}
	}
}

/// The trade a path is materialized for.
#[derive(Debug, Clone, Copy)]
pub struct OrderContext {
	pub side: Side,
	pub maker_token: Address,
	pub taker_token: Address,
}

/// Trait defining the interface for order materializers.
///
/// The encoding of the final executable order belongs to the implementation;
/// the router only relies on the abstract [`Order`] shape.
pub trait OrderInterface: Send + Sync {
	/// Returns the configuration schema for this materializer.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Converts every fill of `path` into orders, in path order.
	fn materialize(&self, path: &Path, context: &OrderContext) -> Result<Vec<Order>, OrderError>;
}

/// Service that owns the configured materializer.
pub struct OrderService {
	implementation: Box<dyn OrderInterface>,
}

impl OrderService {
	pub fn new(implementation: Box<dyn OrderInterface>) -> Self {
		Self { implementation }
	}

	/// Materializes a path. An empty path yields no orders.
	pub fn materialize(&self, path: &Path, context: &OrderContext) -> Result<Vec<Order>, OrderError> {
		if path.is_empty() {
			return Ok(Vec::new());
		}
		self.implementation.materialize(path, context)
	}
}
