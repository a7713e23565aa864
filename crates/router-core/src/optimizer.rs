//! The optimizer seam of the negotiation loop.

use router_optimizer::{OptimizedPaths, OptimizerOptions};
use router_types::{MarketSideLiquidity, RouterError};

/// Finds the best path, and optionally a fallback, for one liquidity
/// snapshot.
///
/// Implementations must be pure: the negotiation loop may call them twice
/// per request with different snapshots.
pub trait PathOptimizer: Send + Sync {
	fn optimize(
		&self,
		liquidity: &MarketSideLiquidity,
		options: &OptimizerOptions,
	) -> Result<OptimizedPaths, RouterError>;
}

/// Fill construction plus bounded path search.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPathOptimizer;

impl PathOptimizer for DefaultPathOptimizer {
	fn optimize(
		&self,
		liquidity: &MarketSideLiquidity,
		options: &OptimizerOptions,
	) -> Result<OptimizedPaths, RouterError> {
		router_optimizer::optimize(liquidity, options)
	}
}
