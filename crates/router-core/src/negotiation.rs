//! Quote negotiation around the optimizer.
//!
//! A request is optimized once against sampled liquidity. When counterparties
//! are configured and native liquidity is allowed, they are asked for quotes
//! at the resulting comparison price; any quotes that come back are folded
//! into a fresh liquidity snapshot which is optimized exactly once more. A
//! first-round `NoOptimalPath` only surfaces when that second round cannot
//! happen or fails as well.

use crate::PathOptimizer;
use router_optimizer::{comparison_price, native_fill_penalty, OptimizedPaths, OptimizerOptions};
use router_quotes::QuoteService;
use router_types::{Address, Amount, MarketSideLiquidity, QuoteRequest, RouterError, Source};
use tracing::{debug, info};

/// Outcome of a negotiation.
#[derive(Debug, Clone)]
pub struct NegotiatedPaths {
	pub paths: OptimizedPaths,
	/// The snapshot the final paths were found in.
	pub liquidity: MarketSideLiquidity,
	pub optimizer_runs: usize,
	pub quote_enriched: bool,
	pub quotes_received: usize,
	pub comparison_price: Option<Amount>,
}

pub struct Negotiation<'a> {
	optimizer: &'a dyn PathOptimizer,
	quotes: &'a QuoteService,
	options: &'a OptimizerOptions,
}

impl<'a> Negotiation<'a> {
	pub fn new(
		optimizer: &'a dyn PathOptimizer,
		quotes: &'a QuoteService,
		options: &'a OptimizerOptions,
	) -> Self {
		Self {
			optimizer,
			quotes,
			options,
		}
	}

	pub async fn run(
		&self,
		liquidity: MarketSideLiquidity,
		taker_address: Address,
	) -> Result<NegotiatedPaths, RouterError> {
		debug!(stage = "optimizing", "Negotiation round 1");
		let first = match self.optimizer.optimize(&liquidity, self.options) {
			Ok(paths) => Some(paths),
			Err(RouterError::NoOptimalPath) => None,
			Err(e) => return Err(e),
		};

		if self.quotes.is_empty() || !liquidity.allowed_sources.contains(Source::Native) {
			return settle(first, liquidity, 1, None);
		}

		let comparison = first.as_ref().and_then(|paths| {
			let penalty = native_fill_penalty(self.options, &liquidity)?;
			comparison_price(&paths.path, &liquidity, penalty)
		});
		let request = QuoteRequest {
			maker_token: liquidity.maker_token,
			taker_token: liquidity.taker_token,
			amount: liquidity.input_amount,
			side: liquidity.side,
			taker_address,
			comparison_price: comparison,
		};
		debug!(
			stage = "awaiting_quotes",
			kind = %self.quotes.kind(),
			counterparties = self.quotes.len(),
			comparison_price = ?comparison,
			"Requesting quotes"
		);
		let received = self.quotes.request_quotes(&request).await;
		if received.is_empty() {
			info!(kind = %self.quotes.kind(), "No quotes received");
			return settle(first, liquidity, 1, comparison);
		}

		debug!(stage = "reoptimizing", quotes = received.len(), "Negotiation round 2");
		let enriched = liquidity.with_quotes(&received);
		match self.optimizer.optimize(&enriched, self.options) {
			Ok(paths) => Ok(NegotiatedPaths {
				paths,
				liquidity: enriched,
				optimizer_runs: 2,
				quote_enriched: true,
				quotes_received: received.len(),
				comparison_price: comparison,
			}),
			Err(RouterError::NoOptimalPath) => {
				let mut negotiated = settle(first, liquidity, 2, comparison)?;
				negotiated.quotes_received = received.len();
				Ok(negotiated)
			}
			Err(e) => Err(e),
		}
	}
}

fn settle(
	paths: Option<OptimizedPaths>,
	liquidity: MarketSideLiquidity,
	optimizer_runs: usize,
	comparison_price: Option<Amount>,
) -> Result<NegotiatedPaths, RouterError> {
	let paths = paths.ok_or(RouterError::NoOptimalPath)?;
	Ok(NegotiatedPaths {
		paths,
		liquidity,
		optimizer_runs,
		quote_enriched: false,
		quotes_received: 0,
		comparison_price,
	})
}
