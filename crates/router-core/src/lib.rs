//! Routing orchestration for the swap router.
//!
//! A [`Router`] resolves the allowed sources, samples the market, negotiates
//! with quote counterparties around the optimizer and materializes the
//! selected paths into orders.

use router_config::Config;
use router_optimizer::OptimizerOptions;
use router_order::{OrderContext, OrderService};
use router_quotes::QuoteService;
use router_sampler::{SamplerService, SamplingRequest};
use router_types::{
	Address, Amount, Decimal, Order, RouterError, Side, SignedOrder, Source,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

pub mod builder;
pub mod negotiation;
pub mod optimizer;
pub mod report;

pub use builder::RouterBuilder;
pub use negotiation::{Negotiation, NegotiatedPaths};
pub use optimizer::{DefaultPathOptimizer, PathOptimizer};
pub use report::QuoteReport;

/// A request to trade a fixed amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
	/// Token the taker receives.
	pub maker_token: Address,
	/// Token the taker pays.
	pub taker_token: Address,
	/// Taker amount sold, or maker amount bought, in base units.
	pub amount: Amount,
	pub side: Side,
	#[serde(default)]
	pub taker_address: Address,
	/// Overrides the configured source filters when either list is set.
	#[serde(default)]
	pub included_sources: Vec<Source>,
	#[serde(default)]
	pub excluded_sources: Vec<Source>,
	/// Resting orders the caller holds for this pair.
	#[serde(default)]
	pub native_orders: Vec<SignedOrder>,
}

/// The orders to submit for a request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
	pub side: Side,
	pub maker_token: Address,
	pub taker_token: Address,
	pub amount: Amount,
	/// Input consumed by the primary path.
	pub input: Amount,
	/// Output of the primary path before costs.
	pub output: Amount,
	/// Output of the primary path after fees, gas and overhead.
	pub adjusted_output: Amount,
	pub orders: Vec<Order>,
	/// Orders of the fallback path; empty when there is none.
	pub fallback_orders: Vec<Order>,
	pub report: QuoteReport,
}

/// Per-deployment routing knobs.
#[derive(Debug, Clone)]
pub struct RoutingSettings {
	pub weth_token: Address,
	pub num_samples: usize,
	pub sample_distribution_base: Decimal,
	pub included_sources: Vec<Source>,
	pub excluded_sources: Vec<Source>,
	pub optimizer: OptimizerOptions,
}

impl RoutingSettings {
	pub fn from_config(config: &Config) -> Result<Self, RouterError> {
		let routing = &config.routing;
		Ok(Self {
			weth_token: routing.weth_token,
			num_samples: routing.num_samples,
			sample_distribution_base: routing.sample_distribution_base,
			included_sources: routing.included_sources()?,
			excluded_sources: routing.excluded_sources()?,
			optimizer: OptimizerOptions {
				bridge_slippage: routing.bridge_slippage,
				allow_fallback: routing.allow_fallback,
				max_fallback_slippage: routing.max_fallback_slippage,
				run_limit: routing.run_limit,
				gas_price: routing.gas_price,
				protocol_fee_multiplier: Decimal::from(routing.protocol_fee_multiplier),
				fee_schedule: config.fee_schedule()?,
				gas_schedule: config.gas_schedule()?,
				exchange_proxy_overhead: config.exchange_proxy_overhead()?,
			},
		})
	}
}

pub struct Router {
	sampler: SamplerService,
	quotes: QuoteService,
	orders: OrderService,
	optimizer: Box<dyn PathOptimizer>,
	settings: RoutingSettings,
}

impl Router {
	pub fn new(
		sampler: SamplerService,
		quotes: QuoteService,
		orders: OrderService,
		settings: RoutingSettings,
	) -> Self {
		Self {
			sampler,
			quotes,
			orders,
			optimizer: Box::new(DefaultPathOptimizer),
			settings,
		}
	}

	pub fn with_optimizer(mut self, optimizer: Box<dyn PathOptimizer>) -> Self {
		self.optimizer = optimizer;
		self
	}

	/// Routes one request end to end.
	///
	/// Filter conflicts fail before anything is sampled. Unavailable sources
	/// and counterparties only shrink the liquidity; `NoOptimalPath` is
	/// returned when neither negotiation round covers the amount.
	#[instrument(skip_all, fields(side = %request.side, amount = %request.amount))]
	pub async fn route(&self, request: &SwapRequest) -> Result<SwapQuote, RouterError> {
		if request.amount.is_sign_negative() {
			return Err(RouterError::Configuration(
				"amount must not be negative".to_string(),
			));
		}
		let (included, excluded) =
			if request.included_sources.is_empty() && request.excluded_sources.is_empty() {
				(&self.settings.included_sources, &self.settings.excluded_sources)
			} else {
				(&request.included_sources, &request.excluded_sources)
			};
		let allowed = self
			.sampler
			.catalog()
			.resolve_allowed_sources(request.side, included, excluded)?;

		let sampling = SamplingRequest {
			side: request.side,
			maker_token: request.maker_token,
			taker_token: request.taker_token,
			weth_token: self.settings.weth_token,
			amount: request.amount,
			sources: allowed,
			num_samples: self.settings.num_samples,
			sample_distribution_base: self.settings.sample_distribution_base,
			native_orders: request.native_orders.clone(),
		};
		let liquidity = self.sampler.sample_market(&sampling).await;

		let negotiated = Negotiation::new(
			self.optimizer.as_ref(),
			&self.quotes,
			&self.settings.optimizer,
		)
		.run(liquidity, request.taker_address)
		.await?;

		let context = OrderContext {
			side: request.side,
			maker_token: request.maker_token,
			taker_token: request.taker_token,
		};
		let paths = &negotiated.paths;
		let orders = self.orders.materialize(&paths.path, &context)?;
		let fallback_orders = match &paths.fallback {
			Some(fallback) => self.orders.materialize(fallback, &context)?,
			None => Vec::new(),
		};

		let mut report = QuoteReport::new(&paths.path, paths.fallback.as_ref());
		report.optimizer_runs = negotiated.optimizer_runs;
		report.quote_enriched = negotiated.quote_enriched;
		report.quotes_received = negotiated.quotes_received;
		report.comparison_price = negotiated.comparison_price;

		info!(
			sources = ?report.sources,
			orders = orders.len(),
			fallback_orders = fallback_orders.len(),
			optimizer_runs = report.optimizer_runs,
			quote_enriched = report.quote_enriched,
			"Routed request"
		);

		Ok(SwapQuote {
			side: request.side,
			maker_token: request.maker_token,
			taker_token: request.taker_token,
			amount: request.amount,
			input: paths.path.input,
			output: paths.path.output,
			adjusted_output: paths.path.adjusted_output,
			orders,
			fallback_orders,
			report,
		})
	}
}
