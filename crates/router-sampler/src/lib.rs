//! Price sampling for the swap router.
//!
//! The sampler is the boundary between the router and the chain: it turns a
//! set of sources and candidate fill sizes into price curves. This crate
//! defines that boundary, the off-chain pool cache and the service that
//! drives one sampling round concurrently under a deadline.

use async_trait::async_trait;
use futures::future::join_all;
use router_sources::{SamplingMode, SourceCatalog};
use router_types::{
	validate_samples, Address, Amount, ConfigSchema, Decimal, MarketSideLiquidity, NativeOrder,
	RouterError, Sample, Side, SignedOrder, Source, SourceFlags, U256,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod amounts;
pub mod cache;

pub use amounts::sample_amounts;
pub use cache::PoolsCache;

pub mod implementations {
	pub mod pools;
	pub mod rates;
}

const DEFAULT_DECIMALS: u8 = 18;

#[derive(Debug, Error)]
pub enum SamplerError {
	#[error("Sampler call failed: {0}")]
	CallFailed(String),
	#[error("Unsupported source: {0}")]
	UnsupportedSource(Source),
	#[error("Pool discovery failed: {0}")]
	Discovery(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

impl From<SamplerError> for RouterError {
	fn from(err: SamplerError) -> Self {
		match err {
			SamplerError::InvalidConfig(msg) => RouterError::Configuration(msg),
			SamplerError::UnsupportedSource(source) => RouterError::SourceUnavailable {
				liquidity_source: source,
				reason: "unsupported by sampler".to_string(),
			},
			other => RouterError::Configuration(other.to_string()),
		}
	}
}

/// Query surface of a price sampler.
///
/// All methods are pure queries. Sell-side amounts are taker amounts sold and
/// buy-side amounts are maker amounts bought; each returned series has one
/// sample per requested amount.
#[async_trait]
pub trait SamplerInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// One series per source for selling each of `amounts`.
	async fn sample_sell(
		&self,
		sources: &[Source],
		maker_token: Address,
		taker_token: Address,
		amounts: &[Amount],
	) -> Result<Vec<Vec<Sample>>, SamplerError>;

	/// One series per source for buying each of `amounts`.
	async fn sample_buy(
		&self,
		sources: &[Source],
		maker_token: Address,
		taker_token: Address,
		amounts: &[Amount],
	) -> Result<Vec<Vec<Sample>>, SamplerError>;

	/// Full-amount samples routed through an intermediate token, one per
	/// usable intermediate.
	async fn sample_two_hop(
		&self,
		side: Side,
		sources: &[Source],
		maker_token: Address,
		taker_token: Address,
		amount: Amount,
	) -> Result<Vec<Sample>, SamplerError>;

	/// One series per pool of an off-chain discovered source.
	async fn sample_pools(
		&self,
		side: Side,
		source: Source,
		pools: &[Address],
		maker_token: Address,
		taker_token: Address,
		amounts: &[Amount],
	) -> Result<Vec<Vec<Sample>>, SamplerError>;

	/// Median rate across `sources` in `token_out` base units per `token_in`
	/// base unit.
	async fn get_median_rate(
		&self,
		sources: &[Source],
		token_in: Address,
		token_out: Address,
	) -> Result<Amount, SamplerError>;

	async fn get_token_decimals(
		&self,
		token_a: Address,
		token_b: Address,
	) -> Result<(u8, u8), SamplerError>;

	/// Remaining fillable taker amount of each order.
	async fn get_fillable_amounts(&self, orders: &[SignedOrder]) -> Result<Vec<U256>, SamplerError>;
}

/// Finds pools for sources whose liquidity lives in many independent pools.
#[async_trait]
pub trait PoolDiscoveryInterface: Send + Sync {
	async fn discover_pools(
		&self,
		source: Source,
		maker_token: Address,
		taker_token: Address,
	) -> Result<Vec<Address>, SamplerError>;
}

/// Inputs of one sampling round.
#[derive(Debug, Clone)]
pub struct SamplingRequest {
	pub side: Side,
	pub maker_token: Address,
	pub taker_token: Address,
	/// Wrapped ether, used to price gas in the traded tokens.
	pub weth_token: Address,
	pub amount: Amount,
	pub sources: SourceFlags,
	pub num_samples: usize,
	pub sample_distribution_base: Decimal,
	pub native_orders: Vec<SignedOrder>,
}

impl SamplingRequest {
	fn output_token(&self) -> Address {
		match self.side {
			Side::Sell => self.maker_token,
			Side::Buy => self.taker_token,
		}
	}
}

/// Drives a sampling round against a sampler and the pool cache.
pub struct SamplerService {
	sampler: Box<dyn SamplerInterface>,
	discovery: Option<Box<dyn PoolDiscoveryInterface>>,
	pools: Arc<PoolsCache>,
	catalog: SourceCatalog,
	timeout: Duration,
}

impl SamplerService {
	pub fn new(
		sampler: Box<dyn SamplerInterface>,
		discovery: Option<Box<dyn PoolDiscoveryInterface>>,
		pools: Arc<PoolsCache>,
		catalog: SourceCatalog,
		timeout: Duration,
	) -> Self {
		Self {
			sampler,
			discovery,
			pools,
			catalog,
			timeout,
		}
	}

	pub fn catalog(&self) -> &SourceCatalog {
		&self.catalog
	}

	pub fn pools(&self) -> &Arc<PoolsCache> {
		&self.pools
	}

	/// Samples every allowed source and assembles the liquidity snapshot.
	///
	/// All calls run concurrently and each is bounded by the service timeout.
	/// A call that fails or times out contributes nothing; a series that
	/// fails validation is dropped. Neither aborts the round.
	pub async fn sample_market(&self, request: &SamplingRequest) -> MarketSideLiquidity {
		let amounts = sample_amounts(
			request.amount,
			request.num_samples,
			request.sample_distribution_base,
		);
		let batched = self
			.catalog
			.with_sampling(request.sources, SamplingMode::Batched);
		let discovered = self
			.catalog
			.with_sampling(request.sources, SamplingMode::PoolDiscovery);

		let (batched_quotes, discovered_quotes, two_hop_quotes, eth_to_output_rate, decimals, native_orders) = futures::join!(
			self.sample_batched(request, &batched, &amounts),
			join_all(
				discovered
					.iter()
					.map(|source| self.sample_discovered(request, *source, &amounts))
			),
			self.sample_two_hop(request),
			self.eth_rate(&batched, request.weth_token, request.output_token()),
			self.bounded(
				"get_token_decimals",
				self.sampler
					.get_token_decimals(request.maker_token, request.taker_token)
			),
			self.native_orders(request),
		);

		let dex_quotes: Vec<Vec<Sample>> = batched_quotes
			.into_iter()
			.chain(discovered_quotes.into_iter().flatten())
			.filter(|series| keep_series(series))
			.collect();
		let (maker_token_decimals, taker_token_decimals) =
			decimals.unwrap_or((DEFAULT_DECIMALS, DEFAULT_DECIMALS));

		info!(
			side = %request.side,
			series = dex_quotes.len(),
			two_hop = two_hop_quotes.len(),
			native_orders = native_orders.len(),
			"Sampled market"
		);

		MarketSideLiquidity {
			side: request.side,
			input_amount: request.amount,
			maker_token: request.maker_token,
			taker_token: request.taker_token,
			maker_token_decimals,
			taker_token_decimals,
			eth_to_output_rate,
			dex_quotes,
			two_hop_quotes,
			native_orders,
			indicative_quotes: Vec::new(),
			firm_quotes: Vec::new(),
			allowed_sources: request.sources,
		}
	}

	async fn sample_batched(
		&self,
		request: &SamplingRequest,
		sources: &[Source],
		amounts: &[Amount],
	) -> Vec<Vec<Sample>> {
		if sources.is_empty() || amounts.is_empty() {
			return Vec::new();
		}
		let call = match request.side {
			Side::Sell => self.sampler.sample_sell(
				sources,
				request.maker_token,
				request.taker_token,
				amounts,
			),
			Side::Buy => self.sampler.sample_buy(
				sources,
				request.maker_token,
				request.taker_token,
				amounts,
			),
		};
		match self.bounded("batched sample", call).await {
			Some(series) => series,
			None => {
				for source in sources {
					warn!(source = %source, "Source unavailable, batched sampling failed");
				}
				Vec::new()
			}
		}
	}

	async fn sample_discovered(
		&self,
		request: &SamplingRequest,
		source: Source,
		amounts: &[Amount],
	) -> Vec<Vec<Sample>> {
		let Some(discovery) = self.discovery.as_deref() else {
			debug!(source = %source, "No pool discovery configured");
			return Vec::new();
		};
		if amounts.is_empty() {
			return Vec::new();
		}
		let call = async {
			let pools = self
				.pools
				.get_or_refresh(discovery, source, request.maker_token, request.taker_token)
				.await?;
			if pools.is_empty() {
				return Ok(Vec::new());
			}
			self.sampler
				.sample_pools(
					request.side,
					source,
					&pools,
					request.maker_token,
					request.taker_token,
					amounts,
				)
				.await
		};
		match tokio::time::timeout(self.timeout, call).await {
			Ok(Ok(series)) => series,
			Ok(Err(e)) => {
				warn!(source = %source, error = %e, "Source unavailable");
				Vec::new()
			}
			Err(_) => {
				warn!(source = %source, timeout_ms = self.timeout.as_millis() as u64, "Source timed out");
				Vec::new()
			}
		}
	}

	async fn sample_two_hop(&self, request: &SamplingRequest) -> Vec<Sample> {
		if !request.sources.contains(Source::MultiHop) || request.amount.is_zero() {
			return Vec::new();
		}
		let chainable = self.catalog.chainable(request.sources);
		let call = self.sampler.sample_two_hop(
			request.side,
			&chainable,
			request.maker_token,
			request.taker_token,
			request.amount,
		);
		let samples = self.bounded("sample_two_hop", call).await.unwrap_or_default();
		samples
			.into_iter()
			.filter(|sample| match validate_samples(std::slice::from_ref(sample)) {
				Ok(()) => true,
				Err(reason) => {
					warn!(source = %Source::MultiHop, reason = %reason, "Discarding invalid two-hop sample");
					false
				}
			})
			.collect()
	}

	/// Median rate from WETH to `token`, zero when unknown.
	async fn eth_rate(&self, sources: &[Source], weth: Address, token: Address) -> Amount {
		if token == weth {
			return Decimal::ONE;
		}
		let call = self.sampler.get_median_rate(sources, weth, token);
		self.bounded("get_median_rate", call)
			.await
			.unwrap_or(Decimal::ZERO)
	}

	async fn native_orders(&self, request: &SamplingRequest) -> Vec<NativeOrder> {
		if !request.sources.contains(Source::Native) || request.native_orders.is_empty() {
			return Vec::new();
		}
		let call = self.sampler.get_fillable_amounts(&request.native_orders);
		let Some(fillable) = self.bounded("get_fillable_amounts", call).await else {
			warn!(source = %Source::Native, "Source unavailable, native orders ignored");
			return Vec::new();
		};
		request
			.native_orders
			.iter()
			.zip(fillable)
			.filter(|(_, amount)| !amount.is_zero())
			.map(|(order, amount)| {
				NativeOrder::with_fillable_taker_amount(order.clone(), amount.min(order.taker_asset_amount))
			})
			.collect()
	}

	/// Runs a sampler call under the service timeout, logging failures.
	async fn bounded<T, F>(&self, call: &str, fut: F) -> Option<T>
	where
		F: Future<Output = Result<T, SamplerError>>,
	{
		match tokio::time::timeout(self.timeout, fut).await {
			Ok(Ok(value)) => Some(value),
			Ok(Err(e)) => {
				warn!(call, error = %e, "Sampler call failed");
				None
			}
			Err(_) => {
				warn!(call, timeout_ms = self.timeout.as_millis() as u64, "Sampler call timed out");
				None
			}
		}
	}
}

fn keep_series(series: &[Sample]) -> bool {
	let Some(first) = series.first() else {
		return false;
	};
	match validate_samples(series) {
		Ok(()) => true,
		Err(reason) => {
			warn!(source = %first.source, reason = %reason, "Discarding invalid samples");
			false
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use router_types::{Bytes, Field, FieldType, Schema, ValidationError};
	use std::sync::Mutex;

	struct NoSchema;

	impl ConfigSchema for NoSchema {
		fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
			Schema::new(vec![], vec![Field::new("unused", FieldType::Boolean)]).validate(config)
		}
	}

	/// Returns a linear curve per source; Kyber is broken, Curve is slow.
	struct FakeSampler {
		rate_lookups: Arc<Mutex<Vec<Address>>>,
	}

	fn curve(source: Source, amounts: &[Amount], rate: Decimal) -> Vec<Sample> {
		amounts
			.iter()
			.map(|a| Sample::new(source, *a, *a * rate))
			.collect()
	}

	#[async_trait]
	impl SamplerInterface for FakeSampler {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(NoSchema)
		}

		async fn sample_sell(
			&self,
			sources: &[Source],
			_maker_token: Address,
			_taker_token: Address,
			amounts: &[Amount],
		) -> Result<Vec<Vec<Sample>>, SamplerError> {
			Ok(sources
				.iter()
				.map(|s| match s {
					// Decreasing output.
					Source::Kyber => amounts
						.iter()
						.rev()
						.map(|a| Sample::new(*s, *a, *a))
						.collect(),
					_ => curve(*s, amounts, Decimal::ONE),
				})
				.collect())
		}

		async fn sample_buy(
			&self,
			sources: &[Source],
			_maker_token: Address,
			_taker_token: Address,
			amounts: &[Amount],
		) -> Result<Vec<Vec<Sample>>, SamplerError> {
			Ok(sources
				.iter()
				.map(|s| curve(*s, amounts, Decimal::from(2)))
				.collect())
		}

		async fn sample_two_hop(
			&self,
			_side: Side,
			_sources: &[Source],
			_maker_token: Address,
			_taker_token: Address,
			amount: Amount,
		) -> Result<Vec<Sample>, SamplerError> {
			Ok(vec![Sample::new(Source::MultiHop, amount, amount)])
		}

		async fn sample_pools(
			&self,
			_side: Side,
			source: Source,
			pools: &[Address],
			_maker_token: Address,
			_taker_token: Address,
			amounts: &[Amount],
		) -> Result<Vec<Vec<Sample>>, SamplerError> {
			if source == Source::Cream {
				tokio::time::sleep(Duration::from_secs(60)).await;
			}
			Ok(pools
				.iter()
				.map(|_| curve(source, amounts, Decimal::ONE))
				.collect())
		}

		async fn get_median_rate(
			&self,
			_sources: &[Source],
			_token_in: Address,
			token_out: Address,
		) -> Result<Amount, SamplerError> {
			self.rate_lookups.lock().unwrap().push(token_out);
			Err(SamplerError::CallFailed("no route".to_string()))
		}

		async fn get_token_decimals(
			&self,
			_token_a: Address,
			_token_b: Address,
		) -> Result<(u8, u8), SamplerError> {
			Ok((6, 18))
		}

		async fn get_fillable_amounts(
			&self,
			orders: &[SignedOrder],
		) -> Result<Vec<U256>, SamplerError> {
			Ok(orders
				.iter()
				.enumerate()
				.map(|(i, o)| if i == 0 { o.taker_asset_amount } else { U256::ZERO })
				.collect())
		}
	}

	struct TwoPools;

	#[async_trait]
	impl PoolDiscoveryInterface for TwoPools {
		async fn discover_pools(
			&self,
			_source: Source,
			_maker_token: Address,
			_taker_token: Address,
		) -> Result<Vec<Address>, SamplerError> {
			Ok(vec![Address::repeat_byte(1), Address::repeat_byte(2)])
		}
	}

	fn signed_order(taker_amount: u64) -> SignedOrder {
		SignedOrder {
			chain_id: 1,
			exchange_address: Address::ZERO,
			maker_address: Address::ZERO,
			taker_address: Address::ZERO,
			fee_recipient_address: Address::ZERO,
			sender_address: Address::ZERO,
			maker_asset_amount: U256::from(taker_amount * 2),
			taker_asset_amount: U256::from(taker_amount),
			maker_fee: U256::ZERO,
			taker_fee: U256::ZERO,
			expiration_time_seconds: U256::ZERO,
			salt: U256::ZERO,
			maker_asset_data: Bytes::new(),
			taker_asset_data: Bytes::new(),
			maker_fee_asset_data: Bytes::new(),
			taker_fee_asset_data: Bytes::new(),
			signature: Bytes::new(),
		}
	}

	fn service() -> SamplerService {
		recording_service().0
	}

	fn recording_service() -> (SamplerService, Arc<Mutex<Vec<Address>>>) {
		let rate_lookups = Arc::new(Mutex::new(Vec::new()));
		let service = SamplerService::new(
			Box::new(FakeSampler {
				rate_lookups: rate_lookups.clone(),
			}),
			Some(Box::new(TwoPools)),
			Arc::new(PoolsCache::new(Duration::from_secs(60))),
			SourceCatalog::standard(),
			Duration::from_millis(200),
		);
		(service, rate_lookups)
	}

	fn request(side: Side, sources: &[Source]) -> SamplingRequest {
		SamplingRequest {
			side,
			maker_token: Address::repeat_byte(0xaa),
			taker_token: Address::repeat_byte(0xbb),
			weth_token: Address::repeat_byte(0xee),
			amount: Decimal::from(100),
			sources: sources.iter().copied().collect(),
			num_samples: 4,
			sample_distribution_base: Decimal::ONE,
			native_orders: vec![signed_order(50), signed_order(70)],
		}
	}

	#[tokio::test]
	async fn test_invalid_and_slow_sources_contribute_nothing() {
		let service = service();
		let market = service
			.sample_market(&request(
				Side::Sell,
				&[
					Source::Native,
					Source::Uniswap,
					Source::Kyber,
					Source::Balancer,
					Source::Cream,
				],
			))
			.await;

		let sources: Vec<Source> = market.dex_quotes.iter().map(|s| s[0].source).collect();
		// Uniswap plus one series per Balancer pool; Kyber invalid, Cream timed out.
		assert_eq!(sources, vec![Source::Uniswap, Source::Balancer, Source::Balancer]);
		assert!(market.dex_quotes.iter().all(|s| s.len() == 4));
		assert_eq!(market.dex_quotes[0][3].input, Decimal::from(100));
	}

	#[tokio::test]
	async fn test_market_metadata() {
		let service = service();
		let market = service
			.sample_market(&request(Side::Sell, &[Source::Native, Source::Uniswap]))
			.await;

		assert_eq!(market.maker_token_decimals, 6);
		assert_eq!(market.taker_token_decimals, 18);
		// Failed median rate degrades to zero.
		assert_eq!(market.eth_to_output_rate, Decimal::ZERO);
		// Second order has nothing left to fill.
		assert_eq!(market.native_orders.len(), 1);
		assert_eq!(market.native_orders[0].fillable_taker_amount, U256::from(50));
		assert!(market.two_hop_quotes.is_empty());
	}

	#[tokio::test]
	async fn test_weth_rate_is_identity() {
		let service = service();
		let mut req = request(Side::Sell, &[Source::Uniswap]);
		req.maker_token = req.weth_token;
		let market = service.sample_market(&req).await;
		assert_eq!(market.eth_to_output_rate, Decimal::ONE);
	}

	#[tokio::test]
	async fn test_only_output_token_rate_is_fetched() {
		let (service, rate_lookups) = recording_service();
		service
			.sample_market(&request(Side::Sell, &[Source::Uniswap]))
			.await;
		service
			.sample_market(&request(Side::Buy, &[Source::Uniswap]))
			.await;
		assert_eq!(
			*rate_lookups.lock().unwrap(),
			vec![Address::repeat_byte(0xaa), Address::repeat_byte(0xbb)]
		);
	}

	#[tokio::test]
	async fn test_buy_side_and_two_hop() {
		let service = service();
		let market = service
			.sample_market(&request(
				Side::Buy,
				&[Source::Uniswap, Source::SushiSwap, Source::MultiHop],
			))
			.await;
		assert_eq!(market.dex_quotes.len(), 2);
		assert_eq!(market.dex_quotes[0][3].output, Decimal::from(200));
		assert_eq!(market.two_hop_quotes.len(), 1);
		assert!(market.native_orders.is_empty());
	}

	#[tokio::test]
	async fn test_discovered_pools_are_cached() {
		let service = service();
		let req = request(Side::Sell, &[Source::Balancer]);
		service.sample_market(&req).await;
		service.sample_market(&req).await;
		assert_eq!(service.pools().len(), 1);
	}
}
