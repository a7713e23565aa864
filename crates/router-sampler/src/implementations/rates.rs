//! Offline sampler backed by configured rate tables.
//!
//! Each source is described by a list of marginal rates, one per sampled
//! step: the step between the `i-1`th and `i`th sample amount trades at
//! `rates[i]` (the last rate repeats). Nothing is fetched from a chain, which
//! makes this backend suitable for dry runs and tests.

use crate::{SamplerError, SamplerInterface};
use async_trait::async_trait;
use router_types::{
	Address, Amount, ConfigSchema, Decimal, Field, FieldType, FillData, MultiHopFillData, Sample,
	Schema, Side, SignedOrder, Source, ValidationError, U256,
};
use std::collections::HashMap;
use std::str::FromStr;

/// Samples sources from static marginal-rate tables.
#[derive(Debug, Clone, Default)]
pub struct RateTableSampler {
	curves: HashMap<Source, Vec<Decimal>>,
	median_rates: HashMap<Address, Decimal>,
	default_median_rate: Decimal,
	decimals: HashMap<Address, u8>,
	default_decimals: u8,
	two_hop: Option<TwoHopRoute>,
}

#[derive(Debug, Clone)]
struct TwoHopRoute {
	intermediate_token: Address,
	rate: Decimal,
}

impl RateTableSampler {
	pub fn new() -> Self {
		Self {
			default_median_rate: Decimal::ONE,
			default_decimals: 18,
			..Default::default()
		}
	}

	pub fn with_curve(mut self, source: Source, rates: Vec<Decimal>) -> Self {
		self.curves.insert(source, rates);
		self
	}

	/// Rate returned by median-rate queries into `token_out`.
	pub fn with_median_rate(mut self, token_out: Address, rate: Decimal) -> Self {
		self.median_rates.insert(token_out, rate);
		self
	}

	pub fn with_decimals(mut self, token: Address, decimals: u8) -> Self {
		self.decimals.insert(token, decimals);
		self
	}

	pub fn with_two_hop(mut self, intermediate_token: Address, rate: Decimal) -> Self {
		self.two_hop = Some(TwoHopRoute {
			intermediate_token,
			rate,
		});
		self
	}

	fn series(&self, side: Side, source: Source, amounts: &[Amount]) -> Result<Vec<Sample>, SamplerError> {
		let rates = self
			.curves
			.get(&source)
			.ok_or(SamplerError::UnsupportedSource(source))?;
		let mut samples = Vec::with_capacity(amounts.len());
		let mut previous = Decimal::ZERO;
		let mut output = Decimal::ZERO;
		for (i, amount) in amounts.iter().enumerate() {
			let Some(rate) = rates.get(i).or_else(|| rates.last()).copied() else {
				break;
			};
			let step = *amount - previous;
			match side {
				Side::Sell => output += step * rate,
				// A zero rate cannot buy anything; the curve ends here.
				Side::Buy if rate.is_zero() => break,
				Side::Buy => output += step / rate,
			}
			previous = *amount;
			samples.push(Sample::new(source, *amount, output.round_dp(0)));
		}
		Ok(samples)
	}

	/// Batched sampling; sources without a table come back empty.
	fn sample_sources(
		&self,
		side: Side,
		sources: &[Source],
		amounts: &[Amount],
	) -> Result<Vec<Vec<Sample>>, SamplerError> {
		sources
			.iter()
			.filter(|source| self.curves.contains_key(source))
			.map(|source| self.series(side, *source, amounts))
			.collect()
	}
}

/// Configuration schema for the rate-table sampler.
pub struct RateTableSchema;

fn check_rate_table(value: &toml::Value) -> Result<(), String> {
	let table = value.as_table().ok_or("must be a table")?;
	for (name, rates) in table {
		Source::from_str(name)?;
		let rates = rates
			.as_array()
			.ok_or_else(|| format!("rates of {} must be an array", name))?;
		if rates.is_empty() {
			return Err(format!("rates of {} must not be empty", name));
		}
		for rate in rates {
			match parse_decimal(rate) {
				Some(r) if !r.is_sign_negative() => {}
				_ => return Err(format!("rates of {} must be non-negative numbers", name)),
			}
		}
	}
	Ok(())
}

fn check_token_table(value: &toml::Value) -> Result<(), String> {
	let table = value.as_table().ok_or("must be a table")?;
	for key in table.keys() {
		Address::from_str(key).map_err(|e| format!("invalid token address '{}': {}", key, e))?;
	}
	Ok(())
}

impl ConfigSchema for RateTableSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new(
				"curves",
				FieldType::Table(Schema::new(vec![], vec![])),
			)
			.with_validator(check_rate_table)],
			vec![
				Field::new(
					"default_median_rate",
					FieldType::Float {
						min: Some(0.0),
						max: None,
					},
				),
				Field::new("median_rates", FieldType::Table(Schema::new(vec![], vec![])))
					.with_validator(check_token_table),
				Field::new(
					"default_decimals",
					FieldType::Integer {
						min: Some(0),
						max: Some(77),
					},
				),
				Field::new("decimals", FieldType::Table(Schema::new(vec![], vec![])))
					.with_validator(check_token_table),
				Field::new(
					"two_hop",
					FieldType::Table(Schema::new(
						vec![
							Field::new("intermediate_token", FieldType::Address),
							Field::new(
								"rate",
								FieldType::Float {
									min: Some(0.0),
									max: None,
								},
							),
						],
						vec![],
					)),
				),
			],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl SamplerInterface for RateTableSampler {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(RateTableSchema)
	}

	async fn sample_sell(
		&self,
		sources: &[Source],
		_maker_token: Address,
		_taker_token: Address,
		amounts: &[Amount],
	) -> Result<Vec<Vec<Sample>>, SamplerError> {
		self.sample_sources(Side::Sell, sources, amounts)
	}

	async fn sample_buy(
		&self,
		sources: &[Source],
		_maker_token: Address,
		_taker_token: Address,
		amounts: &[Amount],
	) -> Result<Vec<Vec<Sample>>, SamplerError> {
		self.sample_sources(Side::Buy, sources, amounts)
	}

	async fn sample_two_hop(
		&self,
		side: Side,
		sources: &[Source],
		_maker_token: Address,
		_taker_token: Address,
		amount: Amount,
	) -> Result<Vec<Sample>, SamplerError> {
		let Some(route) = &self.two_hop else {
			return Ok(Vec::new());
		};
		let [first, second, ..] = sources else {
			return Ok(Vec::new());
		};
		let output = match side {
			Side::Sell => amount * route.rate,
			Side::Buy if route.rate.is_zero() => return Ok(Vec::new()),
			Side::Buy => amount / route.rate,
		};
		let fill_data = FillData::MultiHop(Box::new(MultiHopFillData {
			first_hop_source: *first,
			second_hop_source: *second,
			intermediate_token: route.intermediate_token,
			first_hop_data: FillData::Empty,
			second_hop_data: FillData::Empty,
		}));
		Ok(vec![
			Sample::new(Source::MultiHop, amount, output.round_dp(0)).with_fill_data(fill_data)
		])
	}

	async fn sample_pools(
		&self,
		side: Side,
		source: Source,
		pools: &[Address],
		_maker_token: Address,
		_taker_token: Address,
		amounts: &[Amount],
	) -> Result<Vec<Vec<Sample>>, SamplerError> {
		let series = self.series(side, source, amounts)?;
		Ok(pools
			.iter()
			.map(|pool| {
				series
					.iter()
					.cloned()
					.map(|sample| {
						sample.with_fill_data(FillData::Bridge {
							pool: Some(*pool),
							data: Default::default(),
						})
					})
					.collect()
			})
			.collect())
	}

	async fn get_median_rate(
		&self,
		_sources: &[Source],
		_token_in: Address,
		token_out: Address,
	) -> Result<Amount, SamplerError> {
		Ok(self
			.median_rates
			.get(&token_out)
			.copied()
			.unwrap_or(self.default_median_rate))
	}

	async fn get_token_decimals(
		&self,
		token_a: Address,
		token_b: Address,
	) -> Result<(u8, u8), SamplerError> {
		let lookup = |token| self.decimals.get(&token).copied().unwrap_or(self.default_decimals);
		Ok((lookup(token_a), lookup(token_b)))
	}

	async fn get_fillable_amounts(&self, orders: &[SignedOrder]) -> Result<Vec<U256>, SamplerError> {
		Ok(orders.iter().map(|o| o.taker_asset_amount).collect())
	}
}

fn parse_decimal(value: &toml::Value) -> Option<Decimal> {
	match value {
		toml::Value::String(s) => Decimal::from_str(s).ok(),
		toml::Value::Integer(i) => Some(Decimal::from(*i)),
		toml::Value::Float(f) => Decimal::try_from(*f).ok(),
		_ => None,
	}
}

fn parse_token_table<T>(
	config: &toml::Value,
	key: &str,
	parse: impl Fn(&toml::Value) -> Option<T>,
) -> Result<HashMap<Address, T>, SamplerError> {
	let Some(table) = config.get(key).and_then(|v| v.as_table()) else {
		return Ok(HashMap::new());
	};
	table
		.iter()
		.map(|(token, value)| {
			let token = Address::from_str(token)
				.map_err(|e| SamplerError::InvalidConfig(format!("{}.{}: {}", key, token, e)))?;
			let value = parse(value)
				.ok_or_else(|| SamplerError::InvalidConfig(format!("{}.{}: bad value", key, token)))?;
			Ok((token, value))
		})
		.collect()
}

/// Factory function to create a rate-table sampler from configuration.
///
/// Configuration parameters:
/// - `curves`: source name to array of marginal rates
/// - `default_median_rate`, `median_rates`: rates returned for gas pricing
/// - `default_decimals`, `decimals`: token decimals
/// - `two_hop`: optional `{ intermediate_token, rate }`
pub fn create_sampler(config: &toml::Value) -> Result<Box<dyn SamplerInterface>, SamplerError> {
	RateTableSchema
		.validate(config)
		.map_err(|e| SamplerError::InvalidConfig(e.to_string()))?;

	let mut sampler = RateTableSampler::new();

	if let Some(curves) = config.get("curves").and_then(|v| v.as_table()) {
		for (name, rates) in curves {
			let source = Source::from_str(name).map_err(SamplerError::InvalidConfig)?;
			let rates = rates
				.as_array()
				.map(|rates| rates.iter().filter_map(parse_decimal).collect())
				.unwrap_or_default();
			sampler = sampler.with_curve(source, rates);
		}
	}

	if let Some(rate) = config.get("default_median_rate").and_then(parse_decimal) {
		sampler.default_median_rate = rate;
	}
	sampler.median_rates = parse_token_table(config, "median_rates", parse_decimal)?;

	if let Some(decimals) = config.get("default_decimals").and_then(|v| v.as_integer()) {
		sampler.default_decimals = decimals as u8;
	}
	sampler.decimals = parse_token_table(config, "decimals", |v| {
		v.as_integer().and_then(|d| u8::try_from(d).ok())
	})?;

	if let Some(two_hop) = config.get("two_hop") {
		let intermediate_token = two_hop
			.get("intermediate_token")
			.and_then(|v| v.as_str())
			.and_then(|s| Address::from_str(s).ok())
			.ok_or_else(|| SamplerError::InvalidConfig("two_hop.intermediate_token".into()))?;
		let rate = two_hop
			.get("rate")
			.and_then(parse_decimal)
			.ok_or_else(|| SamplerError::InvalidConfig("two_hop.rate".into()))?;
		sampler = sampler.with_two_hop(intermediate_token, rate);
	}

	Ok(Box::new(sampler))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn amounts() -> Vec<Amount> {
		vec![Decimal::from(10), Decimal::from(20), Decimal::from(30)]
	}

	#[tokio::test]
	async fn test_sell_curve_follows_marginal_rates() {
		let sampler = RateTableSampler::new().with_curve(
			Source::Uniswap,
			vec![Decimal::ONE, Decimal::new(5, 1)],
		);
		let series = sampler
			.sample_sell(&[Source::Uniswap], Address::ZERO, Address::ZERO, &amounts())
			.await
			.unwrap();
		let outputs: Vec<Amount> = series[0].iter().map(|s| s.output).collect();
		assert_eq!(
			outputs,
			vec![Decimal::from(10), Decimal::from(15), Decimal::from(20)]
		);
	}

	#[tokio::test]
	async fn test_buy_curve_divides_by_rate() {
		let sampler = RateTableSampler::new().with_curve(
			Source::Eth2Dai,
			vec![Decimal::new(5, 1), Decimal::ZERO],
		);
		let series = sampler
			.sample_buy(&[Source::Eth2Dai], Address::ZERO, Address::ZERO, &amounts())
			.await
			.unwrap();
		// Stops at the first zero rate.
		assert_eq!(series[0].len(), 1);
		assert_eq!(series[0][0].output, Decimal::from(20));
	}

	#[tokio::test]
	async fn test_unknown_source_is_skipped_in_batches() {
		let sampler = RateTableSampler::new().with_curve(Source::Uniswap, vec![Decimal::ONE]);
		let series = sampler
			.sample_sell(
				&[Source::Kyber, Source::Uniswap],
				Address::ZERO,
				Address::ZERO,
				&amounts(),
			)
			.await
			.unwrap();
		assert_eq!(series.len(), 1);
		assert_eq!(series[0][0].source, Source::Uniswap);

		let pools = sampler
			.sample_pools(
				Side::Sell,
				Source::Kyber,
				&[Address::ZERO],
				Address::ZERO,
				Address::ZERO,
				&amounts(),
			)
			.await;
		assert!(matches!(pools, Err(SamplerError::UnsupportedSource(Source::Kyber))));
	}

	#[tokio::test]
	async fn test_factory_reads_tables() {
		let config: toml::Value = toml::from_str(
			r#"
			default_median_rate = 2
			default_decimals = 18

			[curves]
			Uniswap = [0.96, 0.1]
			"Uniswap_V2" = ["1", "0.5"]

			[decimals]
			"0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa" = 6

			[two_hop]
			intermediate_token = "0x00000000000000000000000000000000000000ee"
			rate = 0.9
			"#,
		)
		.unwrap();
		let sampler = create_sampler(&config).unwrap();
		let maker = Address::repeat_byte(0xaa);
		let taker = Address::repeat_byte(0xbb);

		assert_eq!(
			sampler.get_token_decimals(maker, taker).await.unwrap(),
			(6, 18)
		);
		assert_eq!(
			sampler.get_median_rate(&[], taker, maker).await.unwrap(),
			Decimal::from(2)
		);
		let series = sampler
			.sample_sell(&[Source::UniswapV2], maker, taker, &amounts())
			.await
			.unwrap();
		assert_eq!(series[0][2].output, Decimal::from(20));

		let two_hop = sampler
			.sample_two_hop(
				Side::Sell,
				&[Source::Uniswap, Source::UniswapV2],
				maker,
				taker,
				Decimal::from(100),
			)
			.await
			.unwrap();
		assert_eq!(two_hop[0].output, Decimal::from(90));
		assert!(matches!(two_hop[0].fill_data, FillData::MultiHop(_)));
	}

	#[test]
	fn test_schema_rejects_bad_tables() {
		let unknown_source: toml::Value = toml::from_str(
			r#"
			[curves]
			Nowhere = [1.0]
			"#,
		)
		.unwrap();
		assert!(create_sampler(&unknown_source).is_err());

		let negative: toml::Value = toml::from_str(
			r#"
			[curves]
			Uniswap = [-1.0]
			"#,
		)
		.unwrap();
		assert!(create_sampler(&negative).is_err());
	}
}
