//! HTTP request-for-quote counterparty.
//!
//! Indicative prices come from `GET {url}/price` and signed orders from
//! `GET {url}/quote`. Both take the pair, the amount on the requested side,
//! the taker address and, when known, the comparison price.

use crate::{QuoteError, QuoteProviderInterface};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use router_types::{
	Address, Amount, Bytes, ConfigSchema, Field, FieldType, Quote, QuoteKind, QuoteRequest,
	Schema, Side, SignedOrder, ValidationError, U256,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const API_KEY_HEADER: &str = "0x-api-key";

/// Body of a `/price` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicativeQuoteResponse {
	pub maker_asset_data: Bytes,
	pub maker_asset_amount: U256,
	pub taker_asset_data: Bytes,
	pub taker_asset_amount: U256,
	pub expiration_time_seconds: U256,
}

/// Body of a `/quote` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmQuoteResponse {
	pub signed_order: SignedOrder,
}

/// A market maker reached over HTTP.
pub struct HttpQuoteProvider {
	name: String,
	url: String,
	api_key: Option<String>,
	chain_id: u64,
	client: reqwest::Client,
}

impl HttpQuoteProvider {
	pub fn new(
		name: String,
		url: String,
		api_key: Option<String>,
		chain_id: u64,
		timeout: Duration,
	) -> Result<Self, QuoteError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| QuoteError::InvalidConfig(e.to_string()))?;
		Ok(Self {
			name,
			url: url.trim_end_matches('/').to_string(),
			api_key,
			chain_id,
			client,
		})
	}

	async fn get<T>(&self, path: &str, request: &QuoteRequest) -> Result<Option<T>, QuoteError>
	where
		T: for<'de> Deserialize<'de>,
	{
		let mut call = self
			.client
			.get(format!("{}/{}", self.url, path))
			.query(&query_params(request));
		if let Some(key) = &self.api_key {
			call = call.header(API_KEY_HEADER, key);
		}

		let response = call
			.send()
			.await
			.map_err(|e| QuoteError::Request(e.to_string()))?;
		// No content means no quote.
		if response.status() == reqwest::StatusCode::NO_CONTENT {
			return Ok(None);
		}
		if !response.status().is_success() {
			return Err(QuoteError::Request(format!(
				"{} returned {}",
				path,
				response.status()
			)));
		}
		let body = response
			.text()
			.await
			.map_err(|e| QuoteError::Request(e.to_string()))?;
		serde_json::from_str(&body)
			.map(Some)
			.map_err(|e| QuoteError::InvalidResponse(e.to_string()))
	}
}

#[async_trait]
impl QuoteProviderInterface for HttpQuoteProvider {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpQuoteSchema)
	}

	fn name(&self) -> &str {
		&self.name
	}

	async fn request_indicative_quotes(
		&self,
		request: &QuoteRequest,
	) -> Result<Vec<Quote>, QuoteError> {
		let response: Option<IndicativeQuoteResponse> = self.get("price", request).await?;
		debug!(counterparty = %self.name, quoted = response.is_some(), "Indicative quote");
		Ok(response
			.map(|r| indicative_quote(&self.name, self.chain_id, r))
			.into_iter()
			.collect())
	}

	async fn request_firm_quotes(&self, request: &QuoteRequest) -> Result<Vec<Quote>, QuoteError> {
		let response: Option<FirmQuoteResponse> = self.get("quote", request).await?;
		debug!(counterparty = %self.name, quoted = response.is_some(), "Firm quote");
		match response {
			Some(r) if r.signed_order.signature.is_empty() => Err(QuoteError::InvalidResponse(
				"firm quote is not signed".to_string(),
			)),
			Some(r) => Ok(vec![firm_quote(&self.name, r.signed_order)]),
			None => Ok(vec![]),
		}
	}
}

/// Query string of a quote request.
///
/// The maker token is what the taker buys, so it goes out as `buyToken`.
pub fn query_params(request: &QuoteRequest) -> Vec<(&'static str, String)> {
	let amount_key = match request.side {
		Side::Sell => "sellAmountBaseUnits",
		Side::Buy => "buyAmountBaseUnits",
	};
	let mut params = vec![
		("sellToken", request.taker_token.to_string()),
		("buyToken", request.maker_token.to_string()),
		(amount_key, base_units(request.amount)),
		("takerAddress", request.taker_address.to_string()),
	];
	if let Some(price) = request.comparison_price {
		params.push(("comparisonPrice", price.normalize().to_string()));
	}
	params
}

fn base_units(amount: Amount) -> String {
	amount.trunc().normalize().to_string()
}

fn expiry(seconds: U256) -> Option<DateTime<Utc>> {
	let seconds = i64::try_from(seconds).ok()?;
	DateTime::from_timestamp(seconds, 0)
}

/// An unsigned order standing for an indicative price.
pub fn indicative_quote(counterparty: &str, chain_id: u64, response: IndicativeQuoteResponse) -> Quote {
	let order = SignedOrder {
		chain_id,
		exchange_address: Address::ZERO,
		maker_address: Address::ZERO,
		taker_address: Address::ZERO,
		fee_recipient_address: Address::ZERO,
		sender_address: Address::ZERO,
		maker_asset_amount: response.maker_asset_amount,
		taker_asset_amount: response.taker_asset_amount,
		maker_fee: U256::ZERO,
		taker_fee: U256::ZERO,
		expiration_time_seconds: response.expiration_time_seconds,
		salt: U256::ZERO,
		maker_asset_data: response.maker_asset_data,
		taker_asset_data: response.taker_asset_data,
		maker_fee_asset_data: Bytes::new(),
		taker_fee_asset_data: Bytes::new(),
		signature: Bytes::new(),
	};
	Quote {
		counterparty: counterparty.to_string(),
		kind: QuoteKind::Indicative,
		expiry: expiry(response.expiration_time_seconds),
		order,
	}
}

pub fn firm_quote(counterparty: &str, order: SignedOrder) -> Quote {
	Quote {
		counterparty: counterparty.to_string(),
		kind: QuoteKind::Firm,
		expiry: expiry(order.expiration_time_seconds),
		order,
	}
}

/// Configuration schema for HTTP counterparties.
pub struct HttpQuoteSchema;

impl ConfigSchema for HttpQuoteSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("url", FieldType::String).with_validator(|value| {
				let url = value.as_str().unwrap_or_default();
				if url.starts_with("http://") || url.starts_with("https://") {
					Ok(())
				} else {
					Err("url must start with http:// or https://".to_string())
				}
			})],
			vec![
				Field::new("api_key", FieldType::String),
				Field::new(
					"chain_id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
				Field::new(
					"timeout_ms",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create an HTTP counterparty from configuration.
///
/// Configuration parameters:
/// - `url`: base URL of the counterparty
/// - `api_key`: sent in the `0x-api-key` header (optional)
/// - `chain_id`: chain the indicative orders are for (default: 1)
/// - `timeout_ms`: HTTP timeout (default: 1000)
pub fn create_quote_provider(
	name: &str,
	config: &toml::Value,
) -> Result<Box<dyn QuoteProviderInterface>, QuoteError> {
	HttpQuoteSchema
		.validate(config)
		.map_err(|e| QuoteError::InvalidConfig(format!("{}: {}", name, e)))?;

	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.unwrap_or_default()
		.to_string();
	let api_key = config
		.get("api_key")
		.and_then(|v| v.as_str())
		.map(String::from);
	let chain_id = config
		.get("chain_id")
		.and_then(|v| v.as_integer())
		.unwrap_or(1) as u64;
	let timeout_ms = config
		.get("timeout_ms")
		.and_then(|v| v.as_integer())
		.unwrap_or(1000) as u64;

	Ok(Box::new(HttpQuoteProvider::new(
		name.to_string(),
		url,
		api_key,
		chain_id,
		Duration::from_millis(timeout_ms),
	)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use router_types::Decimal;

	fn request(side: Side) -> QuoteRequest {
		QuoteRequest {
			maker_token: Address::repeat_byte(0x11),
			taker_token: Address::repeat_byte(0x22),
			amount: Decimal::from(1_000_000_000_000_000_000u64),
			side,
			taker_address: Address::repeat_byte(0x33),
			comparison_price: Some(Decimal::new(3200, 1)),
		}
	}

	#[test]
	fn test_query_uses_side_specific_amount() {
		let params = query_params(&request(Side::Sell));
		assert!(params.contains(&("sellAmountBaseUnits", "1000000000000000000".to_string())));
		assert!(params.contains(&("comparisonPrice", "320".to_string())));
		assert!(params.contains(&("buyToken", Address::repeat_byte(0x11).to_string())));

		let params = query_params(&request(Side::Buy));
		assert!(params.iter().any(|(k, _)| *k == "buyAmountBaseUnits"));
		assert!(!params.iter().any(|(k, _)| *k == "sellAmountBaseUnits"));
	}

	#[test]
	fn test_indicative_response_becomes_unsigned_quote() {
		let body = r#"{
			"makerAssetData": "0xf47261b00000000000000000000000001111111111111111111111111111111111111111",
			"makerAssetAmount": "0x12c",
			"takerAssetData": "0xf47261b00000000000000000000000002222222222222222222222222222222222222222",
			"takerAssetAmount": "0x64",
			"expirationTimeSeconds": "0x77359400"
		}"#;
		let response: IndicativeQuoteResponse = serde_json::from_str(body).unwrap();
		let quote = indicative_quote("mm", 1, response);
		assert_eq!(quote.kind, QuoteKind::Indicative);
		assert_eq!(quote.order.maker_asset_amount, U256::from(300));
		assert!(quote.order.signature.is_empty());
		assert_eq!(quote.expiry.map(|e| e.timestamp()), Some(2_000_000_000));
	}

	#[test]
	fn test_factory_validates_config() {
		let config: toml::Value = toml::from_str(
			r#"
			url = "https://mm.example.org/"
			api_key = "secret"
			timeout_ms = 250
			"#,
		)
		.unwrap();
		let provider = create_quote_provider("mm", &config).unwrap();
		assert_eq!(provider.name(), "mm");

		let bad: toml::Value = toml::from_str(r#"url = "mm.example.org""#).unwrap();
		assert!(create_quote_provider("mm", &bad).is_err());

		let missing: toml::Value = toml::from_str(r#"api_key = "secret""#).unwrap();
		assert!(create_quote_provider("mm", &missing).is_err());
	}
}
