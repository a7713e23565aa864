//! Bilateral quotes for the swap router.
//!
//! Counterparties are reached through [`QuoteProviderInterface`]. The
//! [`QuoteService`] fans a request out to every configured counterparty at
//! once and keeps whatever comes back in time.

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use router_order::asset_data::decode_erc20_asset_data;
use router_types::{
	Address, ConfigSchema, Quote, QuoteKind, QuoteRequest, RouterError, SignedOrder,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub mod implementations {
	pub mod http;
}

#[derive(Debug, Error)]
pub enum QuoteError {
	#[error("Request failed: {0}")]
	Request(String),
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

impl From<QuoteError> for RouterError {
	fn from(err: QuoteError) -> Self {
		match err {
			QuoteError::InvalidConfig(msg) => RouterError::Configuration(msg),
			other => RouterError::Quote(other.to_string()),
		}
	}
}

/// A counterparty that prices requests off-venue.
///
/// An empty result means the counterparty has no quote to offer.
#[async_trait]
pub trait QuoteProviderInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Name reported on every quote from this counterparty.
	fn name(&self) -> &str;

	async fn request_indicative_quotes(
		&self,
		request: &QuoteRequest,
	) -> Result<Vec<Quote>, QuoteError>;

	async fn request_firm_quotes(&self, request: &QuoteRequest) -> Result<Vec<Quote>, QuoteError>;
}

/// Fans quote requests out to every counterparty of one kind.
pub struct QuoteService {
	providers: Vec<Box<dyn QuoteProviderInterface>>,
	kind: QuoteKind,
	timeout: Duration,
}

impl QuoteService {
	pub fn new(
		providers: Vec<Box<dyn QuoteProviderInterface>>,
		kind: QuoteKind,
		timeout: Duration,
	) -> Self {
		Self {
			providers,
			kind,
			timeout,
		}
	}

	/// The kind of quote this service asks for.
	pub fn kind(&self) -> QuoteKind {
		self.kind
	}

	pub fn is_empty(&self) -> bool {
		self.providers.is_empty()
	}

	pub fn len(&self) -> usize {
		self.providers.len()
	}

	/// Asks every counterparty at once and gathers the usable quotes.
	///
	/// Failed or late counterparties contribute nothing. Quotes of the wrong
	/// kind, expired quotes, quotes for zero amounts and orders that do not
	/// trade the requested maker and taker tokens are dropped.
	pub async fn request_quotes(&self, request: &QuoteRequest) -> Vec<Quote> {
		let calls = self.providers.iter().map(|provider| async move {
			let call = match self.kind {
				QuoteKind::Indicative => provider.request_indicative_quotes(request),
				QuoteKind::Firm => provider.request_firm_quotes(request),
			};
			match tokio::time::timeout(self.timeout, call).await {
				Ok(Ok(quotes)) => quotes,
				Ok(Err(e)) => {
					warn!(counterparty = provider.name(), error = %e, "Quote request failed");
					Vec::new()
				}
				Err(_) => {
					warn!(
						counterparty = provider.name(),
						timeout_ms = self.timeout.as_millis() as u64,
						"Quote request timed out"
					);
					Vec::new()
				}
			}
		});

		let received: Vec<Quote> = join_all(calls).await.into_iter().flatten().collect();
		let now = Utc::now();
		let total = received.len();
		let quotes: Vec<Quote> = received
			.into_iter()
			.filter(|q| q.kind == self.kind)
			.filter(|q| !q.is_expired(now))
			.filter(|q| {
				!q.order.maker_asset_amount.is_zero() && !q.order.taker_asset_amount.is_zero()
			})
			.filter(|q| {
				let pair = quoted_pair(&q.order);
				if pair != Some((request.maker_token, request.taker_token)) {
					warn!(
						counterparty = %q.counterparty,
						maker_asset_data = %q.order.maker_asset_data,
						taker_asset_data = %q.order.taker_asset_data,
						"Quote for another pair dropped"
					);
					return false;
				}
				true
			})
			.collect();
		debug!(
			kind = %self.kind,
			received = total,
			kept = quotes.len(),
			"Collected quotes"
		);
		quotes
	}
}

/// Maker and taker tokens of an order, when both sides are plain tokens.
fn quoted_pair(order: &SignedOrder) -> Option<(Address, Address)> {
	Some((
		decode_erc20_asset_data(&order.maker_asset_data)?,
		decode_erc20_asset_data(&order.taker_asset_data)?,
	))
}
