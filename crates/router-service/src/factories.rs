//! Implementations the binary knows how to build from configuration.

use router_core::RouterBuilder;
use router_order::implementations::bridge;
use router_quotes::implementations::http;
use router_sampler::implementations::{pools, rates};

/// Registers every bundled implementation under its configuration name.
pub fn register(builder: RouterBuilder) -> RouterBuilder {
	builder
		.with_sampler_factory("rate_table", rates::create_sampler)
		.with_pool_discovery_factory(pools::create_pool_discovery)
		.with_quote_factory("http", http::create_quote_provider)
		.with_order_factory("bridge", bridge::create_materializer)
}
