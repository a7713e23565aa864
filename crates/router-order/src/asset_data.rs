//! Asset data in the exchange's proxy encoding.
//!
//! Asset data is the ABI encoding of a proxy "call", so the proxy ids below
//! are the selectors of these declarations.

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{sol, SolCall, SolValue};

sol! {
	/// Plain token held by the maker.
	function ERC20Token(address tokenAddress);

	/// Token delivered by a bridge contract during the fill.
	function ERC20Bridge(address tokenAddress, address bridgeAddress, bytes bridgeData);
}

/// Proxy id of plain token asset data.
pub const ERC20_PROXY_ID: [u8; 4] = ERC20TokenCall::SELECTOR;

/// Proxy id of bridged token asset data.
pub const ERC20_BRIDGE_PROXY_ID: [u8; 4] = ERC20BridgeCall::SELECTOR;

pub fn encode_erc20_asset_data(token: Address) -> Bytes {
	ERC20TokenCall {
		tokenAddress: token,
	}
	.abi_encode()
	.into()
}

pub fn encode_bridge_asset_data(token: Address, bridge: Address, bridge_data: Bytes) -> Bytes {
	ERC20BridgeCall {
		tokenAddress: token,
		bridgeAddress: bridge,
		bridgeData: bridge_data,
	}
	.abi_encode()
	.into()
}

/// Token named by plain token asset data, if `data` is one.
pub fn decode_erc20_asset_data(data: &[u8]) -> Option<Address> {
	let call = ERC20TokenCall::abi_decode(data).ok()?;
	Some(call.tokenAddress)
}

/// Splits bridged asset data back into token, bridge and calldata.
pub fn decode_bridge_asset_data(data: &[u8]) -> Option<(Address, Address, Bytes)> {
	let call = ERC20BridgeCall::abi_decode(data).ok()?;
	Some((call.tokenAddress, call.bridgeAddress, call.bridgeData))
}

/// Bridge calldata for a two-hop route: the intermediate token and the
/// calldata of each leg.
pub fn encode_two_hop_data(intermediate_token: Address, first: Bytes, second: Bytes) -> Bytes {
	(intermediate_token, first, second).abi_encode_params().into()
}
