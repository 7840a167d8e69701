use alloy::primitives::Address;
use alloy::providers::ProviderBuilder;

use crate::error::MarketError;

/// Chain id the FID marketplace contract lives on.
pub const FID_HOME_CHAIN_ID: i32 = 10;

/// Chain ids the NFT marketplace is deployed to.
pub const NFT_CHAIN_IDS: [i32; 2] = [1, 10];

/// Configuration for a single chain the engine talks to.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: i32,
    pub rpc_url: String,
    /// FID marketplace contract, present only on the home chain.
    pub fid_marketplace: Option<Address>,
    /// NFT marketplace contract, if deployed on this chain.
    pub nft_marketplace: Option<Address>,
}

/// The alloy HTTP provider type returned by ProviderBuilder::new().connect_http().
/// In alloy v1, this is a FillProvider wrapping a RootProvider with default fillers.
pub type HttpProvider = alloy::providers::fillers::FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::Identity,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::GasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::BlobGasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::NonceFiller,
                    alloy::providers::fillers::ChainIdFiller,
                >,
            >,
        >,
    >,
    alloy::providers::RootProvider,
>;

/// Create an alloy HTTP provider for the given chain config.
pub fn create_provider(config: &ChainConfig) -> Result<HttpProvider, MarketError> {
    let url = config
        .rpc_url
        .parse()
        .map_err(|_| MarketError::RpcEndpoint(config.rpc_url.clone()))?;
    let provider = ProviderBuilder::new().connect_http(url);
    Ok(provider)
}

/// Build all chain configs from environment variables with fallback defaults.
///
/// Environment variables:
/// - OPTIMISM_RPC_URL (default: https://mainnet.optimism.io)
/// - ETHEREUM_RPC_URL (default: https://eth.llamarpc.com)
/// - FID_MARKETPLACE_ADDRESS — FID marketplace on Optimism
/// - NFT_MARKETPLACE_ADDRESS_OP / NFT_MARKETPLACE_ADDRESS_ETH
pub fn get_chain_configs() -> Vec<ChainConfig> {
    let mut configs = Vec::new();

    let op_rpc = std::env::var("OPTIMISM_RPC_URL")
        .unwrap_or_else(|_| "https://mainnet.optimism.io".to_string());
    let eth_rpc = std::env::var("ETHEREUM_RPC_URL")
        .unwrap_or_else(|_| "https://eth.llamarpc.com".to_string());

    let fid_marketplace = std::env::var("FID_MARKETPLACE_ADDRESS")
        .unwrap_or_else(|_| "0x57ce6c12a101c41e790744413f4f5408ac64d8c6".to_string())
        .parse::<Address>()
        .ok();
    let nft_marketplace_op = std::env::var("NFT_MARKETPLACE_ADDRESS_OP")
        .unwrap_or_else(|_| "0xc6581f8a9a3ca2f5e9e484f2623d30dd2cef34c9".to_string())
        .parse::<Address>()
        .ok();
    let nft_marketplace_eth = std::env::var("NFT_MARKETPLACE_ADDRESS_ETH")
        .ok()
        .and_then(|a| a.parse::<Address>().ok());

    configs.push(ChainConfig {
        chain_id: FID_HOME_CHAIN_ID,
        rpc_url: op_rpc,
        fid_marketplace,
        nft_marketplace: nft_marketplace_op,
    });

    configs.push(ChainConfig {
        chain_id: 1,
        rpc_url: eth_rpc,
        fid_marketplace: None,
        nft_marketplace: nft_marketplace_eth,
    });

    configs
}
