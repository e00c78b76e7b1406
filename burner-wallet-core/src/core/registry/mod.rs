//! Network and token registry
//!
//! Static mapping of chain -> account-abstraction endpoints and token ->
//! per-chain contracts and bridge fees. Pure data with typed lookups; every
//! (chain, token) pair referenced by a request must resolve here before any
//! network call is made.

use crate::shared::constants::{
    ARBITRUM_CHAIN_ID, BASE_CHAIN_ID, ENTRY_POINT_V07, MAINNET_CHAIN_ID, OPTIMISM_CHAIN_ID,
};
use crate::shared::error::WalletError;
use crate::shared::types::WalletResult;
use crate::shared::utils::parse_address;
use ethers::types::{Address, U256};
use std::collections::{BTreeMap, HashMap};
use std::env;

/// Chain configuration: entry point plus bundler/paymaster endpoints
#[derive(Debug, Clone)]
pub struct ChainDescriptor {
    pub chain_id: u64,
    pub name: String,
    pub entry_point: Address,
    pub bundler_url: String,
    pub paymaster_url: String,
    /// Deposit pool of the bridge on this chain; chains without one cannot
    /// be a bridge source
    pub bridge_pool: Option<Address>,
}

/// Token configuration: decimals plus per-chain contract and bridge fee
#[derive(Debug, Clone)]
pub struct TokenDescriptor {
    pub symbol: String,
    pub decimals: u8,
    pub contracts: HashMap<u64, Address>,
    /// Flat bridge fee in raw token units, keyed by source chain
    pub bridge_fees: HashMap<u64, U256>,
}

impl TokenDescriptor {
    pub fn contract(&self, chain_id: u64) -> Option<Address> {
        self.contracts.get(&chain_id).copied()
    }
}

/// A (chain, token) pair that resolved successfully
#[derive(Debug, Clone, Copy)]
pub struct ResolvedToken<'a> {
    pub chain: &'a ChainDescriptor,
    pub token: &'a TokenDescriptor,
    pub contract: Address,
}

/// Immutable registry, loaded once at process start
pub struct Registry {
    chains: BTreeMap<u64, ChainDescriptor>,
    tokens: Vec<TokenDescriptor>,
}

impl Registry {
    pub fn new(chains: Vec<ChainDescriptor>, tokens: Vec<TokenDescriptor>) -> Self {
        Self {
            chains: chains.into_iter().map(|c| (c.chain_id, c)).collect(),
            tokens,
        }
    }

    /// Build the registry from the builtin chain/token tables, reading
    /// bundler and paymaster endpoints from the environment.
    pub fn builtin() -> WalletResult<Self> {
        let entry_point = parse_address(ENTRY_POINT_V07)?;

        let chain = |chain_id: u64,
                     name: &str,
                     env_prefix: &str,
                     bridge_pool: Option<Address>|
         -> ChainDescriptor {
            ChainDescriptor {
                chain_id,
                name: name.to_string(),
                entry_point,
                bundler_url: env::var(format!("BURNER_{}_BUNDLER_URL", env_prefix))
                    .unwrap_or_default(),
                paymaster_url: env::var(format!("BURNER_{}_PAYMASTER_URL", env_prefix))
                    .unwrap_or_default(),
                bridge_pool,
            }
        };

        let chains = vec![
            chain(MAINNET_CHAIN_ID, "Ethereum", "MAINNET", None),
            chain(
                BASE_CHAIN_ID,
                "Base",
                "BASE",
                Some(parse_address("0x09aea4b2242abc8bb4bb78d537a67a245a7bec64")?),
            ),
            chain(
                OPTIMISM_CHAIN_ID,
                "Optimism",
                "OPTIMISM",
                Some(parse_address("0x6f26Bf09B1C792e3228e5467807a900A503c0281")?),
            ),
            chain(
                ARBITRUM_CHAIN_ID,
                "Arbitrum",
                "ARBITRUM",
                Some(parse_address("0xe35e9842fceaca96570b734083f4a58e8f7c5f2a")?),
            ),
        ];

        // 0.1 USDC at 6 decimals, flat per source chain
        let usdc_fee = U256::from(100_000u64);
        let tokens = vec![
            TokenDescriptor {
                symbol: "USDC".to_string(),
                decimals: 6,
                contracts: HashMap::from([
                    (
                        MAINNET_CHAIN_ID,
                        parse_address("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")?,
                    ),
                    (
                        BASE_CHAIN_ID,
                        parse_address("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913")?,
                    ),
                    (
                        OPTIMISM_CHAIN_ID,
                        parse_address("0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85")?,
                    ),
                    (
                        ARBITRUM_CHAIN_ID,
                        parse_address("0xaf88d065e77c8cC2239327C5EDb3A432268e5831")?,
                    ),
                ]),
                bridge_fees: HashMap::from([
                    (BASE_CHAIN_ID, usdc_fee),
                    (OPTIMISM_CHAIN_ID, usdc_fee),
                    (ARBITRUM_CHAIN_ID, usdc_fee),
                ]),
            },
            TokenDescriptor {
                symbol: "USDT".to_string(),
                decimals: 6,
                contracts: HashMap::from([(
                    MAINNET_CHAIN_ID,
                    parse_address("0xdac17f958d2ee523a2206206994597c13d831ec7")?,
                )]),
                bridge_fees: HashMap::new(),
            },
            TokenDescriptor {
                symbol: "DAI".to_string(),
                decimals: 18,
                contracts: HashMap::from([(
                    MAINNET_CHAIN_ID,
                    parse_address("0x6B175474E89094C44Da98b954EedeAC495271d0F")?,
                )]),
                bridge_fees: HashMap::new(),
            },
            TokenDescriptor {
                symbol: "USDe".to_string(),
                decimals: 18,
                contracts: HashMap::from([(
                    MAINNET_CHAIN_ID,
                    parse_address("0x4c9EDD5852cd905f086C759E8383e09bff1E68B3")?,
                )]),
                bridge_fees: HashMap::new(),
            },
        ];

        Ok(Self::new(chains, tokens))
    }

    /// Look up a chain descriptor
    pub fn chain(&self, chain_id: u64) -> WalletResult<&ChainDescriptor> {
        self.chains
            .get(&chain_id)
            .ok_or(WalletError::UnsupportedChain(chain_id))
    }

    /// All configured chains, in ascending chain-id order
    pub fn chains(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.values()
    }

    /// All configured tokens, in registry order
    pub fn tokens(&self) -> &[TokenDescriptor] {
        &self.tokens
    }

    /// Look up a token by symbol
    pub fn token(&self, symbol: &str) -> Option<&TokenDescriptor> {
        self.tokens.iter().find(|t| t.symbol == symbol)
    }

    /// Resolve a (chain, token) pair, failing fast if either side or the
    /// pairing is unconfigured
    pub fn resolve(&self, chain_id: u64, symbol: &str) -> WalletResult<ResolvedToken<'_>> {
        let chain = self.chain(chain_id)?;
        let token = self
            .token(symbol)
            .ok_or_else(|| WalletError::unsupported_token(symbol, chain_id))?;
        let contract = token
            .contract(chain_id)
            .ok_or_else(|| WalletError::unsupported_token(symbol, chain_id))?;
        Ok(ResolvedToken {
            chain,
            token,
            contract,
        })
    }

    /// Bridge fee for bridging `symbol` out of `chain_id`
    pub fn bridge_fee(&self, symbol: &str, chain_id: u64) -> WalletResult<U256> {
        let token = self
            .token(symbol)
            .ok_or_else(|| WalletError::unsupported_token(symbol, chain_id))?;
        token
            .bridge_fees
            .get(&chain_id)
            .copied()
            .ok_or_else(|| WalletError::unsupported_token(symbol, chain_id))
    }

    /// Bridge deposit pool on `chain_id`; errors if the chain cannot be a
    /// bridge source
    pub fn bridge_pool(&self, chain_id: u64) -> WalletResult<Address> {
        self.chain(chain_id)?
            .bridge_pool
            .ok_or(WalletError::UnsupportedChain(chain_id))
    }

    /// Find the token a contract address belongs to on `chain_id`,
    /// case-insensitive
    pub fn token_for_contract(&self, chain_id: u64, contract: &str) -> Option<&TokenDescriptor> {
        let parsed: Address = contract.parse().ok()?;
        self.tokens
            .iter()
            .find(|t| t.contract(chain_id) == Some(parsed))
    }

    /// Whether a contract address matches any registered token on any chain,
    /// case-insensitive
    pub fn is_registered_contract(&self, contract: &str) -> bool {
        let parsed: Address = match contract.parse() {
            Ok(a) => a,
            Err(_) => return false,
        };
        self.tokens
            .iter()
            .any(|t| t.contracts.values().any(|c| *c == parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_supported_pairs_resolve() {
        let registry = Registry::builtin().expect("Failed to build registry");
        for token in registry.tokens() {
            for chain_id in token.contracts.keys() {
                let resolved = registry
                    .resolve(*chain_id, &token.symbol)
                    .expect("Configured pair failed to resolve");
                assert_eq!(resolved.token.symbol, token.symbol);
            }
        }
    }

    #[test]
    fn test_unsupported_pairs_fail_fast() {
        let registry = Registry::builtin().expect("Failed to build registry");

        let err = registry.resolve(999, "USDC").expect_err("Unknown chain resolved");
        assert!(matches!(err, WalletError::UnsupportedChain(999)));
        assert!(err.is_configuration());

        let err = registry
            .resolve(BASE_CHAIN_ID, "WBTC")
            .expect_err("Unknown token resolved");
        assert!(matches!(err, WalletError::UnsupportedToken { .. }));

        // Token exists but not on this chain
        let err = registry
            .resolve(BASE_CHAIN_ID, "DAI")
            .expect_err("Unpaired token resolved");
        assert!(matches!(err, WalletError::UnsupportedToken { .. }));
    }

    #[test]
    fn test_bridge_lookups() {
        let registry = Registry::builtin().expect("Failed to build registry");

        let fee = registry
            .bridge_fee("USDC", BASE_CHAIN_ID)
            .expect("Missing USDC bridge fee on Base");
        assert_eq!(fee, U256::from(100_000u64));

        registry
            .bridge_pool(BASE_CHAIN_ID)
            .expect("Missing bridge pool on Base");
        // Mainnet is a valid destination but not a bridge source
        assert!(registry.bridge_pool(MAINNET_CHAIN_ID).is_err());
    }

    #[test]
    fn test_contract_matching_is_case_insensitive() {
        let registry = Registry::builtin().expect("Failed to build registry");
        assert!(registry.is_registered_contract("0x833589FCD6EDB6E08F4C7C32D4F71B54BDA02913"));
        assert!(registry.is_registered_contract("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"));
        assert!(!registry.is_registered_contract("0x0000000000000000000000000000000000000001"));
        assert!(!registry.is_registered_contract("garbage"));

        let token = registry
            .token_for_contract(BASE_CHAIN_ID, "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913")
            .expect("Failed to match contract");
        assert_eq!(token.symbol, "USDC");
    }

    #[test]
    fn test_chains_iterate_in_ascending_order() {
        let registry = Registry::builtin().expect("Failed to build registry");
        let ids: Vec<u64> = registry.chains().map(|c| c.chain_id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }
}
