//! HTTP collaborators: bundler, paymaster, indexer, passkey service, registrar
//!
//! Every remote service the core talks to sits behind an async trait so the
//! engines and aggregators can be exercised against mocks. The HTTP
//! implementations follow the JSON-RPC and REST contracts of the external
//! account-abstraction and indexing infrastructure.

use crate::domain::entities::ActivityRecord;
use crate::shared::error::WalletError;
use crate::shared::types::{OperationReceipt, SponsoredOperation, UserOperation};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ethers::types::{Address, Bytes};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Bundler submission interface
#[async_trait]
pub trait BundlerApi: Send + Sync {
    /// Submit a sponsored, signed operation; returns the user operation hash
    async fn send_user_operation(
        &self,
        endpoint: &str,
        entry_point: &Address,
        operation: &SponsoredOperation,
        signature: &[u8],
    ) -> Result<String, WalletError>;

    /// Poll for the receipt of a submitted operation; `None` while pending
    async fn get_receipt(
        &self,
        endpoint: &str,
        user_op_hash: &str,
    ) -> Result<Option<OperationReceipt>, WalletError>;
}

/// Paymaster sponsorship interface
#[async_trait]
pub trait PaymasterApi: Send + Sync {
    /// Request gas sponsorship; returns the paymaster stamp
    async fn sponsor_user_operation(
        &self,
        endpoint: &str,
        entry_point: &Address,
        operation: &UserOperation,
    ) -> Result<Bytes, WalletError>;
}

/// One token row of a balance fetch response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenHolding {
    pub address: String,
    pub balance: String,
    pub decimals: u8,
    pub symbol: String,
}

/// Balance and history indexer interface
#[async_trait]
pub trait IndexerApi: Send + Sync {
    async fn fetch_balances(
        &self,
        address: &Address,
        chain_id: u64,
    ) -> Result<Vec<TokenHolding>, WalletError>;

    async fn fetch_history(&self, address: &Address) -> Result<Vec<ActivityRecord>, WalletError>;
}

/// Device-bound credential handed back by the passkey service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasskeyCredential {
    pub credential_id: String,
    pub public_key: Vec<u8>,
}

/// Remote passkey ceremony interface
#[async_trait]
pub trait PasskeyApi: Send + Sync {
    /// One-time registration ceremony, run only at wallet creation
    async fn register(&self, ceremony_id: &str) -> Result<PasskeyCredential, WalletError>;

    /// Login ceremony against an existing credential
    async fn login(&self, ceremony_id: &str) -> Result<PasskeyCredential, WalletError>;

    /// Produce an assertion over a 32-byte challenge
    async fn sign(
        &self,
        credential: &PasskeyCredential,
        challenge: &[u8; 32],
    ) -> Result<Vec<u8>, WalletError>;
}

/// Name registration side-channel
#[async_trait]
pub trait RegistrarApi: Send + Sync {
    /// Register `name` for `address`; returns the registration tx hash
    async fn register_name(&self, name: &str, address: &Address) -> Result<String, WalletError>;
}

fn rpc_error_message(value: &serde_json::Value) -> String {
    value
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("unknown RPC error")
        .to_string()
}

/// JSON-RPC bundler client
pub struct HttpBundler {
    client: Client,
}

impl HttpBundler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BundlerApi for HttpBundler {
    async fn send_user_operation(
        &self,
        endpoint: &str,
        entry_point: &Address,
        operation: &SponsoredOperation,
        signature: &[u8],
    ) -> Result<String, WalletError> {
        let mut op = serde_json::to_value(operation)?;
        op["signature"] = json!(format!("0x{}", hex::encode(signature)));
        let body = json!({
            "jsonrpc": "2.0",
            "method": "eth_sendUserOperation",
            "params": [op, format!("{:#x}", entry_point)],
            "id": 1
        });

        let resp = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::network(format!("Failed to reach bundler: {}", e)))?;
        let resp_json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| WalletError::network(format!("Invalid bundler response: {}", e)))?;

        if resp_json.get("error").is_some() {
            return Err(WalletError::SubmissionRejected(rpc_error_message(
                &resp_json,
            )));
        }
        resp_json
            .get("result")
            .and_then(|r| r.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| WalletError::SubmissionRejected("No operation hash returned".into()))
    }

    async fn get_receipt(
        &self,
        endpoint: &str,
        user_op_hash: &str,
    ) -> Result<Option<OperationReceipt>, WalletError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": "eth_getUserOperationReceipt",
            "params": [user_op_hash],
            "id": 1
        });
        let resp = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::network(format!("Failed to reach bundler: {}", e)))?;
        let resp_json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| WalletError::network(format!("Invalid bundler response: {}", e)))?;

        let result = match resp_json.get("result") {
            Some(r) if !r.is_null() => r,
            _ => return Ok(None),
        };
        let success = result
            .get("success")
            .and_then(|s| s.as_bool())
            .unwrap_or(false);
        let transaction_hash = result
            .get("receipt")
            .and_then(|r| r.get("transactionHash"))
            .and_then(|h| h.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Some(OperationReceipt {
            user_op_hash: user_op_hash.to_string(),
            transaction_hash,
            success,
        }))
    }
}

/// JSON-RPC paymaster client
pub struct HttpPaymaster {
    client: Client,
}

impl HttpPaymaster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PaymasterApi for HttpPaymaster {
    async fn sponsor_user_operation(
        &self,
        endpoint: &str,
        entry_point: &Address,
        operation: &UserOperation,
    ) -> Result<Bytes, WalletError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": "pm_sponsorUserOperation",
            "params": [serde_json::to_value(operation)?, format!("{:#x}", entry_point)],
            "id": 1
        });
        let resp = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::network(format!("Failed to reach paymaster: {}", e)))?;
        let resp_json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| WalletError::network(format!("Invalid paymaster response: {}", e)))?;

        if resp_json.get("error").is_some() {
            return Err(WalletError::SponsorshipDenied(rpc_error_message(&resp_json)));
        }
        let stamp = resp_json
            .get("result")
            .and_then(|r| r.get("paymasterAndData"))
            .and_then(|p| p.as_str())
            .ok_or_else(|| WalletError::SponsorshipDenied("No sponsorship stamp returned".into()))?;
        let raw = hex::decode(stamp.trim_start_matches("0x"))
            .map_err(|e| WalletError::SponsorshipDenied(format!("Bad stamp encoding: {}", e)))?;
        Ok(Bytes::from(raw))
    }
}

/// REST indexer client for balances and history
pub struct HttpIndexer {
    client: Client,
    base_url: String,
}

impl HttpIndexer {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Deserialize)]
struct BalancesResponse {
    #[serde(default)]
    tokens: Vec<TokenHolding>,
}

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    items: Vec<ActivityRecord>,
}

#[async_trait]
impl IndexerApi for HttpIndexer {
    async fn fetch_balances(
        &self,
        address: &Address,
        chain_id: u64,
    ) -> Result<Vec<TokenHolding>, WalletError> {
        let url = format!(
            "{}/balances?address={:#x}&chainId={}",
            self.base_url, address, chain_id
        );
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::network(format!("Failed to fetch balances: {}", e)))?;
        if !resp.status().is_success() {
            return Err(WalletError::network(format!(
                "Balance fetch for chain {} returned {}",
                chain_id,
                resp.status()
            )));
        }
        let parsed: BalancesResponse = resp
            .json()
            .await
            .map_err(|e| WalletError::network(format!("Invalid balances response: {}", e)))?;
        Ok(parsed.tokens)
    }

    async fn fetch_history(&self, address: &Address) -> Result<Vec<ActivityRecord>, WalletError> {
        let url = format!("{}/history?address={:#x}", self.base_url, address);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::network(format!("Failed to fetch history: {}", e)))?;
        if !resp.status().is_success() {
            return Err(WalletError::network(format!(
                "History fetch returned {}",
                resp.status()
            )));
        }
        let parsed: HistoryResponse = resp
            .json()
            .await
            .map_err(|e| WalletError::network(format!("Invalid history response: {}", e)))?;
        Ok(parsed.items)
    }
}

/// Client for the remote passkey ceremony service
pub struct HttpPasskeyService {
    client: Client,
    base_url: String,
}

impl HttpPasskeyService {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn ceremony(
        &self,
        path: &str,
        ceremony_id: &str,
    ) -> Result<PasskeyCredential, WalletError> {
        let resp = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .json(&json!({
                "ceremonyId": ceremony_id,
                "requestId": uuid::Uuid::new_v4().to_string(),
            }))
            .send()
            .await
            .map_err(|e| WalletError::PasskeyCeremonyFailed(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(WalletError::PasskeyCeremonyFailed(format!(
                "Service returned {}",
                resp.status()
            )));
        }
        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| WalletError::PasskeyCeremonyFailed(e.to_string()))?;

        let credential_id = value
            .get("credentialId")
            .and_then(|c| c.as_str())
            .ok_or_else(|| WalletError::PasskeyCeremonyFailed("Missing credential id".into()))?
            .to_string();
        let public_key = value
            .get("publicKey")
            .and_then(|k| k.as_str())
            .and_then(|k| BASE64.decode(k).ok())
            .ok_or_else(|| WalletError::PasskeyCeremonyFailed("Missing public key".into()))?;

        Ok(PasskeyCredential {
            credential_id,
            public_key,
        })
    }
}

#[async_trait]
impl PasskeyApi for HttpPasskeyService {
    async fn register(&self, ceremony_id: &str) -> Result<PasskeyCredential, WalletError> {
        self.ceremony("register", ceremony_id).await
    }

    async fn login(&self, ceremony_id: &str) -> Result<PasskeyCredential, WalletError> {
        self.ceremony("login", ceremony_id).await
    }

    async fn sign(
        &self,
        credential: &PasskeyCredential,
        challenge: &[u8; 32],
    ) -> Result<Vec<u8>, WalletError> {
        let resp = self
            .client
            .post(format!("{}/sign", self.base_url))
            .json(&json!({
                "credentialId": credential.credential_id,
                "challenge": BASE64.encode(challenge),
                "requestId": uuid::Uuid::new_v4().to_string(),
            }))
            .send()
            .await
            .map_err(|e| WalletError::PasskeyCeremonyFailed(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(WalletError::PasskeyCeremonyFailed(format!(
                "Service returned {}",
                resp.status()
            )));
        }
        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| WalletError::PasskeyCeremonyFailed(e.to_string()))?;
        value
            .get("assertion")
            .and_then(|a| a.as_str())
            .and_then(|a| BASE64.decode(a).ok())
            .ok_or_else(|| WalletError::PasskeyCeremonyFailed("Missing assertion".into()))
    }
}

/// Client for the name registration side-channel
pub struct HttpRegistrar {
    client: Client,
    base_url: String,
}

impl HttpRegistrar {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl RegistrarApi for HttpRegistrar {
    async fn register_name(&self, name: &str, address: &Address) -> Result<String, WalletError> {
        let resp = self
            .client
            .post(format!("{}/ens/register", self.base_url))
            .json(&json!({ "name": name, "address": format!("{:#x}", address) }))
            .send()
            .await
            .map_err(|e| WalletError::network(format!("Failed to reach registrar: {}", e)))?;
        if !resp.status().is_success() {
            return Err(WalletError::network(format!(
                "Registrar returned {}",
                resp.status()
            )));
        }
        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| WalletError::network(format!("Invalid registrar response: {}", e)))?;
        Ok(value
            .get("hash")
            .and_then(|h| h.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_message_extraction() {
        let value = json!({"error": {"code": -32500, "message": "aa23 reverted"}});
        assert_eq!(rpc_error_message(&value), "aa23 reverted");
        assert_eq!(rpc_error_message(&json!({})), "unknown RPC error");
    }

    #[test]
    fn test_balances_response_shape() {
        let json = r#"{"tokens":[{"address":"0xabc","balance":"100","decimals":6,"symbol":"USDC"}]}"#;
        let parsed: BalancesResponse =
            serde_json::from_str(json).expect("Failed to parse balances");
        assert_eq!(parsed.tokens.len(), 1);
        assert_eq!(parsed.tokens[0].symbol, "USDC");
    }

    #[test]
    fn test_empty_history_response() {
        let parsed: HistoryResponse =
            serde_json::from_str("{}").expect("Failed to parse empty history");
        assert!(parsed.items.is_empty());
    }
}
