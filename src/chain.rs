//! Boundary to the wallet / RPC layer.
//!
//! The game never signs or settles anything itself; it asks a [`ChainClient`]
//! for account state, submits contract calls and waits for receipts.

use futures::future::BoxFuture;
use std::{
    fmt,
    str::FromStr,
};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("wallet is not connected")]
    NotConnected,
    #[error("request rejected by wallet: {0}")]
    Rejected(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
    #[error("chain {0} is not known to the wallet")]
    UnknownChain(u64),
    #[error("execution reverted: {0}")]
    Reverted(String),
}

pub type ChainResult<T> = Result<T, ChainError>;

#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// `0x1234...abcd`, as shown in the navbar.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex(s)?;
        let array: [u8; 20] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            ChainError::InvalidResponse(format!(
                "address must be 20 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Address(array))
    }
}

#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({self})")
    }
}

impl FromStr for TxHash {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex(s)?;
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            ChainError::InvalidResponse(format!("transaction hash '{s}' is not 32 bytes"))
        })?;
        Ok(TxHash(array))
    }
}

pub fn decode_hex(s: &str) -> ChainResult<Vec<u8>> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped)
        .map_err(|e| ChainError::InvalidResponse(format!("invalid hex '{s}': {e}")))
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccountStatus {
    pub address: Address,
    pub chain_id: u64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub logs: Vec<LogEntry>,
}

/// Everything the game needs from a connected wallet.
///
/// Methods return boxed futures so a connected client can be held as
/// `Arc<dyn ChainClient>` whatever connector produced it.
pub trait ChainClient: Send + Sync {
    fn account_status(&self) -> BoxFuture<'_, ChainResult<AccountStatus>>;

    fn balance(&self, address: Address, chain_id: u64) -> BoxFuture<'_, ChainResult<u128>>;

    fn read_contract(
        &self,
        contract: Address,
        calldata: Vec<u8>,
    ) -> BoxFuture<'_, ChainResult<Vec<u8>>>;

    fn write_contract(
        &self,
        contract: Address,
        calldata: Vec<u8>,
        value: u128,
    ) -> BoxFuture<'_, ChainResult<TxHash>>;

    fn wait_for_receipt(&self, tx_hash: TxHash) -> BoxFuture<'_, ChainResult<Receipt>>;

    fn switch_chain(&self, chain_id: u64) -> BoxFuture<'_, ChainResult<()>>;
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn address__parses_and_shortens() {
        let address: Address = "0xc97a8e7Fe83d3941a10D5f791F5cf3E6Ef88f57c".parse().unwrap();
        assert_eq!(address.to_string(), "0xc97a8e7fe83d3941a10d5f791f5cf3e6ef88f57c");
        assert_eq!(address.short(), "0xc97a...f57c");
    }

    #[test]
    fn address__rejects_wrong_length() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("not-hex".parse::<Address>().is_err());
    }

    #[test]
    fn tx_hash__round_trips_through_display() {
        let hash = TxHash([0xab; 32]);
        let parsed: TxHash = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);
    }
}
