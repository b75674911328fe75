use crate::{
    chain::{
        ChainClient,
        ChainResult,
    },
    local::LocalChain,
    rpc::RpcWallet,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::sync::Arc;

pub const FRAME_URL: &str = "http://127.0.0.1:1248";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectorKind {
    /// Wallet reachable over JSON-RPC; it holds the keys and signs.
    Rpc { url: String },
    /// In-process simulated chain.
    Local,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct WalletConnector {
    pub name: String,
    #[serde(flatten)]
    pub kind: ConnectorKind,
}

impl WalletConnector {
    pub fn rpc(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ConnectorKind::Rpc { url: url.into() },
        }
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ConnectorKind::Local,
        }
    }
}

pub fn default_connectors() -> Vec<WalletConnector> {
    vec![
        WalletConnector::rpc("Frame", FRAME_URL),
        WalletConnector::local("Local Simulator"),
    ]
}

pub fn default_allow_list() -> Vec<String> {
    ["frame", "rabby", "metamask", "local"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Connectors whose name contains one of `allow_list` (case-insensitive).
pub fn allowed_connectors(
    connectors: &[WalletConnector],
    allow_list: &[String],
) -> Vec<WalletConnector> {
    let allow: Vec<String> = allow_list.iter().map(|s| s.to_lowercase()).collect();
    connectors
        .iter()
        .filter(|connector| {
            let name = connector.name.to_lowercase();
            allow.iter().any(|needle| name.contains(needle.as_str()))
        })
        .cloned()
        .collect()
}

/// Opens chain clients for the offered connectors.
///
/// The simulated chain is shared across connects so a game survives a
/// disconnect/reconnect cycle.
pub struct WalletConnectors {
    offered: Vec<WalletConnector>,
    local: Arc<LocalChain>,
}

impl WalletConnectors {
    pub fn new(offered: Vec<WalletConnector>, local: Arc<LocalChain>) -> Self {
        Self { offered, local }
    }

    pub fn offered(&self) -> &[WalletConnector] {
        &self.offered
    }

    pub fn get(&self, index: usize) -> Option<&WalletConnector> {
        self.offered.get(index)
    }

    pub fn local_chain(&self) -> &Arc<LocalChain> {
        &self.local
    }

    pub fn open(&self, connector: &WalletConnector) -> ChainResult<Arc<dyn ChainClient>> {
        match &connector.kind {
            ConnectorKind::Rpc { url } => Ok(Arc::new(RpcWallet::new(url.clone())?)),
            ConnectorKind::Local => Ok(self.local.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn allowed_connectors__filters_by_case_insensitive_substring() {
        // given
        let connectors = vec![
            WalletConnector::rpc("MetaMask Bridge", "http://a"),
            WalletConnector::rpc("Coinbase Wallet", "http://b"),
            WalletConnector::rpc("Rabby", "http://c"),
        ];
        let allow = vec!["metamask".to_string(), "RABBY".to_string()];

        // when
        let allowed = allowed_connectors(&connectors, &allow);

        // then
        let names: Vec<_> = allowed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["MetaMask Bridge", "Rabby"]);
    }

    #[test]
    fn connector__serializes_with_kind_tag() {
        let json = serde_json::to_value(WalletConnector::rpc("Frame", FRAME_URL)).unwrap();
        assert_eq!(json["kind"], "rpc");
        assert_eq!(json["url"], FRAME_URL);

        let local: WalletConnector =
            serde_json::from_str(r#"{"name":"Sim","kind":"local"}"#).unwrap();
        assert_eq!(local, WalletConnector::local("Sim"));
    }
}
