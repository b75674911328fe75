use crate::{
    abi::{
        AbiError,
        ChoiceInfo,
        GameCall,
        RemoteGameInfo,
        decode_choices,
    },
    chain::{
        Address,
        ChainClient,
        ChainError,
        Receipt,
        TxHash,
    },
};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ContractError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("could not decode contract response: {0}")]
    Abi(#[from] AbiError),
}

/// Typed handle on the deployed game contract.
#[derive(Clone)]
pub struct GameContract {
    client: Arc<dyn ChainClient>,
    address: Address,
}

impl GameContract {
    pub fn new(client: Arc<dyn ChainClient>, address: Address) -> Self {
        Self { client, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    pub async fn get_game_info(
        &self,
        player: Address,
    ) -> Result<RemoteGameInfo, ContractError> {
        let calldata = GameCall::GetGameInfo { player }.encode();
        let raw = self.client.read_contract(self.address, calldata).await?;
        Ok(RemoteGameInfo::decode(&raw)?)
    }

    pub async fn get_choices(&self) -> Result<Vec<ChoiceInfo>, ContractError> {
        let raw = self
            .client
            .read_contract(self.address, GameCall::GetChoices.encode())
            .await?;
        Ok(decode_choices(&raw)?)
    }

    /// Submits `call` with `value` wei attached and returns the transaction hash.
    pub async fn submit(&self, call: &GameCall, value: u128) -> Result<TxHash, ContractError> {
        let hash = self
            .client
            .write_contract(self.address, call.encode(), value)
            .await?;
        Ok(hash)
    }

    pub async fn wait(&self, tx_hash: TxHash) -> Result<Receipt, ContractError> {
        Ok(self.client.wait_for_receipt(tx_hash).await?)
    }
}
