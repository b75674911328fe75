//! In-process chain with a simulated game contract.
//!
//! Speaks the same ABI as the deployed contract so the whole client, ABI
//! layer included, can run offline (`--local`) and under test.

use crate::{
    abi::{
        CASHED_OUT_TOPIC,
        ChoiceInfo,
        ChoiceMade,
        GAME_ENTERED_TOPIC,
        GameCall,
        RemoteGameInfo,
        address_word,
        encode_choices,
        uint_word,
    },
    amount::WEI_PER_ETHER,
    board::{
        CONTRACT_CHOICES,
        Multiplier,
    },
    chain::{
        AccountStatus,
        Address,
        ChainClient,
        ChainError,
        ChainResult,
        LogEntry,
        Receipt,
        TxHash,
    },
};
use futures::{
    FutureExt,
    future::{
        BoxFuture,
        ready,
    },
};
use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};
use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    sync::{
        Mutex,
        MutexGuard,
    },
    time::Duration,
};
use tracing::{
    debug,
    info,
};

/// House edge applied to every choice: win chance is `97% / multiplier`.
const RETURN_TO_PLAYER_BPS: u64 = 9_700;

pub const LOCAL_CONTRACT: Address = Address([0xf1; 20]);
pub const LOCAL_PLAYER: Address = Address([0xa1; 20]);

#[derive(Clone, Debug)]
pub struct LocalChainConfig {
    pub chain_id: u64,
    pub known_chains: Vec<u64>,
    pub player: Address,
    pub contract: Address,
    pub starting_balance: u128,
    pub seed: u64,
    pub receipt_delay: Option<Duration>,
}

impl LocalChainConfig {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            known_chains: vec![chain_id],
            player: LOCAL_PLAYER,
            contract: LOCAL_CONTRACT,
            starting_balance: 10 * WEI_PER_ETHER,
            seed: 0,
            receipt_delay: None,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LocalGame {
    pub game_id: u64,
    pub bet: u128,
    pub total_winnings: u128,
    pub active: bool,
    pub games_played: u64,
}

struct LocalState {
    chain_id: u64,
    rng: StdRng,
    balances: HashMap<Address, u128>,
    games: HashMap<Address, LocalGame>,
    next_game_id: u64,
    tx_count: u64,
    receipts: HashMap<TxHash, Receipt>,
    forced_outcomes: VecDeque<bool>,
    reject_next_write: bool,
    fail_next_switch: bool,
}

pub struct LocalChain {
    player: Address,
    contract: Address,
    known_chains: Vec<u64>,
    receipt_delay: Option<Duration>,
    state: Mutex<LocalState>,
}

impl LocalChain {
    pub fn new(config: LocalChainConfig) -> Self {
        let mut balances = HashMap::new();
        balances.insert(config.player, config.starting_balance);
        let mut known_chains = config.known_chains;
        if !known_chains.contains(&config.chain_id) {
            known_chains.push(config.chain_id);
        }
        Self {
            player: config.player,
            contract: config.contract,
            known_chains,
            receipt_delay: config.receipt_delay,
            state: Mutex::new(LocalState {
                chain_id: config.chain_id,
                rng: StdRng::seed_from_u64(config.seed),
                balances,
                games: HashMap::new(),
                next_game_id: 1,
                tx_count: 0,
                receipts: HashMap::new(),
                forced_outcomes: VecDeque::new(),
                reject_next_write: false,
                fail_next_switch: false,
            }),
        }
    }

    pub fn player(&self) -> Address {
        self.player
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Outcomes handed to the next `makeChoice` calls instead of rolling.
    pub fn force_outcomes(&self, outcomes: impl IntoIterator<Item = bool>) {
        self.lock().forced_outcomes.extend(outcomes);
    }

    /// The next write is refused as if the user declined to sign.
    pub fn reject_next_write(&self) {
        self.lock().reject_next_write = true;
    }

    pub fn fail_next_switch(&self) {
        self.lock().fail_next_switch = true;
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.lock().chain_id = chain_id;
    }

    pub fn balance_of(&self, address: Address) -> u128 {
        self.lock().balances.get(&address).copied().unwrap_or(0)
    }

    pub fn game_of(&self, address: Address) -> LocalGame {
        self.lock().games.get(&address).cloned().unwrap_or_default()
    }

    pub fn choices() -> Vec<ChoiceInfo> {
        CONTRACT_CHOICES
            .iter()
            .map(|(multiplier, _)| ChoiceInfo {
                multiplier: *multiplier,
                win_chance_bps: win_chance_bps(*multiplier),
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn execute(&self, calldata: &[u8], value: u128) -> ChainResult<TxHash> {
        let call = GameCall::decode(calldata)
            .map_err(|e| ChainError::Reverted(format!("bad calldata: {e}")))?;
        let mut state = self.lock();
        if std::mem::take(&mut state.reject_next_write) {
            return Err(ChainError::Rejected(String::from("User rejected the request.")));
        }

        let logs = match call {
            GameCall::EnterGame => self.enter_game(&mut state, value)?,
            GameCall::MakeChoice { choice_index } => {
                self.make_choice(&mut state, choice_index)?
            }
            GameCall::CashOut => self.cash_out(&mut state)?,
            GameCall::GetGameInfo { .. } | GameCall::GetChoices => {
                return Err(ChainError::Reverted(String::from(
                    "view functions cannot be sent as transactions",
                )));
            }
        };

        state.tx_count += 1;
        let mut hash = [0u8; 32];
        hash[..8].copy_from_slice(&state.tx_count.to_be_bytes());
        hash[8..28].copy_from_slice(&self.player.0);
        let tx_hash = TxHash(hash);
        state.receipts.insert(
            tx_hash,
            Receipt {
                tx_hash,
                success: true,
                logs,
            },
        );
        debug!(%tx_hash, "local transaction mined");
        Ok(tx_hash)
    }

    fn enter_game(&self, state: &mut LocalState, value: u128) -> ChainResult<Vec<LogEntry>> {
        if value == 0 {
            return Err(ChainError::Reverted(String::from("bet required")));
        }
        if state.games.get(&self.player).is_some_and(|g| g.active) {
            return Err(ChainError::Reverted(String::from("game already active")));
        }
        let balance = state.balances.entry(self.player).or_insert(0);
        if *balance < value {
            return Err(ChainError::Reverted(String::from("insufficient funds")));
        }
        *balance -= value;

        let game_id = state.next_game_id;
        state.next_game_id += 1;
        state.games.insert(
            self.player,
            LocalGame {
                game_id,
                bet: value,
                total_winnings: 0,
                active: true,
                games_played: 0,
            },
        );
        info!(game_id, value, "local game entered");
        Ok(vec![LogEntry {
            address: self.contract,
            topics: vec![
                GAME_ENTERED_TOPIC,
                uint_word(u128::from(game_id)),
                address_word(&self.player),
            ],
            data: uint_word(value).to_vec(),
        }])
    }

    fn make_choice(
        &self,
        state: &mut LocalState,
        choice_index: u64,
    ) -> ChainResult<Vec<LogEntry>> {
        let (multiplier, _) = usize::try_from(choice_index)
            .ok()
            .and_then(|idx| CONTRACT_CHOICES.get(idx))
            .copied()
            .ok_or_else(|| ChainError::Reverted(format!("invalid choice {choice_index}")))?;
        if !state.games.get(&self.player).is_some_and(|g| g.active) {
            return Err(ChainError::Reverted(String::from("no active game")));
        }

        let won = match state.forced_outcomes.pop_front() {
            Some(forced) => forced,
            None => {
                let roll = state.rng.random_range(0..10_000u32);
                roll < win_chance_bps(multiplier)
            }
        };

        let game = state
            .games
            .get_mut(&self.player)
            .ok_or_else(|| ChainError::Reverted(String::from("no active game")))?;
        if won {
            let stake = if game.total_winnings > 0 {
                game.total_winnings
            } else {
                game.bet
            };
            game.total_winnings = stake * u128::from(multiplier.bps())
                / u128::from(Multiplier::SCALE);
            game.games_played += 1;
        } else {
            game.total_winnings = 0;
            game.active = false;
        }
        info!(
            game_id = game.game_id,
            choice_index,
            won,
            winnings = game.total_winnings,
            "local choice settled"
        );
        let event = ChoiceMade {
            game_id: game.game_id,
            choice_index,
            won,
            winnings: game.total_winnings,
        };
        Ok(vec![event.to_log(self.contract)])
    }

    fn cash_out(&self, state: &mut LocalState) -> ChainResult<Vec<LogEntry>> {
        let game = state
            .games
            .get_mut(&self.player)
            .filter(|g| g.active && g.total_winnings > 0)
            .ok_or_else(|| ChainError::Reverted(String::from("nothing to cash out")))?;
        let payout = game.total_winnings;
        let game_id = game.game_id;
        game.total_winnings = 0;
        game.active = false;
        game.games_played = 0;
        *state.balances.entry(self.player).or_insert(0) += payout;
        info!(game_id, payout, "local cash out");
        Ok(vec![LogEntry {
            address: self.contract,
            topics: vec![
                CASHED_OUT_TOPIC,
                uint_word(u128::from(game_id)),
                address_word(&self.player),
            ],
            data: uint_word(payout).to_vec(),
        }])
    }
}

fn win_chance_bps(multiplier: Multiplier) -> u32 {
    let chance = RETURN_TO_PLAYER_BPS * u64::from(Multiplier::SCALE)
        / u64::from(multiplier.bps().max(1));
    chance.min(10_000) as u32
}

impl ChainClient for LocalChain {
    fn account_status(&self) -> BoxFuture<'_, ChainResult<AccountStatus>> {
        let status = AccountStatus {
            address: self.player,
            chain_id: self.lock().chain_id,
        };
        ready(Ok(status)).boxed()
    }

    fn balance(&self, address: Address, chain_id: u64) -> BoxFuture<'_, ChainResult<u128>> {
        let result = if self.known_chains.contains(&chain_id) {
            Ok(self.balance_of(address))
        } else {
            Err(ChainError::UnknownChain(chain_id))
        };
        ready(result).boxed()
    }

    fn read_contract(
        &self,
        contract: Address,
        calldata: Vec<u8>,
    ) -> BoxFuture<'_, ChainResult<Vec<u8>>> {
        let result = if contract != self.contract {
            Ok(Vec::new())
        } else {
            match GameCall::decode(&calldata) {
                Ok(GameCall::GetGameInfo { player }) => {
                    let game = self.game_of(player);
                    Ok(RemoteGameInfo {
                        game_id: game.game_id,
                        total_winnings: game.total_winnings,
                        bet_amount: game.bet,
                        active: game.active,
                        games_played: game.games_played,
                    }
                    .encode())
                }
                Ok(GameCall::GetChoices) => Ok(encode_choices(&Self::choices())),
                Ok(other) => Err(ChainError::Reverted(format!("{other:?} is not a view"))),
                Err(e) => Err(ChainError::Reverted(format!("bad calldata: {e}"))),
            }
        };
        ready(result).boxed()
    }

    fn write_contract(
        &self,
        contract: Address,
        calldata: Vec<u8>,
        value: u128,
    ) -> BoxFuture<'_, ChainResult<TxHash>> {
        let result = if contract != self.contract {
            Err(ChainError::Reverted(format!("no contract at {contract}")))
        } else {
            self.execute(&calldata, value)
        };
        ready(result).boxed()
    }

    fn wait_for_receipt(&self, tx_hash: TxHash) -> BoxFuture<'_, ChainResult<Receipt>> {
        async move {
            if let Some(delay) = self.receipt_delay {
                tokio::time::sleep(delay).await;
            }
            self.lock()
                .receipts
                .get(&tx_hash)
                .cloned()
                .ok_or_else(|| ChainError::InvalidResponse(format!("unknown transaction {tx_hash}")))
        }
        .boxed()
    }

    fn switch_chain(&self, chain_id: u64) -> BoxFuture<'_, ChainResult<()>> {
        let mut state = self.lock();
        let result = if std::mem::take(&mut state.fail_next_switch)
            || !self.known_chains.contains(&chain_id)
        {
            Err(ChainError::UnknownChain(chain_id))
        } else {
            state.chain_id = chain_id;
            Ok(())
        };
        drop(state);
        ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::abi::find_choice_made;

    fn chain() -> LocalChain {
        LocalChain::new(LocalChainConfig::new(747))
    }

    #[tokio::test]
    async fn make_choice__win_compounds_winnings() {
        // given
        let chain = chain();
        chain.force_outcomes([true, true]);
        let bet = WEI_PER_ETHER / 1000;
        chain
            .write_contract(LOCAL_CONTRACT, GameCall::EnterGame.encode(), bet)
            .await
            .unwrap();

        // when
        for idx in 0..2 {
            let call = GameCall::MakeChoice { choice_index: idx };
            chain.write_contract(LOCAL_CONTRACT, call.encode(), 0).await.unwrap();
        }

        // then
        let game = chain.game_of(LOCAL_PLAYER);
        assert!(game.active);
        assert_eq!(game.games_played, 2);
        assert_eq!(game.total_winnings, bet * 11_000 / 10_000 * 12_500 / 10_000);
    }

    #[tokio::test]
    async fn make_choice__loss_emits_event_and_ends_game() {
        // given
        let chain = chain();
        chain.force_outcomes([false]);
        chain
            .write_contract(LOCAL_CONTRACT, GameCall::EnterGame.encode(), 1_000)
            .await
            .unwrap();

        // when
        let hash = chain
            .write_contract(
                LOCAL_CONTRACT,
                GameCall::MakeChoice { choice_index: 0 }.encode(),
                0,
            )
            .await
            .unwrap();
        let receipt = chain.wait_for_receipt(hash).await.unwrap();

        // then
        let event = find_choice_made(&receipt.logs).unwrap();
        assert!(!event.won);
        assert!(!chain.game_of(LOCAL_PLAYER).active);
    }

    #[tokio::test]
    async fn enter_game__reverts_without_funds() {
        let chain = LocalChain::new(LocalChainConfig {
            starting_balance: 10,
            ..LocalChainConfig::new(747)
        });
        let err = chain
            .write_contract(LOCAL_CONTRACT, GameCall::EnterGame.encode(), 11)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Reverted(_)));
    }

    #[tokio::test]
    async fn cash_out__pays_winnings_back() {
        // given
        let chain = chain();
        chain.force_outcomes([true]);
        let start = chain.balance_of(LOCAL_PLAYER);
        chain
            .write_contract(LOCAL_CONTRACT, GameCall::EnterGame.encode(), 10_000)
            .await
            .unwrap();
        chain
            .write_contract(
                LOCAL_CONTRACT,
                GameCall::MakeChoice { choice_index: 0 }.encode(),
                0,
            )
            .await
            .unwrap();

        // when
        chain
            .write_contract(LOCAL_CONTRACT, GameCall::CashOut.encode(), 0)
            .await
            .unwrap();

        // then
        assert_eq!(chain.balance_of(LOCAL_PLAYER), start - 10_000 + 11_000);
        assert_eq!(chain.game_of(LOCAL_PLAYER).total_winnings, 0);
    }

    #[tokio::test]
    async fn switch_chain__only_to_known_chains() {
        let chain = LocalChain::new(LocalChainConfig {
            known_chains: vec![1, 747],
            ..LocalChainConfig::new(1)
        });
        assert!(chain.switch_chain(99).await.is_err());
        chain.switch_chain(747).await.unwrap();
        assert_eq!(chain.account_status().await.unwrap().chain_id, 747);
    }

    #[test]
    fn win_chance_bps__scales_with_multiplier() {
        assert_eq!(win_chance_bps(Multiplier::from_bps(20_000)), 4_850);
        assert_eq!(win_chance_bps(Multiplier::from_bps(100_000)), 970);
    }
}
