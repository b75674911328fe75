//! Game view model.
//!
//! Owns the session, the last known chain state and every in-flight marker.
//! User intents are validated here; live intents come back as
//! [`ChainRequest`]s for the controller to run, and their results are fed in
//! again as [`ChainEvent`]s. Nothing in this module awaits.

use crate::{
    abi::{
        ChoiceInfo,
        GameCall,
        RemoteGameInfo,
        find_choice_made,
    },
    amount::{
        format_ether,
        format_ether_fixed,
        parse_ether,
    },
    board::{
        Multiplier,
        Row,
        RowId,
        TileId,
        choice_index_for,
        live_rows,
    },
    chain::{
        AccountStatus,
        Address,
        ChainError,
        ChainResult,
        Receipt,
        TxHash,
    },
    contract::ContractError,
    session::{
        GameState,
        RevealOutcome,
        Session,
    },
    wallets::WalletConnector,
};
use chrono::Local;
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use std::{
    collections::HashMap,
    fmt,
};
use tracing::{
    error,
    info,
    warn,
};

pub const MAX_ERRORS: usize = 50;
pub const DEFAULT_BET: &str = "0.001";
const DEFAULT_MULTIPLIER: Multiplier = Multiplier::from_bps(11_000);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameConfig {
    pub required_chain_id: u64,
    pub contract: Address,
    /// Smallest accepted bet, in wei.
    pub min_bet: u128,
    pub currency_symbol: String,
}

impl GameConfig {
    pub fn new(required_chain_id: u64, contract: Address) -> Self {
        Self {
            required_chain_id,
            contract,
            min_bet: 1_000_000_000_000_000,
            currency_symbol: "FLOW".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum WalletStatus {
    #[default]
    Disconnected,
    Connecting {
        connector: String,
    },
    Connected(AccountStatus),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ActionKind {
    EnterGame,
    Choice,
    CashOut,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::EnterGame => "enter game",
            ActionKind::Choice => "choice",
            ActionKind::CashOut => "cash out",
        };
        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Pending {
    /// Waiting for the wallet to sign and broadcast.
    Submitting,
    Confirming(TxHash),
}

/// Work the controller runs on behalf of the view model.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChainRequest {
    Connect {
        connector: WalletConnector,
    },
    Disconnect,
    Refresh,
    Submit {
        kind: ActionKind,
        call: GameCall,
        value: u128,
    },
    AwaitReceipt {
        kind: ActionKind,
        tx_hash: TxHash,
    },
    SwitchChain {
        chain_id: u64,
    },
}

/// Account, balance and contract reads gathered by one refresh.
///
/// Reads that only make sense on the required chain are `None` elsewhere.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RemoteSnapshot {
    pub account: AccountStatus,
    pub balance: Option<u128>,
    pub game_info: Option<RemoteGameInfo>,
    pub choices: Option<Vec<ChoiceInfo>>,
    pub errors: Vec<String>,
}

#[derive(Clone, Debug)]
pub enum ChainEvent {
    Connected(ChainResult<AccountStatus>),
    Refreshed(ChainResult<RemoteSnapshot>),
    Submitted {
        kind: ActionKind,
        result: Result<TxHash, ContractError>,
    },
    Confirmed {
        kind: ActionKind,
        result: Result<Receipt, ContractError>,
    },
    ChainSwitched(ChainResult<()>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BetValidation {
    pub bet: Option<u128>,
    pub insufficient_funds: bool,
    pub can_start: bool,
    pub label: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TileFace {
    Hidden,
    Pending,
    Safe,
    Hazard,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TileView {
    pub id: TileId,
    pub face: TileFace,
    pub enabled: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RowView {
    pub id: RowId,
    pub multiplier: Multiplier,
    pub unlocked: bool,
    pub completed: bool,
    /// How many rows away from the active one; drives dimming.
    pub distance: usize,
    pub tiles: Vec<TileView>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Prompt {
    ConnectOrDemo,
    Bet {
        input: String,
        balance: String,
        validation: BetValidation,
    },
    WrongChain {
        chain_id: u64,
        required: u64,
        error: Option<String>,
    },
    None,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Overlay {
    Lost,
    CashedOut { amount: String },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WalletModalView {
    pub connectors: Vec<String>,
    pub connecting: Option<String>,
    pub already_connected: bool,
    pub error: Option<String>,
}

/// Everything the terminal needs to draw one frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameSnapshot {
    pub demo: bool,
    pub currency: String,
    pub address: Option<String>,
    pub balance: Option<String>,
    pub rows: Vec<RowView>,
    pub level: u32,
    pub score: String,
    pub completed_rounds: u64,
    pub current_multiplier: String,
    pub total_winnings: String,
    pub can_cash_out: bool,
    pub cash_out_hint: &'static str,
    pub prompt: Prompt,
    pub overlay: Option<Overlay>,
    pub wallet_modal: Option<WalletModalView>,
    pub status: String,
    pub errors: Vec<String>,
}

pub struct GameModel {
    config: GameConfig,
    rng: StdRng,
    session: Session,
    demo: bool,
    wallet: WalletStatus,
    connectors: Vec<WalletConnector>,
    wallet_modal_open: bool,
    connect_error: Option<String>,
    balance: Option<u128>,
    game_info: Option<RemoteGameInfo>,
    choices: Option<Vec<ChoiceInfo>>,
    bet_input: String,
    selected_tile: Option<TileId>,
    pending: HashMap<ActionKind, Pending>,
    cashed_out_amount: Option<String>,
    chain_switch_error: Option<String>,
    status: String,
    errors: Vec<String>,
}

impl GameModel {
    pub fn new(config: GameConfig, connectors: Vec<WalletConnector>) -> Self {
        Self::with_rng(config, connectors, StdRng::from_os_rng())
    }

    pub fn with_rng(
        config: GameConfig,
        connectors: Vec<WalletConnector>,
        mut rng: StdRng,
    ) -> Self {
        let session = Session::new(&mut rng);
        Self {
            config,
            rng,
            session,
            demo: false,
            wallet: WalletStatus::Disconnected,
            connectors,
            wallet_modal_open: false,
            connect_error: None,
            balance: None,
            game_info: None,
            choices: None,
            bet_input: DEFAULT_BET.to_string(),
            selected_tile: None,
            pending: HashMap::new(),
            cashed_out_amount: None,
            chain_switch_error: None,
            status: String::from("Connect a wallet or press d for the demo"),
            errors: Vec::new(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_demo(&self) -> bool {
        self.demo
    }

    pub fn wallet(&self) -> &WalletStatus {
        &self.wallet
    }

    pub fn account(&self) -> Option<&AccountStatus> {
        match &self.wallet {
            WalletStatus::Connected(account) => Some(account),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.account().is_some()
    }

    pub fn is_on_required_chain(&self) -> bool {
        self.account()
            .is_some_and(|account| account.chain_id == self.config.required_chain_id)
    }

    pub fn can_play(&self) -> bool {
        self.is_on_required_chain() || self.demo
    }

    pub fn balance(&self) -> Option<u128> {
        self.balance
    }

    pub fn game_info(&self) -> Option<&RemoteGameInfo> {
        self.game_info.as_ref()
    }

    pub fn has_active_game(&self) -> bool {
        self.game_info.as_ref().is_some_and(|info| info.active)
    }

    fn games_played(&self) -> u64 {
        self.game_info.as_ref().map_or(0, |info| info.games_played)
    }

    fn contract_winnings(&self) -> u128 {
        self.game_info.as_ref().map_or(0, |info| info.total_winnings)
    }

    fn has_choices(&self) -> bool {
        self.choices.as_ref().is_some_and(|choices| !choices.is_empty())
    }

    pub fn selected_tile(&self) -> Option<TileId> {
        self.selected_tile
    }

    pub fn pending(&self, kind: ActionKind) -> Option<Pending> {
        self.pending.get(&kind).copied()
    }

    pub fn bet_input(&self) -> &str {
        &self.bet_input
    }

    pub fn set_bet_input(&mut self, raw: impl Into<String>) {
        self.bet_input = raw.into();
    }

    pub fn chain_switch_error(&self) -> Option<&str> {
        self.chain_switch_error.as_deref()
    }

    pub fn connect_error(&self) -> Option<&str> {
        self.connect_error.as_deref()
    }

    pub fn cashed_out_amount(&self) -> Option<&str> {
        self.cashed_out_amount.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        info!(status = %self.status, "status");
    }

    pub fn push_errors(&mut self, items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        let stamp = Local::now().format("%H:%M:%S");
        for item in items {
            error!("{}", item);
            self.errors.push(format!("[{stamp}] {item}"));
        }
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Demo layout unless a live game is running and the contract's choices are known.
    pub fn rows(&self) -> Vec<Row> {
        if self.demo || !self.has_active_game() || !self.has_choices() {
            self.session.rows()
        } else {
            live_rows(self.games_played())
        }
    }

    pub fn row_views(&self) -> Vec<RowView> {
        let rows = self.rows();
        let last = rows.len().saturating_sub(1);
        let current = self.session.current_row_index();
        let games_played = usize::try_from(self.games_played()).unwrap_or(usize::MAX);
        let active = self.has_active_game();
        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                let (unlocked, distance) = if self.demo {
                    (index >= current, current.saturating_sub(index))
                } else if active {
                    (
                        games_played >= last - index,
                        last.saturating_sub(games_played).saturating_sub(index),
                    )
                } else {
                    (index == last, last - index)
                };
                let tiles = (0..row.tiles)
                    .map(|tile_index| {
                        let id = TileId::new(row.id, tile_index);
                        TileView {
                            id,
                            face: self.tile_face(id),
                            enabled: self.tile_enabled(id, unlocked),
                        }
                    })
                    .collect();
                RowView {
                    id: row.id,
                    multiplier: row.multiplier,
                    unlocked,
                    completed: self.session.completed_rows().contains(&row.id),
                    distance,
                    tiles,
                }
            })
            .collect()
    }

    fn tile_face(&self, tile: TileId) -> TileFace {
        if self.selected_tile == Some(tile) && self.pending(ActionKind::Choice).is_some() {
            return TileFace::Pending;
        }
        if !self.session.is_revealed(tile) {
            return TileFace::Hidden;
        }
        if self.session.is_hazard(tile) {
            TileFace::Hazard
        } else {
            TileFace::Safe
        }
    }

    fn tile_enabled(&self, tile: TileId, unlocked: bool) -> bool {
        if !self.can_play() || self.session.state() != GameState::Playing || !unlocked {
            return false;
        }
        if !self.demo && self.pending.contains_key(&ActionKind::Choice) {
            return false;
        }
        !(self.demo
            && self.session.row_has_revealed_tile(tile.row)
            && !self.session.is_revealed(tile))
    }

    /// Reveals `tile` in the demo, or asks the contract to play its row.
    pub fn click_tile(&mut self, tile: TileId) -> Option<ChainRequest> {
        if !self.can_play() || self.session.state() != GameState::Playing {
            return None;
        }

        if self.demo {
            match self.session.reveal_tile(tile, &mut self.rng) {
                RevealOutcome::Ignored => {}
                RevealOutcome::Hazard => {
                    info!(%tile, "demo hazard revealed");
                    self.set_status("Death tile! Press r to play again");
                }
                RevealOutcome::Advanced { current_row_index } => {
                    info!(%tile, current_row_index, "demo row cleared");
                    self.set_status(format!(
                        "Safe! Next row pays {}x",
                        self.session.current_multiplier()
                    ));
                }
                RevealOutcome::LevelUp { level, total_rows } => {
                    info!(%tile, level, total_rows, "demo level up");
                    self.set_status(format!("Level {level}!"));
                }
            }
            return None;
        }

        if !self.has_active_game() {
            self.set_status("No active game - start a game first");
            return None;
        }
        if self.pending.contains_key(&ActionKind::Choice) {
            return None;
        }
        let rows = self.row_views();
        let row = rows.iter().find(|row| row.id == tile.row)?;
        if !row.unlocked || usize::from(tile.index) >= row.tiles.len() {
            return None;
        }

        self.selected_tile = Some(tile);
        let Some(choice_index) = choice_index_for(row.multiplier) else {
            self.selected_tile = None;
            self.push_errors(vec![format!("Invalid multiplier: {}x", row.multiplier)]);
            return None;
        };
        self.pending.insert(ActionKind::Choice, Pending::Submitting);
        self.set_status(format!("Choosing {}x...", row.multiplier));
        Some(ChainRequest::Submit {
            kind: ActionKind::Choice,
            call: GameCall::MakeChoice {
                choice_index: u64::from(choice_index),
            },
            value: 0,
        })
    }

    pub fn bet_validation(&self) -> BetValidation {
        let starting = self.pending.contains_key(&ActionKind::EnterGame);
        let bet = parse_ether(&self.bet_input).ok();
        let (insufficient_funds, can_start) = match bet {
            Some(bet) => {
                let insufficient = bet > self.balance.unwrap_or(0);
                (
                    insufficient,
                    !starting && !insufficient && bet >= self.config.min_bet,
                )
            }
            None => (false, false),
        };
        let label = if starting {
            "Starting...".to_string()
        } else if insufficient_funds {
            format!("Insufficient {}", self.config.currency_symbol)
        } else {
            "Start Game".to_string()
        };
        BetValidation {
            bet,
            insufficient_funds,
            can_start,
            label,
        }
    }

    pub fn start_game(&mut self) -> Option<ChainRequest> {
        if self.demo || !self.is_on_required_chain() || self.has_active_game() {
            return None;
        }
        if self.pending.contains_key(&ActionKind::EnterGame) {
            return None;
        }
        let validation = self.bet_validation();
        let Some(bet) = validation.bet.filter(|_| validation.can_start) else {
            self.set_status(format!(
                "Bet must be at least {} {} and within your balance",
                format_ether(self.config.min_bet),
                self.config.currency_symbol
            ));
            return None;
        };
        self.pending.insert(ActionKind::EnterGame, Pending::Submitting);
        self.set_status(format!(
            "Starting game with {} {}...",
            format_ether(bet),
            self.config.currency_symbol
        ));
        Some(ChainRequest::Submit {
            kind: ActionKind::EnterGame,
            call: GameCall::EnterGame,
            value: bet,
        })
    }

    pub fn can_cash_out(&self) -> bool {
        if !self.can_play() || self.session.state() != GameState::Playing {
            return false;
        }
        if self.demo {
            self.session.has_winnings()
        } else {
            !self.pending.contains_key(&ActionKind::CashOut) && self.contract_winnings() > 0
        }
    }

    pub fn cash_out(&mut self) -> Option<ChainRequest> {
        if !self.can_cash_out() {
            return None;
        }
        if self.demo {
            let points = self.session.current_multiplier().points();
            self.session.cash_out();
            self.cashed_out_amount = Some(format!("+{points}"));
            self.set_status("Cashed out (demo)");
            return None;
        }
        if self.pending.contains_key(&ActionKind::CashOut) {
            return None;
        }
        // The contract zeroes winnings on payout; keep what the player saw.
        let amount = format_ether(self.contract_winnings());
        self.cashed_out_amount = Some(format!("{amount} {}", self.config.currency_symbol));
        self.pending.insert(ActionKind::CashOut, Pending::Submitting);
        self.set_status("Cashing out...");
        Some(ChainRequest::Submit {
            kind: ActionKind::CashOut,
            call: GameCall::CashOut,
            value: 0,
        })
    }

    pub fn dismiss_cash_out(&mut self) -> Option<ChainRequest> {
        if self.session.state() != GameState::CashedOut {
            return None;
        }
        self.cashed_out_amount = None;
        if self.demo {
            self.session.initialize(&mut self.rng);
            return None;
        }
        self.session.dismiss_cash_out();
        Some(ChainRequest::Refresh)
    }

    pub fn play_again(&mut self) -> Option<ChainRequest> {
        if self.session.state() != GameState::Lost {
            return None;
        }
        self.session.initialize(&mut self.rng);
        self.selected_tile = None;
        self.set_status("New board");
        (!self.demo && self.is_connected()).then_some(ChainRequest::Refresh)
    }

    pub fn enter_demo(&mut self) {
        if self.demo {
            return;
        }
        self.demo = true;
        self.selected_tile = None;
        self.set_status("Demo mode: nothing is sent to the chain");
    }

    pub fn exit_demo(&mut self) {
        if !self.demo {
            return;
        }
        self.demo = false;
        self.cashed_out_amount = None;
        self.session.initialize(&mut self.rng);
        self.set_status("Left demo mode");
    }

    pub fn toggle_demo(&mut self) {
        if self.demo {
            self.exit_demo();
        } else {
            self.enter_demo();
        }
    }

    pub fn switch_chain(&mut self) -> Option<ChainRequest> {
        if !self.is_connected() || self.is_on_required_chain() {
            return None;
        }
        self.chain_switch_error = None;
        let chain_id = self.config.required_chain_id;
        self.set_status(format!("Asking wallet to switch to chain {chain_id}..."));
        Some(ChainRequest::SwitchChain { chain_id })
    }

    pub fn open_wallet_modal(&mut self) {
        self.wallet_modal_open = true;
    }

    pub fn close_wallet_modal(&mut self) {
        self.wallet_modal_open = false;
    }

    pub fn is_wallet_modal_open(&self) -> bool {
        self.wallet_modal_open
    }

    pub fn connectors(&self) -> &[WalletConnector] {
        &self.connectors
    }

    pub fn connect(&mut self, index: usize) -> Option<ChainRequest> {
        if !matches!(self.wallet, WalletStatus::Disconnected) {
            return None;
        }
        let connector = self.connectors.get(index)?.clone();
        self.connect_error = None;
        self.wallet = WalletStatus::Connecting {
            connector: connector.name.clone(),
        };
        self.set_status(format!("Connecting to {}...", connector.name));
        Some(ChainRequest::Connect { connector })
    }

    pub fn disconnect(&mut self) -> Option<ChainRequest> {
        if matches!(self.wallet, WalletStatus::Disconnected) {
            return None;
        }
        self.wallet = WalletStatus::Disconnected;
        self.clear_remote();
        self.set_status("Wallet disconnected");
        Some(ChainRequest::Disconnect)
    }

    fn clear_remote(&mut self) {
        self.balance = None;
        self.game_info = None;
        self.choices = None;
        self.pending.clear();
        self.selected_tile = None;
        self.chain_switch_error = None;
    }

    /// Folds a finished chain call into the model; returns follow-up work.
    pub fn apply(&mut self, event: ChainEvent) -> Vec<ChainRequest> {
        match event {
            ChainEvent::Connected(result) => self.on_connected(result),
            ChainEvent::Refreshed(result) => {
                self.on_refreshed(result);
                Vec::new()
            }
            ChainEvent::Submitted { kind, result } => self.on_submitted(kind, result),
            ChainEvent::Confirmed { kind, result } => self.on_confirmed(kind, result),
            ChainEvent::ChainSwitched(result) => self.on_chain_switched(result),
        }
    }

    fn on_connected(&mut self, result: ChainResult<AccountStatus>) -> Vec<ChainRequest> {
        if !matches!(self.wallet, WalletStatus::Connecting { .. }) {
            return Vec::new();
        }
        match result {
            Ok(account) => {
                info!(address = %account.address, chain_id = account.chain_id, "wallet connected");
                self.set_status(format!("Connected {}", account.address.short()));
                self.wallet = WalletStatus::Connected(account);
                self.wallet_modal_open = false;
                self.connect_error = None;
                vec![ChainRequest::Refresh]
            }
            Err(e) => {
                warn!(error = %e, "wallet connection failed");
                self.wallet = WalletStatus::Disconnected;
                self.connect_error = Some(e.to_string());
                self.set_status("Connection failed");
                Vec::new()
            }
        }
    }

    fn on_refreshed(&mut self, result: ChainResult<RemoteSnapshot>) {
        if !self.is_connected() {
            return;
        }
        match result {
            Ok(snapshot) => {
                let RemoteSnapshot {
                    account,
                    balance,
                    game_info,
                    choices,
                    errors,
                } = snapshot;
                if account.chain_id == self.config.required_chain_id {
                    self.chain_switch_error = None;
                }
                self.wallet = WalletStatus::Connected(account);
                self.balance = balance;
                self.game_info = game_info;
                if choices.is_some() {
                    self.choices = choices;
                }
                self.push_errors(errors);
            }
            Err(ChainError::NotConnected) => {
                warn!("wallet no longer exposes an account");
                self.wallet = WalletStatus::Disconnected;
                self.clear_remote();
                self.set_status("Wallet disconnected");
            }
            Err(e) => self.push_errors(vec![format!("Refresh failed: {e}")]),
        }
    }

    fn on_submitted(
        &mut self,
        kind: ActionKind,
        result: Result<TxHash, ContractError>,
    ) -> Vec<ChainRequest> {
        match result {
            Ok(tx_hash) => {
                info!(%kind, %tx_hash, "transaction submitted");
                self.pending.insert(kind, Pending::Confirming(tx_hash));
                self.set_status(format!("Waiting for {kind} confirmation..."));
                vec![ChainRequest::AwaitReceipt { kind, tx_hash }]
            }
            Err(e) => {
                self.fail_action(kind, format!("Failed to submit {kind}: {e}"));
                Vec::new()
            }
        }
    }

    fn on_confirmed(
        &mut self,
        kind: ActionKind,
        result: Result<Receipt, ContractError>,
    ) -> Vec<ChainRequest> {
        let receipt = match result {
            Ok(receipt) => receipt,
            Err(e) => {
                self.fail_action(kind, format!("{kind} was not confirmed: {e}"));
                return Vec::new();
            }
        };
        self.pending.remove(&kind);
        if !receipt.success {
            warn!(%kind, tx_hash = %receipt.tx_hash, "transaction reverted");
            if kind == ActionKind::Choice {
                self.selected_tile = None;
            }
            if kind == ActionKind::CashOut {
                self.cashed_out_amount = None;
            }
            self.push_errors(vec![format!("{kind} transaction reverted")]);
            return vec![ChainRequest::Refresh];
        }

        match kind {
            ActionKind::EnterGame => {
                self.set_status("Game started! Pick a tile in the bottom row");
            }
            ActionKind::Choice => {
                match find_choice_made(&receipt.logs) {
                    Some(choice) if !choice.won => {
                        info!(choice_index = choice.choice_index, demo = self.demo, "choice lost");
                        // The demo board has its own hazards; a live loss only ends the live run.
                        if !self.demo {
                            self.session.mark_lost();
                            self.set_status("Death tile! Press r to play again");
                        }
                    }
                    Some(choice) => {
                        info!(
                            choice_index = choice.choice_index,
                            winnings = %format_ether(choice.winnings),
                            "choice won"
                        );
                        self.set_status(format!(
                            "Safe! Winnings {} {}",
                            format_ether(choice.winnings),
                            self.config.currency_symbol
                        ));
                    }
                    None => {
                        warn!(tx_hash = %receipt.tx_hash, "no ChoiceMade event in receipt");
                    }
                }
                self.selected_tile = None;
            }
            ActionKind::CashOut if self.demo => {
                info!("live cash out confirmed while in demo");
                self.cashed_out_amount = None;
            }
            ActionKind::CashOut => {
                self.session.cash_out();
                self.set_status("Cashed out!");
            }
        }
        vec![ChainRequest::Refresh]
    }

    fn fail_action(&mut self, kind: ActionKind, message: String) {
        self.pending.remove(&kind);
        match kind {
            ActionKind::Choice => self.selected_tile = None,
            ActionKind::CashOut => self.cashed_out_amount = None,
            ActionKind::EnterGame => {}
        }
        self.push_errors(vec![message]);
    }

    fn on_chain_switched(&mut self, result: ChainResult<()>) -> Vec<ChainRequest> {
        match result {
            Ok(()) => {
                self.chain_switch_error = None;
                vec![ChainRequest::Refresh]
            }
            Err(e) => {
                warn!(error = %e, "chain switch failed");
                self.chain_switch_error = Some(format!(
                    "Failed to switch chain. You may need to add chain {} to your wallet manually.",
                    self.config.required_chain_id
                ));
                Vec::new()
            }
        }
    }

    pub fn current_multiplier(&self) -> Multiplier {
        if self.demo {
            return self.session.current_multiplier();
        }
        match &self.choices {
            Some(choices) if self.has_active_game() && !choices.is_empty() => {
                let index = usize::try_from(self.games_played())
                    .unwrap_or(usize::MAX)
                    .min(6);
                choices
                    .get(index)
                    .map_or(DEFAULT_MULTIPLIER, |choice| choice.multiplier)
            }
            _ => DEFAULT_MULTIPLIER,
        }
    }

    pub fn completed_rounds(&self) -> u64 {
        if self.demo {
            self.session.completed_rows().len() as u64
        } else {
            self.games_played()
        }
    }

    pub fn display_winnings(&self) -> String {
        format_ether(self.contract_winnings())
    }

    fn prompt(&self) -> Prompt {
        if self.demo {
            return Prompt::None;
        }
        match self.account() {
            None => Prompt::ConnectOrDemo,
            Some(account) if account.chain_id != self.config.required_chain_id => {
                Prompt::WrongChain {
                    chain_id: account.chain_id,
                    required: self.config.required_chain_id,
                    error: self.chain_switch_error.clone(),
                }
            }
            Some(_) if !self.has_active_game() => Prompt::Bet {
                input: self.bet_input.clone(),
                balance: format!(
                    "{} {}",
                    format_ether_fixed(self.balance.unwrap_or(0), 4),
                    self.config.currency_symbol
                ),
                validation: self.bet_validation(),
            },
            Some(_) => Prompt::None,
        }
    }

    fn overlay(&self) -> Option<Overlay> {
        match self.session.state() {
            GameState::Lost => Some(Overlay::Lost),
            GameState::CashedOut => Some(Overlay::CashedOut {
                amount: self.cashed_out_amount.clone().unwrap_or_default(),
            }),
            GameState::Playing => None,
        }
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let currency = self.config.currency_symbol.clone();
        let balance = if self.is_on_required_chain() {
            Some(match self.balance {
                Some(wei) => format!("{} {currency}", format_ether_fixed(wei, 4)),
                None => "Loading...".to_string(),
            })
        } else {
            None
        };
        let total_winnings = if self.demo {
            format!("+{}", self.session.current_multiplier().points())
        } else {
            format!("{} {currency}", self.display_winnings())
        };
        let wallet_modal = self.wallet_modal_open.then(|| WalletModalView {
            connectors: self.connectors.iter().map(|c| c.name.clone()).collect(),
            connecting: match &self.wallet {
                WalletStatus::Connecting { connector } => Some(connector.clone()),
                _ => None,
            },
            already_connected: self.is_connected(),
            error: self.connect_error.clone(),
        });
        GameSnapshot {
            demo: self.demo,
            currency: currency.clone(),
            address: self.account().map(|account| account.address.short()),
            balance,
            rows: self.row_views(),
            level: self.session.level(),
            score: format!("{} {currency}", self.display_winnings()),
            completed_rounds: self.completed_rounds(),
            current_multiplier: format!("{}x", self.current_multiplier()),
            total_winnings,
            can_cash_out: self.can_cash_out(),
            cash_out_hint: if self.demo {
                "Playing in demo mode!"
            } else {
                "Secure your winnings or keep climbing!"
            },
            prompt: self.prompt(),
            overlay: self.overlay(),
            wallet_modal,
            status: self.status.clone(),
            errors: self.errors.clone(),
        }
    }
}
