use crate::{
    chain::{
        ChainClient,
        ChainError,
        ChainResult,
    },
    contract::GameContract,
    game::{
        ActionKind,
        ChainEvent,
        ChainRequest,
        GameConfig,
        GameModel,
        RemoteSnapshot,
    },
    local::{
        LocalChain,
        LocalChainConfig,
    },
    ui,
    wallets::{
        ConnectorKind,
        WalletConnector,
        WalletConnectors,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use futures::{
    FutureExt,
    StreamExt,
    future::{
        self,
        BoxFuture,
    },
    stream::FuturesUnordered,
};
use std::{
    sync::Arc,
    time::Duration,
};
use tokio::time;
use tracing::{
    info,
    warn,
};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub game: GameConfig,
    /// Connectors offered in the wallet modal, already filtered by the allow-list.
    pub connectors: Vec<WalletConnector>,
    pub local: LocalChainConfig,
    pub refresh_interval: Duration,
    pub start_in_demo: bool,
    pub auto_connect_local: bool,
}

/// Outcome of one chain call, ready to be folded into the model.
pub struct Completion {
    event: ChainEvent,
    contract: Option<GameContract>,
    refresh_seq: Option<u64>,
}

pub type ChainTask = BoxFuture<'static, Completion>;

pub struct AppController {
    pub model: GameModel,
    wallets: WalletConnectors,
    contract: Option<GameContract>,
    refresh_interval: Duration,
    next_refresh_seq: u64,
    applied_refresh_seq: u64,
}

impl AppController {
    pub fn new(config: AppConfig) -> Self {
        let local = Arc::new(LocalChain::new(config.local));
        Self::with_model(
            GameModel::new(config.game, config.connectors.clone()),
            WalletConnectors::new(config.connectors, local),
            config.refresh_interval,
        )
    }

    pub fn with_model(
        model: GameModel,
        wallets: WalletConnectors,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            model,
            wallets,
            contract: None,
            refresh_interval,
            next_refresh_seq: 0,
            applied_refresh_seq: 0,
        }
    }

    pub fn contract(&self) -> Option<&GameContract> {
        self.contract.as_ref()
    }

    pub fn local_chain(&self) -> &Arc<LocalChain> {
        self.wallets.local_chain()
    }

    pub fn poll_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Work to kick off before the first frame.
    pub fn startup(&mut self, start_in_demo: bool, auto_connect_local: bool) -> Vec<ChainTask> {
        if start_in_demo {
            self.model.enter_demo();
        }
        if !auto_connect_local {
            return Vec::new();
        }
        let local = self
            .wallets
            .offered()
            .iter()
            .position(|c| c.kind == ConnectorKind::Local);
        match local.and_then(|index| self.model.connect(index)) {
            Some(request) => self.dispatch(request).into_iter().collect(),
            None => {
                warn!("no local connector offered; starting disconnected");
                Vec::new()
            }
        }
    }

    pub fn handle(&mut self, event: ui::UserEvent) -> Vec<ChainTask> {
        use ui::UserEvent;
        let request = match event {
            UserEvent::Quit | UserEvent::Redraw => None,
            UserEvent::OpenWalletModal => {
                self.model.open_wallet_modal();
                None
            }
            UserEvent::CloseWalletModal => {
                self.model.close_wallet_modal();
                None
            }
            UserEvent::Connect(index) => self.model.connect(index),
            UserEvent::Disconnect => self.model.disconnect(),
            UserEvent::ToggleDemo => {
                self.model.toggle_demo();
                None
            }
            UserEvent::SetBet(bet) => {
                self.model.set_bet_input(bet);
                None
            }
            UserEvent::StartGame => self.model.start_game(),
            UserEvent::RevealTile(tile) => self.model.click_tile(tile),
            UserEvent::CashOut => self.model.cash_out(),
            UserEvent::DismissCashOut => self.model.dismiss_cash_out(),
            UserEvent::PlayAgain => self.model.play_again(),
            UserEvent::SwitchChain => self.model.switch_chain(),
            UserEvent::ClearErrors => {
                self.model.clear_errors();
                None
            }
        };
        request.and_then(|r| self.dispatch(r)).into_iter().collect()
    }

    /// Turns a request into a future; `None` when nothing needs to run.
    pub fn dispatch(&mut self, request: ChainRequest) -> Option<ChainTask> {
        match request {
            ChainRequest::Connect { connector } => Some(self.connect(&connector)),
            ChainRequest::Disconnect => {
                info!("dropping wallet client");
                self.contract = None;
                None
            }
            ChainRequest::Refresh => {
                let contract = self.contract.clone()?;
                self.next_refresh_seq += 1;
                let seq = self.next_refresh_seq;
                let required = self.model.config().required_chain_id;
                Some(
                    async move {
                        let result = fetch_remote(&contract, required).await;
                        Completion {
                            event: ChainEvent::Refreshed(result),
                            contract: None,
                            refresh_seq: Some(seq),
                        }
                    }
                    .boxed(),
                )
            }
            ChainRequest::Submit { kind, call, value } => {
                let Some(contract) = self.contract.clone() else {
                    return Some(not_connected(kind));
                };
                Some(
                    async move {
                        let result = contract.submit(&call, value).await;
                        completion(ChainEvent::Submitted { kind, result })
                    }
                    .boxed(),
                )
            }
            ChainRequest::AwaitReceipt { kind, tx_hash } => {
                let Some(contract) = self.contract.clone() else {
                    return Some(not_connected(kind));
                };
                Some(
                    async move {
                        let result = contract.wait(tx_hash).await;
                        completion(ChainEvent::Confirmed { kind, result })
                    }
                    .boxed(),
                )
            }
            ChainRequest::SwitchChain { chain_id } => {
                let Some(contract) = self.contract.clone() else {
                    return Some(
                        future::ready(completion(ChainEvent::ChainSwitched(Err(
                            ChainError::NotConnected,
                        ))))
                        .boxed(),
                    );
                };
                Some(
                    async move {
                        let result = contract.client().switch_chain(chain_id).await;
                        completion(ChainEvent::ChainSwitched(result))
                    }
                    .boxed(),
                )
            }
        }
    }

    fn connect(&mut self, connector: &WalletConnector) -> ChainTask {
        let contract_address = self.model.config().contract;
        match self.wallets.open(connector) {
            Ok(client) => {
                let contract = GameContract::new(client, contract_address);
                async move {
                    let result = contract.client().account_status().await;
                    let contract = result.is_ok().then_some(contract);
                    Completion {
                        event: ChainEvent::Connected(result),
                        contract,
                        refresh_seq: None,
                    }
                }
                .boxed()
            }
            Err(e) => future::ready(completion(ChainEvent::Connected(Err(e)))).boxed(),
        }
    }

    /// Applies a finished call and starts whatever it asks for next.
    pub fn complete(&mut self, done: Completion) -> Vec<ChainTask> {
        let Completion {
            event,
            contract,
            refresh_seq,
        } = done;
        if let Some(seq) = refresh_seq {
            if seq < self.applied_refresh_seq || self.contract.is_none() {
                return Vec::new();
            }
            self.applied_refresh_seq = seq;
        }
        if let Some(contract) = contract {
            self.contract = Some(contract);
        }
        let follow_ups = self.model.apply(event);
        if !self.model.is_connected() && self.contract.is_some() {
            self.contract = None;
        }
        follow_ups
            .into_iter()
            .filter_map(|request| self.dispatch(request))
            .collect()
    }
}

fn completion(event: ChainEvent) -> Completion {
    Completion {
        event,
        contract: None,
        refresh_seq: None,
    }
}

fn not_connected(kind: ActionKind) -> ChainTask {
    let event = ChainEvent::Submitted {
        kind,
        result: Err(ChainError::NotConnected.into()),
    };
    future::ready(completion(event)).boxed()
}

/// Account status, then balance and contract reads when on `required_chain_id`.
pub async fn fetch_remote(
    contract: &GameContract,
    required_chain_id: u64,
) -> ChainResult<RemoteSnapshot> {
    let client: &Arc<dyn ChainClient> = contract.client();
    let account = client.account_status().await?;
    let mut snapshot = RemoteSnapshot {
        account: account.clone(),
        balance: None,
        game_info: None,
        choices: None,
        errors: Vec::new(),
    };
    if account.chain_id != required_chain_id {
        return Ok(snapshot);
    }

    let (balance, game_info, choices) = futures::join!(
        client.balance(account.address, required_chain_id),
        contract.get_game_info(account.address),
        contract.get_choices(),
    );
    match balance {
        Ok(balance) => snapshot.balance = Some(balance),
        Err(e) => snapshot.errors.push(format!("Balance unavailable: {e}")),
    }
    match game_info {
        Ok(info) => snapshot.game_info = Some(info),
        Err(e) => snapshot.errors.push(format!("getGameInfo failed: {e}")),
    }
    match choices {
        Ok(choices) => snapshot.choices = Some(choices),
        Err(e) => snapshot.errors.push(format!("getChoices failed: {e}")),
    }
    Ok(snapshot)
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let (start_in_demo, auto_connect_local) = (config.start_in_demo, config.auto_connect_local);
    let mut controller = AppController::new(config);
    let startup = controller.startup(start_in_demo, auto_connect_local);
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    info!("UI ready");
    let res = run_loop(controller, startup, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop(
    mut controller: AppController,
    startup: Vec<ChainTask>,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    info!("Running app loop");
    let mut tasks: FuturesUnordered<ChainTask> = startup.into_iter().collect();
    let mut ticker = time::interval(controller.poll_interval());

    loop {
        ui::draw(ui_state, &controller.model.snapshot()).wrap_err("draw failed")?;
        tokio::select! {
            Some(done) = tasks.next(), if !tasks.is_empty() => {
                tasks.extend(controller.complete(done));
            }
            _ = ticker.tick() => {
                tasks.extend(controller.dispatch(ChainRequest::Refresh));
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                if ev == ui::UserEvent::Quit {
                    break;
                }
                tasks.extend(controller.handle(ev));
            }
        }
    }
    info!(in_flight = tasks.len(), "leaving app loop");
    Ok(())
}

/// Drives every in-flight task to completion without a terminal.
pub async fn settle(controller: &mut AppController, tasks: Vec<ChainTask>) {
    let mut tasks: FuturesUnordered<ChainTask> = tasks.into_iter().collect();
    while let Some(done) = tasks.next().await {
        tasks.extend(controller.complete(done));
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        amount::WEI_PER_ETHER,
        local::{
            LOCAL_CONTRACT,
            LOCAL_PLAYER,
        },
        session::GameState,
        ui::UserEvent,
    };
    use rand::{
        SeedableRng,
        rngs::StdRng,
    };

    const CHAIN: u64 = 747;

    fn controller(local: LocalChainConfig) -> AppController {
        let connectors = vec![WalletConnector::local("Local Simulator")];
        let model = GameModel::with_rng(
            GameConfig::new(CHAIN, LOCAL_CONTRACT),
            connectors.clone(),
            StdRng::seed_from_u64(11),
        );
        let chain = Arc::new(LocalChain::new(local));
        AppController::with_model(
            model,
            WalletConnectors::new(connectors, chain),
            Duration::from_secs(4),
        )
    }

    #[tokio::test]
    async fn startup__auto_connect_loads_remote_state() {
        // given
        let mut controller = controller(LocalChainConfig::new(CHAIN));

        // when
        let tasks = controller.startup(false, true);
        settle(&mut controller, tasks).await;

        // then
        assert!(controller.model.is_on_required_chain());
        assert_eq!(controller.model.balance(), Some(10 * WEI_PER_ETHER));
        assert!(controller.model.game_info().is_some());
        assert!(controller.contract().is_some());
    }

    #[tokio::test]
    async fn handle__start_game_round_trip_activates_game() {
        // given
        let mut controller = controller(LocalChainConfig::new(CHAIN));
        let tasks = controller.startup(false, true);
        settle(&mut controller, tasks).await;

        // when
        controller.handle(UserEvent::SetBet("0.5".into()));
        let tasks = controller.handle(UserEvent::StartGame);
        settle(&mut controller, tasks).await;

        // then
        assert!(controller.model.has_active_game());
        assert_eq!(controller.model.pending(ActionKind::EnterGame), None);
        assert_eq!(controller.local_chain().game_of(LOCAL_PLAYER).bet, WEI_PER_ETHER / 2);
    }

    #[tokio::test]
    async fn dispatch__refresh_without_client_is_skipped() {
        let mut controller = controller(LocalChainConfig::new(CHAIN));
        assert!(controller.dispatch(ChainRequest::Refresh).is_none());
    }

    #[tokio::test]
    async fn complete__stale_refresh_is_dropped() {
        // given
        let mut controller = controller(LocalChainConfig::new(CHAIN));
        let tasks = controller.startup(false, true);
        settle(&mut controller, tasks).await;
        let stale = controller.dispatch(ChainRequest::Refresh).unwrap();
        let fresh = controller.dispatch(ChainRequest::Refresh).unwrap();

        // when
        settle(&mut controller, vec![fresh]).await;
        controller.local_chain().set_chain_id(1);
        let follow_ups = controller.complete(stale.await);

        // then
        assert!(follow_ups.is_empty());
        assert!(controller.model.is_on_required_chain());
    }

    #[tokio::test]
    async fn handle__disconnect_drops_client() {
        let mut controller = controller(LocalChainConfig::new(CHAIN));
        let tasks = controller.startup(false, true);
        settle(&mut controller, tasks).await;

        assert!(controller.handle(UserEvent::Disconnect).is_empty());

        assert!(controller.contract().is_none());
        assert!(!controller.model.is_connected());
        assert_eq!(controller.model.session().state(), GameState::Playing);
    }
}
