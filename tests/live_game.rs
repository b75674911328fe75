#![allow(non_snake_case)]
use flowfun_party::{
    amount::WEI_PER_ETHER,
    board::TileId,
    client::{
        AppController,
        settle,
    },
    game::{
        ActionKind,
        GameConfig,
        GameModel,
        Overlay,
        Prompt,
    },
    local::{
        LOCAL_CONTRACT,
        LOCAL_PLAYER,
        LocalChain,
        LocalChainConfig,
    },
    session::GameState,
    ui::UserEvent,
    wallets::{
        WalletConnector,
        WalletConnectors,
    },
};
use rand::{
    SeedableRng,
    rngs::StdRng,
};
use std::{
    sync::Arc,
    time::Duration,
};

const CHAIN: u64 = 747;

async fn connected_controller(local: LocalChainConfig) -> AppController {
    let connectors = vec![WalletConnector::local("Local Simulator")];
    let model = GameModel::with_rng(
        GameConfig::new(CHAIN, LOCAL_CONTRACT),
        connectors.clone(),
        StdRng::seed_from_u64(3),
    );
    let chain = Arc::new(LocalChain::new(local));
    let mut controller = AppController::with_model(
        model,
        WalletConnectors::new(connectors, chain),
        Duration::from_secs(4),
    );
    let tasks = controller.startup(false, true);
    settle(&mut controller, tasks).await;
    controller
}

async fn started(bet: &str) -> AppController {
    let mut controller = connected_controller(LocalChainConfig::new(CHAIN)).await;
    controller.handle(UserEvent::SetBet(bet.to_string()));
    let tasks = controller.handle(UserEvent::StartGame);
    settle(&mut controller, tasks).await;
    controller
}

fn bottom_tile(controller: &AppController) -> TileId {
    controller
        .model
        .row_views()
        .iter()
        .rev()
        .find(|row| row.unlocked)
        .map(|row| row.tiles[0].id)
        .unwrap()
}

async fn choose(controller: &mut AppController, won: bool) {
    controller.local_chain().force_outcomes([won]);
    let tile = bottom_tile(controller);
    let tasks = controller.handle(UserEvent::RevealTile(tile));
    settle(controller, tasks).await;
}

#[tokio::test]
async fn start_game__debits_bet_and_shows_live_board() {
    // when
    let controller = started("1").await;

    // then
    let model = &controller.model;
    assert!(model.has_active_game());
    assert_eq!(model.balance(), Some(9 * WEI_PER_ETHER));
    assert_eq!(model.snapshot().prompt, Prompt::None);
    assert_eq!(model.row_views().len(), 3);
    assert_eq!(model.row_views().iter().filter(|row| row.unlocked).count(), 1);
}

#[tokio::test]
async fn choice__won_event_advances_the_window() {
    // given
    let mut controller = started("1").await;

    // when
    choose(&mut controller, true).await;

    // then
    let game = controller.local_chain().game_of(LOCAL_PLAYER);
    assert_eq!(game.games_played, 1);
    assert_eq!(controller.model.completed_rounds(), 1);
    assert_eq!(controller.model.session().state(), GameState::Playing);
    assert_eq!(controller.model.pending(ActionKind::Choice), None);
    assert!(controller.model.can_cash_out());
}

#[tokio::test]
async fn choice__lost_event_shows_death_tile() {
    // given
    let mut controller = started("0.5").await;

    // when
    choose(&mut controller, false).await;

    // then
    assert_eq!(controller.model.session().state(), GameState::Lost);
    assert_eq!(controller.model.snapshot().overlay, Some(Overlay::Lost));
    assert!(!controller.model.has_active_game());

    // when
    let tasks = controller.handle(UserEvent::PlayAgain);
    settle(&mut controller, tasks).await;

    // then
    assert_eq!(controller.model.session().state(), GameState::Playing);
    assert!(matches!(controller.model.snapshot().prompt, Prompt::Bet { .. }));
}

#[tokio::test]
async fn cash_out__overlay_keeps_amount_after_contract_zeroes_it() {
    // given
    let mut controller = started("1").await;
    choose(&mut controller, true).await;
    let winnings = controller.local_chain().game_of(LOCAL_PLAYER).total_winnings;
    let expected = format!("{} FLOW", flowfun_party::amount::format_ether(winnings));

    // when
    let tasks = controller.handle(UserEvent::CashOut);
    settle(&mut controller, tasks).await;

    // then
    assert_eq!(controller.local_chain().game_of(LOCAL_PLAYER).total_winnings, 0);
    assert_eq!(
        controller.model.snapshot().overlay,
        Some(Overlay::CashedOut { amount: expected })
    );
    assert_eq!(controller.model.balance(), Some(9 * WEI_PER_ETHER + winnings));

    // when
    let tasks = controller.handle(UserEvent::DismissCashOut);
    settle(&mut controller, tasks).await;

    // then
    assert_eq!(controller.model.snapshot().overlay, None);
    assert!(!controller.model.has_active_game());
}

#[tokio::test]
async fn start_game__rejected_signature_clears_pending() {
    // given
    let mut controller = connected_controller(LocalChainConfig::new(CHAIN)).await;
    controller.local_chain().reject_next_write();

    // when
    controller.handle(UserEvent::SetBet("0.01".into()));
    let tasks = controller.handle(UserEvent::StartGame);
    settle(&mut controller, tasks).await;

    // then
    assert_eq!(controller.model.pending(ActionKind::EnterGame), None);
    assert!(!controller.model.has_active_game());
    assert!(
        controller
            .model
            .errors()
            .iter()
            .any(|e| e.contains("rejected"))
    );
    assert_eq!(controller.local_chain().balance_of(LOCAL_PLAYER), 10 * WEI_PER_ETHER);
}

#[tokio::test]
async fn start_game__bet_above_balance_is_not_sent() {
    // given
    let mut controller = connected_controller(LocalChainConfig::new(CHAIN)).await;

    // when
    controller.handle(UserEvent::SetBet("11".into()));
    let tasks = controller.handle(UserEvent::StartGame);

    // then
    assert!(tasks.is_empty());
    assert!(controller.model.bet_validation().insufficient_funds);
}

#[tokio::test]
async fn switch_chain__wrong_chain_then_switch_restores_play() {
    // given
    let mut local = LocalChainConfig::new(CHAIN);
    local.known_chains.push(1);
    let mut controller = connected_controller(local).await;
    controller.local_chain().set_chain_id(1);
    let tasks = controller.dispatch(flowfun_party::game::ChainRequest::Refresh);
    settle(&mut controller, tasks.into_iter().collect()).await;
    assert!(matches!(
        controller.model.snapshot().prompt,
        Prompt::WrongChain { chain_id: 1, .. }
    ));
    assert_eq!(controller.model.balance(), None);

    // when
    let tasks = controller.handle(UserEvent::SwitchChain);
    settle(&mut controller, tasks).await;

    // then
    assert!(controller.model.is_on_required_chain());
    assert!(matches!(controller.model.snapshot().prompt, Prompt::Bet { .. }));
}

#[tokio::test]
async fn switch_chain__failure_shows_manual_hint() {
    // given
    let mut local = LocalChainConfig::new(CHAIN);
    local.known_chains.push(1);
    let mut controller = connected_controller(local).await;
    controller.local_chain().set_chain_id(1);
    let tasks = controller.dispatch(flowfun_party::game::ChainRequest::Refresh);
    settle(&mut controller, tasks.into_iter().collect()).await;
    controller.local_chain().fail_next_switch();

    // when
    let tasks = controller.handle(UserEvent::SwitchChain);
    settle(&mut controller, tasks).await;

    // then
    let error = controller.model.chain_switch_error().unwrap();
    assert!(error.contains("add chain 747"));
    assert!(!controller.model.is_on_required_chain());
}
