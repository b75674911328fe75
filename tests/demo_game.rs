#![allow(non_snake_case)]
use flowfun_party::{
    board::TileId,
    chain::Address,
    game::{
        GameConfig,
        GameModel,
        Overlay,
        Prompt,
    },
    session::{
        GameState,
        ROWS_PER_LEVEL_UP,
    },
    wallets::WalletConnector,
};
use rand::{
    SeedableRng,
    rngs::StdRng,
};

fn demo_model(seed: u64) -> GameModel {
    let mut model = GameModel::with_rng(
        GameConfig::new(747, Address([0xf1; 20])),
        vec![WalletConnector::local("Local Simulator")],
        StdRng::seed_from_u64(seed),
    );
    model.enter_demo();
    model
}

fn safe_tile(model: &GameModel) -> TileId {
    let row = model.session().current_row();
    (0..row.tiles)
        .map(|index| TileId::new(row.id, index))
        .find(|tile| !model.session().is_hazard(*tile))
        .unwrap()
}

fn hazard_tile(model: &GameModel) -> TileId {
    let row = model.session().current_row();
    (0..row.tiles)
        .map(|index| TileId::new(row.id, index))
        .find(|tile| model.session().is_hazard(*tile))
        .unwrap()
}

#[test]
fn demo__plays_without_a_wallet() {
    // given
    let mut model = demo_model(1);
    assert_eq!(model.snapshot().prompt, Prompt::None);

    // when
    let request = model.click_tile(safe_tile(&model));

    // then
    assert!(request.is_none());
    assert_eq!(model.session().completed_rows().len(), 1);
    assert_eq!(model.completed_rounds(), 1);
    assert!(model.can_cash_out());
}

#[test]
fn demo__climbing_every_row_levels_up() {
    // given
    let mut model = demo_model(2);
    let rows = model.session().total_rows();

    // when
    for _ in 0..rows {
        model.click_tile(safe_tile(&model));
    }

    // then
    assert_eq!(model.session().level(), 2);
    assert_eq!(model.session().total_rows(), rows + ROWS_PER_LEVEL_UP);
    assert_eq!(model.session().state(), GameState::Playing);
}

#[test]
fn demo__hazard_ends_the_run_until_play_again() {
    // given
    let mut model = demo_model(3);
    model.click_tile(safe_tile(&model));

    // when
    model.click_tile(hazard_tile(&model));

    // then
    assert_eq!(model.snapshot().overlay, Some(Overlay::Lost));
    assert!(!model.can_cash_out());
    assert!(model.click_tile(safe_tile(&model)).is_none());

    // when
    let request = model.play_again();

    // then
    assert!(request.is_none());
    assert_eq!(model.session().state(), GameState::Playing);
    assert!(model.session().completed_rows().is_empty());
}

#[test]
fn demo__cash_out_shows_points_then_resets() {
    // given
    let mut model = demo_model(4);
    model.click_tile(safe_tile(&model));
    model.click_tile(safe_tile(&model));
    let points = model.current_multiplier().points();

    // when
    model.cash_out();

    // then
    assert_eq!(
        model.snapshot().overlay,
        Some(Overlay::CashedOut {
            amount: format!("+{points}")
        })
    );

    // when
    model.dismiss_cash_out();

    // then
    assert_eq!(model.snapshot().overlay, None);
    assert!(model.session().completed_rows().is_empty());
    assert_eq!(model.session().level(), 1);
}

#[test]
fn demo__leaving_resets_the_board_and_prompts_connect() {
    // given
    let mut model = demo_model(5);
    model.click_tile(safe_tile(&model));

    // when
    model.toggle_demo();

    // then
    assert!(!model.is_demo());
    assert!(model.session().completed_rows().is_empty());
    assert_eq!(model.snapshot().prompt, Prompt::ConnectOrDemo);
}
