use crate::{
    board::TileId,
    game::{
        GameSnapshot,
        Overlay,
        Prompt,
        RowView,
        TileFace,
        WalletModalView,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        self,
        Event,
        KeyCode,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

const TILE_HIDDEN: &str = " ";
const TILE_PENDING: &str = "…";
const TILE_SAFE: &str = "✓";
const TILE_HAZARD: &str = "☠";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UserEvent {
    Quit,
    Redraw,
    OpenWalletModal,
    CloseWalletModal,
    Connect(usize),
    Disconnect,
    ToggleDemo,
    SetBet(String),
    StartGame,
    RevealTile(TileId),
    CashOut,
    DismissCashOut,
    PlayAgain,
    SwitchChain,
    ClearErrors,
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
    rows: Vec<RowView>,
    cursor_row: usize,
    cursor_tile: usize,
    overlay: Option<Overlay>,
    wallet_modal: Option<usize>,
    modal_idx: usize,
    bet_input: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
enum Mode {
    #[default]
    Normal,
    BetInput {
        buffer: String,
    },
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub type InputEventReceiver = mpsc::UnboundedReceiver<std::io::Result<Event>>;

/// Blocking crossterm reads on a dedicated thread, forwarded to the async loop.
pub fn input_event_stream() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        loop {
            let event = event::read();
            let failed = event.is_err();
            if tx.send(event).is_err() || failed {
                break;
            }
        }
    });
    rx
}

pub async fn next_raw_event(input_events: &mut InputEventReceiver) -> Result<Event> {
    match input_events.recv().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("terminal input closed")),
    }
}

pub fn draw(state: &mut UiState, snap: &GameSnapshot) -> Result<()> {
    state.sync(snap);
    if let Some(mut term) = state.terminal.take() {
        let res = term.draw(|f| ui(f, state, snap)).map(|_| ());
        state.terminal = Some(term);
        res?;
    }
    Ok(())
}

impl UiState {
    /// Caches what key handling needs from the latest snapshot.
    fn sync(&mut self, snap: &GameSnapshot) {
        let ids_changed = self.rows.len() != snap.rows.len()
            || self.rows.iter().zip(&snap.rows).any(|(a, b)| a.id != b.id);
        self.rows = snap.rows.clone();
        self.overlay = snap.overlay.clone();
        self.bet_input = match &snap.prompt {
            Prompt::Bet { input, .. } => Some(input.clone()),
            _ => None,
        };
        match &snap.wallet_modal {
            Some(modal) => {
                if self.wallet_modal.is_none() {
                    self.modal_idx = 0;
                }
                self.wallet_modal = Some(modal.connectors.len());
                self.modal_idx = self
                    .modal_idx
                    .min(modal.connectors.len().saturating_sub(1));
            }
            None => self.wallet_modal = None,
        }
        if self.bet_input.is_none() {
            self.mode = Mode::Normal;
        }

        let cursor_row_playable = self
            .rows
            .get(self.cursor_row)
            .is_some_and(|row| row.tiles.iter().any(|t| t.enabled));
        if ids_changed || !cursor_row_playable {
            self.retarget_cursor();
        }
        self.clamp_cursor();
    }

    fn retarget_cursor(&mut self) {
        let playable = self
            .rows
            .iter()
            .position(|row| row.tiles.iter().any(|t| t.enabled));
        if let Some(row) = playable {
            self.cursor_row = row;
        } else if let Some(row) = self.rows.iter().rposition(|row| row.unlocked) {
            self.cursor_row = row;
        } else {
            self.cursor_row = self.rows.len().saturating_sub(1);
        }
    }

    fn clamp_cursor(&mut self) {
        self.cursor_row = self.cursor_row.min(self.rows.len().saturating_sub(1));
        let tiles = self.rows.get(self.cursor_row).map_or(0, |row| row.tiles.len());
        self.cursor_tile = self.cursor_tile.min(tiles.saturating_sub(1));
    }

    fn cursor_tile_id(&self) -> Option<TileId> {
        self.rows
            .get(self.cursor_row)
            .and_then(|row| row.tiles.get(self.cursor_tile))
            .map(|tile| tile.id)
    }

    fn move_cursor(&mut self, rows: isize, tiles: isize) {
        let row = self.cursor_row as isize + rows;
        self.cursor_row = row.clamp(0, self.rows.len().saturating_sub(1) as isize) as usize;
        let tile = self.cursor_tile as isize + tiles;
        self.cursor_tile = tile.max(0) as usize;
        self.clamp_cursor();
    }
}

pub fn interpret_event(state: &mut UiState, event: Event) -> Option<UserEvent> {
    let k = match event {
        Event::Key(k) if k.kind == KeyEventKind::Press => k,
        Event::Resize(..) => return Some(UserEvent::Redraw),
        _ => return None,
    };

    if let Mode::BetInput { buffer } = &mut state.mode {
        return match k.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let bet = std::mem::take(buffer);
                state.mode = Mode::Normal;
                Some(UserEvent::SetBet(bet))
            }
            KeyCode::Backspace => {
                buffer.pop();
                Some(UserEvent::Redraw)
            }
            KeyCode::Char(c) if c.is_ascii_digit() || (c == '.' && !buffer.contains('.')) => {
                buffer.push(c);
                Some(UserEvent::Redraw)
            }
            _ => None,
        };
    }

    if let Some(count) = state.wallet_modal {
        return match k.code {
            KeyCode::Esc | KeyCode::Char('q') => Some(UserEvent::CloseWalletModal),
            KeyCode::Up | KeyCode::Char('k') => {
                state.modal_idx = state.modal_idx.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                state.modal_idx = (state.modal_idx + 1).min(count.saturating_sub(1));
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter if count > 0 => Some(UserEvent::Connect(state.modal_idx)),
            _ => None,
        };
    }

    match &state.overlay {
        Some(Overlay::Lost) => {
            return match k.code {
                KeyCode::Char('r') | KeyCode::Enter => Some(UserEvent::PlayAgain),
                KeyCode::Char('q') => Some(UserEvent::Quit),
                _ => None,
            };
        }
        Some(Overlay::CashedOut { .. }) => {
            return match k.code {
                KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => {
                    Some(UserEvent::DismissCashOut)
                }
                KeyCode::Char('q') => Some(UserEvent::Quit),
                _ => None,
            };
        }
        None => {}
    }

    Some(match k.code {
        KeyCode::Char('q') => UserEvent::Quit,
        KeyCode::Up | KeyCode::Char('k') => {
            state.move_cursor(-1, 0);
            UserEvent::Redraw
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.move_cursor(1, 0);
            UserEvent::Redraw
        }
        KeyCode::Left | KeyCode::Char('h') => {
            state.move_cursor(0, -1);
            UserEvent::Redraw
        }
        KeyCode::Right | KeyCode::Char('l') => {
            state.move_cursor(0, 1);
            UserEvent::Redraw
        }
        KeyCode::Enter | KeyCode::Char(' ') => UserEvent::RevealTile(state.cursor_tile_id()?),
        KeyCode::Char('c') => UserEvent::OpenWalletModal,
        KeyCode::Char('x') => UserEvent::Disconnect,
        KeyCode::Char('d') => UserEvent::ToggleDemo,
        KeyCode::Char('b') => {
            let buffer = state.bet_input.clone()?;
            state.mode = Mode::BetInput { buffer };
            UserEvent::Redraw
        }
        KeyCode::Char('s') => UserEvent::StartGame,
        KeyCode::Char('o') => UserEvent::CashOut,
        KeyCode::Char('w') => UserEvent::SwitchChain,
        KeyCode::Char('r') => UserEvent::PlayAgain,
        KeyCode::Char('e') => UserEvent::ClearErrors,
        _ => return None,
    })
}

fn ui(f: &mut Frame, state: &UiState, snap: &GameSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // navbar
            Constraint::Min(10),   // board + sidebar
            Constraint::Length(5), // prompt
            Constraint::Length(6), // status/errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_navbar(f, chunks[0], snap);
    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(chunks[1]);
    draw_board(f, main[0], state, snap);
    draw_sidebar(f, main[1], snap);
    draw_prompt(f, chunks[2], state, snap);
    draw_status(f, chunks[3], snap);
    draw_help(f, chunks[4]);
    draw_overlays(f, state, snap);
}

fn draw_navbar(f: &mut Frame, area: Rect, snap: &GameSnapshot) {
    let mut spans = vec![Span::styled(
        "FlowFun Party",
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    )];
    match &snap.address {
        Some(address) => {
            spans.push(Span::raw(format!("  {address}")));
            if let Some(balance) = &snap.balance {
                spans.push(Span::styled(
                    format!("  {balance}"),
                    Style::default().fg(Color::Green),
                ));
            }
            spans.push(Span::styled(
                "  (x disconnect)",
                Style::default().fg(Color::DarkGray),
            ));
        }
        None => spans.push(Span::styled(
            "  c Connect Wallet",
            Style::default().fg(Color::Yellow),
        )),
    }
    let navbar =
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(navbar, area);
}

fn row_style(row: &RowView) -> Style {
    if !row.unlocked {
        return Style::default().fg(Color::DarkGray);
    }
    match row.distance {
        0 => Style::default().fg(Color::White),
        1 => Style::default().fg(Color::Gray),
        _ => Style::default().fg(Color::DarkGray),
    }
}

fn tile_symbol(face: TileFace) -> &'static str {
    match face {
        TileFace::Hidden => TILE_HIDDEN,
        TileFace::Pending => TILE_PENDING,
        TileFace::Safe => TILE_SAFE,
        TileFace::Hazard => TILE_HAZARD,
    }
}

fn pad_left(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(text.width());
    format!("{}{text}", " ".repeat(pad))
}

fn draw_board(f: &mut Frame, area: Rect, state: &UiState, snap: &GameSnapshot) {
    let labels: Vec<String> = snap
        .rows
        .iter()
        .map(|row| format!("{}x", row.multiplier))
        .collect();
    let label_width = labels.iter().map(|l| l.width()).max().unwrap_or(0);

    let mut lines = Vec::new();
    for (row_idx, (row, label)) in snap.rows.iter().zip(&labels).enumerate() {
        let base = row_style(row);
        let label_style = if row.completed {
            base.fg(Color::Green)
        } else {
            base
        };
        let mut spans = vec![Span::styled(
            format!("{} ", pad_left(label, label_width)),
            label_style,
        )];
        for (tile_idx, tile) in row.tiles.iter().enumerate() {
            let mut style = match tile.face {
                TileFace::Safe => Style::default().fg(Color::Green),
                TileFace::Hazard => Style::default().fg(Color::Red),
                TileFace::Pending => Style::default().fg(Color::Yellow),
                TileFace::Hidden if tile.enabled => base,
                TileFace::Hidden => base.add_modifier(Modifier::DIM),
            };
            let selected = row_idx == state.cursor_row && tile_idx == state.cursor_tile;
            if selected {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(format!("[{}]", tile_symbol(tile.face)), style));
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
        lines.push(Line::from(""));
    }
    let title = format!("Level {}", snap.level);
    let board = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(board, area);
}

fn draw_sidebar(f: &mut Frame, area: Rect, snap: &GameSnapshot) {
    let mut lines = vec![
        Line::styled(
            snap.score.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Line::from(format!("Level {}", snap.level)),
        Line::from(""),
    ];
    if snap.can_cash_out {
        lines.push(Line::styled(
            "o  Cash Out",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::styled(
            snap.cash_out_hint,
            Style::default().fg(Color::DarkGray),
        ));
        lines.push(Line::from(""));
    }
    if snap.demo {
        lines.push(Line::styled(
            "Demo Mode (d to exit)",
            Style::default().fg(Color::Cyan),
        ));
        lines.push(Line::from(""));
    } else if snap.address.is_none() {
        lines.push(Line::from("Connect & start playing!"));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(format!("Completed Rounds: {}", snap.completed_rounds)));
    lines.push(Line::from(format!(
        "Current Multiplier: {}",
        snap.current_multiplier
    )));
    lines.push(Line::from(format!("Total Winnings: {}", snap.total_winnings)));

    let sidebar = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Current Score"));
    f.render_widget(sidebar, area);
}

fn draw_prompt(f: &mut Frame, area: Rect, state: &UiState, snap: &GameSnapshot) {
    let lines = match &snap.prompt {
        Prompt::ConnectOrDemo => vec![
            Line::from("c Connect Wallet   or   d Play Demo"),
        ],
        Prompt::Bet {
            input,
            balance,
            validation,
        } => {
            let shown = match &state.mode {
                Mode::BetInput { buffer } => format!("{buffer}_"),
                Mode::Normal => input.clone(),
            };
            let mut balance_line = vec![Span::raw(format!("Balance: {balance}"))];
            if validation.insufficient_funds {
                balance_line.push(Span::styled(
                    " - Insufficient funds",
                    Style::default().fg(Color::Red),
                ));
            }
            let button_style = if validation.can_start {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            vec![
                Line::from(format!("Bet Amount ({}): {shown}   (b edit)", snap.currency)),
                Line::from(balance_line),
                Line::from(vec![
                    Span::styled(format!("s {}", validation.label), button_style),
                    Span::raw("   or   d Play Demo"),
                ]),
            ]
        }
        Prompt::WrongChain {
            chain_id,
            required,
            error,
        } => {
            let mut lines = vec![
                Line::styled(
                    format!("Connected to chain {chain_id} • FlowFun requires chain {required}"),
                    Style::default().fg(Color::Yellow),
                ),
                Line::from(format!("w Switch to Chain {required}   or   d Play Demo")),
            ];
            if let Some(error) = error {
                lines.push(Line::styled(error.clone(), Style::default().fg(Color::Red)));
            }
            lines
        }
        Prompt::None => Vec::new(),
    };
    let prompt = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(prompt, area);
}

fn draw_status(f: &mut Frame, area: Rect, snap: &GameSnapshot) {
    let status_widget = if snap.errors.is_empty() {
        let text = if snap.status.trim().is_empty() {
            "Ready".to_string()
        } else {
            snap.status.clone()
        };
        Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        let lines: Vec<Line> = snap
            .errors
            .iter()
            .rev()
            .map(|e| Line::from(e.clone()))
            .collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Errors (e to clear)"),
            )
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(status_widget, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(
        "←↓↑→/hjkl move | Enter reveal | c connect | x disconnect | d demo | b bet | s start | o cash out | w switch chain | r play again | q quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_overlays(f: &mut Frame, state: &UiState, snap: &GameSnapshot) {
    if let Some(modal) = &snap.wallet_modal {
        draw_wallet_modal(f, state, modal);
        return;
    }
    match &snap.overlay {
        Some(Overlay::Lost) => {
            let area = centered_rect(40, 30, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red));
            let p = Paragraph::new(vec![
                Line::styled(
                    "DEATH TILE!",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                Line::from(format!("{TILE_HAZARD} Game Over")),
                Line::from(""),
                Line::from("r Play Again"),
            ])
            .alignment(Alignment::Center);
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Some(Overlay::CashedOut { amount }) => {
            let area = centered_rect(40, 30, f.area());
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green));
            let p = Paragraph::new(vec![
                Line::styled(
                    "CASHED OUT!",
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ),
                Line::from(amount.clone()),
                Line::from(""),
                Line::from("Enter Close"),
            ])
            .alignment(Alignment::Center);
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        None => {}
    }
}

fn draw_wallet_modal(f: &mut Frame, state: &UiState, modal: &WalletModalView) {
    let area = centered_rect(50, 50, f.area());
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Connect Wallet");
    let mut lines = if modal.already_connected {
        vec![Line::from("Wallet already connected!")]
    } else {
        vec![Line::from("Choose your preferred wallet to get started")]
    };
    lines.push(Line::from(""));
    if modal.connectors.is_empty() {
        lines.push(Line::styled(
            "No allowed connectors configured",
            Style::default().fg(Color::DarkGray),
        ));
    }
    for (i, name) in modal.connectors.iter().enumerate() {
        let cur = if i == state.modal_idx { ">" } else { " " };
        let style = if i == state.modal_idx {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::styled(format!("{cur} {name}"), style));
    }
    lines.push(Line::from(""));
    if let Some(connector) = &modal.connecting {
        lines.push(Line::styled(
            format!("Connecting to {connector}..."),
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(error) = &modal.error {
        lines.push(Line::styled(
            format!("Connection Error: {error}"),
            Style::default().fg(Color::Red),
        ));
    }
    lines.push(Line::styled(
        "Enter connect | Esc close",
        Style::default().fg(Color::DarkGray),
    ));
    let p = Paragraph::new(lines).wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(p, block.inner(area));
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        chain::Address,
        game::{
            GameConfig,
            GameModel,
        },
        wallets::WalletConnector,
    };
    use crossterm::event::{
        KeyEvent,
        KeyModifiers,
    };
    use rand::{
        SeedableRng,
        rngs::StdRng,
    };
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn demo_model() -> GameModel {
        let mut model = GameModel::with_rng(
            GameConfig::new(747, Address([0xf1; 20])),
            vec![WalletConnector::local("Local Simulator")],
            StdRng::seed_from_u64(3),
        );
        model.enter_demo();
        model
    }

    fn render_text(state: &UiState, snap: &GameSnapshot) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|f| ui(f, state, snap)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn sync__places_cursor_on_playable_row() {
        // given
        let model = demo_model();
        let mut state = UiState::default();

        // when
        state.sync(&model.snapshot());

        // then
        assert_eq!(state.cursor_row, 2);
        let tile = state.cursor_tile_id().unwrap();
        assert_eq!(tile.row, crate::board::RowId(1));
    }

    #[test]
    fn interpret_event__enter_reveals_tile_under_cursor() {
        // given
        let model = demo_model();
        let mut state = UiState::default();
        state.sync(&model.snapshot());

        // when
        interpret_event(&mut state, key(KeyCode::Right));
        let event = interpret_event(&mut state, key(KeyCode::Enter));

        // then
        let expected = TileId::new(crate::board::RowId(1), 1);
        assert_eq!(event, Some(UserEvent::RevealTile(expected)));
    }

    #[test]
    fn interpret_event__bet_input_collects_digits() {
        // given
        let mut state = UiState::default();
        state.bet_input = Some("0.001".to_string());

        // when
        interpret_event(&mut state, key(KeyCode::Char('b')));
        interpret_event(&mut state, key(KeyCode::Char('5')));
        interpret_event(&mut state, key(KeyCode::Char('.')));
        let event = interpret_event(&mut state, key(KeyCode::Enter));

        // then
        assert_eq!(event, Some(UserEvent::SetBet("0.0015".to_string())));
        assert_eq!(state.mode, Mode::Normal);
    }

    #[test]
    fn interpret_event__wallet_modal_captures_keys() {
        // given
        let mut model = demo_model();
        model.open_wallet_modal();
        let mut state = UiState::default();
        state.sync(&model.snapshot());

        // when
        let event = interpret_event(&mut state, key(KeyCode::Enter));

        // then
        assert_eq!(event, Some(UserEvent::Connect(0)));
        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Esc)),
            Some(UserEvent::CloseWalletModal)
        );
    }

    #[test]
    fn interpret_event__lost_overlay_only_offers_play_again() {
        let mut state = UiState {
            overlay: Some(Overlay::Lost),
            ..UiState::default()
        };
        assert_eq!(interpret_event(&mut state, key(KeyCode::Char('s'))), None);
        assert_eq!(
            interpret_event(&mut state, key(KeyCode::Char('r'))),
            Some(UserEvent::PlayAgain)
        );
    }

    #[test]
    fn interpret_event__esc_does_not_quit_from_board() {
        // given
        let model = demo_model();
        let mut state = UiState::default();
        state.sync(&model.snapshot());

        // when
        let esc = interpret_event(&mut state, key(KeyCode::Esc));
        let q = interpret_event(&mut state, key(KeyCode::Char('q')));

        // then
        assert_eq!(esc, None);
        assert_eq!(q, Some(UserEvent::Quit));
    }

    #[test]
    fn ui__renders_demo_board() {
        // given
        let model = demo_model();
        let mut state = UiState::default();
        let snap = model.snapshot();
        state.sync(&snap);

        // when
        let text = render_text(&state, &snap);

        // then
        assert!(text.contains("FlowFun Party"));
        assert!(text.contains("1.54x"));
        assert!(text.contains("Demo Mode"));
        assert!(text.contains("Current Multiplier: 1.1x"));
    }

    #[test]
    fn ui__renders_connect_prompt_when_disconnected() {
        let model = GameModel::with_rng(
            GameConfig::new(747, Address([0xf1; 20])),
            Vec::new(),
            StdRng::seed_from_u64(3),
        );
        let mut state = UiState::default();
        let snap = model.snapshot();
        state.sync(&snap);
        let text = render_text(&state, &snap);
        assert!(text.contains("Connect Wallet"));
        assert!(text.contains("Play Demo"));
    }
}
