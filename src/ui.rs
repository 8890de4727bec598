use crate::{
    game::{
        Category,
        GameMode,
        GameSnapshot,
        HighScoreEntry,
        PossibleScores,
        Scorecard,
        Section,
        UPPER_BONUS_THRESHOLD,
    },
    held::HeldSet,
    router::{
        NameEntry,
        Route,
        View,
    },
    session::HighScoreBoard,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use itertools::Itertools;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use unicode_width::UnicodeWidthStr;

const DIE_FACES: [char; 6] = ['⚀', '⚁', '⚂', '⚃', '⚄', '⚅'];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    StartGame(GameMode),
    ShowHighScores,
    ToggleDie(usize),
    Roll,
    Score(Category),
    BackToTitle,
    NameChar(char),
    NameBackspace,
    SubmitName,
    CancelName,
    DismissNotice,
    Redraw,
}

/// Which key map applies. A notice captures input before the name entry
/// overlay, which captures it before the screen underneath.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputMode {
    Title,
    Game,
    HighScores,
    NameEntry,
    Notice,
}

impl InputMode {
    pub fn of(route: &Route<'_>, notice: Option<&str>) -> Self {
        if notice.is_some() {
            return InputMode::Notice;
        }
        if route.overlay.is_some() {
            return InputMode::NameEntry;
        }
        match route.view {
            View::Title => InputMode::Title,
            View::Game { .. } | View::Blank => InputMode::Game,
            View::HighScores(_) => InputMode::HighScores,
        }
    }
}

pub struct UiState {
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
    selected: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            terminal: None,
            selected: 0,
        }
    }
}

impl UiState {
    pub fn selected_category(&self) -> Category {
        Category::ALL[self.selected.min(Category::ALL.len() - 1)]
    }

    fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn select_next(&mut self) {
        self.selected = (self.selected + 1).min(Category::ALL.len() - 1);
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode().wrap_err("enabling raw mode failed")?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)
        .wrap_err("entering alternate screen failed")?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend).wrap_err("creating terminal failed")?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode().wrap_err("disabling raw mode failed")?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)
        .wrap_err("leaving alternate screen failed")?;
    Ok(())
}

pub fn input_event_stream() -> EventStream {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut EventStream) -> Result<Event> {
    match events.next().await {
        Some(event) => event.wrap_err("reading terminal input failed"),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn interpret_event(state: &mut UiState, mode: InputMode, event: Event) -> Option<UserEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => interpret_key(state, mode, key),
        Event::Resize(_, _) => Some(UserEvent::Redraw),
        _ => None,
    }
}

fn interpret_key(state: &mut UiState, mode: InputMode, key: KeyEvent) -> Option<UserEvent> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UserEvent::Quit);
    }
    match mode {
        InputMode::Notice => Some(UserEvent::DismissNotice),
        InputMode::NameEntry => match key.code {
            KeyCode::Enter => Some(UserEvent::SubmitName),
            KeyCode::Esc => Some(UserEvent::CancelName),
            KeyCode::Backspace => Some(UserEvent::NameBackspace),
            KeyCode::Char(c) => Some(UserEvent::NameChar(c)),
            _ => None,
        },
        InputMode::Title => match key.code {
            KeyCode::Char('1') => Some(UserEvent::StartGame(GameMode::Single)),
            KeyCode::Char('2') => Some(UserEvent::StartGame(GameMode::Multiplayer)),
            KeyCode::Char('h') => Some(UserEvent::ShowHighScores),
            KeyCode::Char('q') | KeyCode::Esc => Some(UserEvent::Quit),
            _ => None,
        },
        InputMode::Game => match key.code {
            KeyCode::Char(c @ '1'..='5') => {
                Some(UserEvent::ToggleDie(c as usize - '1' as usize))
            }
            KeyCode::Char('r') | KeyCode::Char(' ') => Some(UserEvent::Roll),
            KeyCode::Up | KeyCode::Char('k') => {
                state.select_prev();
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                state.select_next();
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => Some(UserEvent::Score(state.selected_category())),
            KeyCode::Char('b') | KeyCode::Esc => Some(UserEvent::BackToTitle),
            _ => None,
        },
        InputMode::HighScores => match key.code {
            KeyCode::Char('b') | KeyCode::Esc => Some(UserEvent::BackToTitle),
            _ => None,
        },
    }
}

pub fn draw(
    state: &mut UiState,
    route: &Route<'_>,
    status: &str,
    notice: Option<&str>,
) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        let selected = state.selected_category();
        let res = term
            .draw(|f| render(f, selected, route, status, notice))
            .map(|_| ());
        state.terminal = Some(term);
        res.wrap_err("drawing frame failed")?;
    }
    Ok(())
}

fn render(
    f: &mut Frame,
    selected: Category,
    route: &Route<'_>,
    status: &str,
    notice: Option<&str>,
) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(4)])
        .split(f.area());

    match &route.view {
        View::Title => draw_title(f, chunks[0], route.loading),
        View::Game {
            snapshot,
            possible,
            held,
        } => draw_game(f, chunks[0], selected, snapshot, possible, *held),
        View::HighScores(board) => draw_high_scores(f, chunks[0], board),
        View::Blank => {}
    }
    draw_footer(f, chunks[1], route, status);

    if let Some(entry) = &route.overlay {
        draw_name_entry(f, entry);
    }
    if let Some(message) = notice {
        draw_notice(f, message);
    }
}

fn draw_title(f: &mut Frame, area: Rect, loading: bool) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Y A H T Z E E",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(DIE_FACES.iter().join(" ")),
        Line::from(""),
    ];
    if loading {
        lines.push(Line::from("Loading game..."));
    } else {
        lines.extend([
            Line::from("1  Single player"),
            Line::from("2  Two players"),
            Line::from("h  High scores"),
            Line::from("q  Quit"),
        ]);
    }
    let title = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Yahtzee"));
    f.render_widget(title, area);
}

fn draw_game(
    f: &mut Frame,
    area: Rect,
    selected: Category,
    snapshot: &GameSnapshot,
    possible: &PossibleScores,
    held: HeldSet,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(0),
        ])
        .split(area);
    draw_turn(f, rows[0], snapshot);
    draw_dice(f, rows[1], snapshot, held);
    draw_scorecard(f, rows[2], selected, snapshot, possible);
}

fn turn_line(snapshot: &GameSnapshot) -> String {
    if snapshot.game_over {
        let winner = snapshot.winner_player();
        return match winner {
            Some(player) => format!(
                "Game over! {} wins with {} points",
                player.name, player.scorecard.grand_total
            ),
            None => "Game over!".to_string(),
        };
    }
    let player = snapshot
        .current()
        .map(|p| p.name.as_str())
        .unwrap_or("?");
    format!(
        "Turn {} | {} to play | Rolls left: {}",
        snapshot.turn_number, player, snapshot.rolls_remaining
    )
}

fn draw_turn(f: &mut Frame, area: Rect, snapshot: &GameSnapshot) {
    let style = if snapshot.game_over {
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let widget = Paragraph::new(turn_line(snapshot))
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Game"));
    f.render_widget(widget, area);
}

fn die_face(value: u8) -> char {
    usize::from(value)
        .checked_sub(1)
        .and_then(|i| DIE_FACES.get(i))
        .copied()
        .unwrap_or('?')
}

fn draw_dice(f: &mut Frame, area: Rect, snapshot: &GameSnapshot, held: HeldSet) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(area);
    for (i, value) in snapshot.dice.values.iter().enumerate() {
        let is_held = held.is_held(i);
        let style = if is_held {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let lines = vec![
            Line::from(format!("{} {}", die_face(*value), value)),
            Line::from(if is_held { "HELD" } else { "" }),
        ];
        let widget = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .style(style)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(style)
                    .title(format!(" {} ", i + 1)),
            );
        f.render_widget(widget, cols[i]);
    }
}

/// Text for one scorecard cell: the recorded score, otherwise the offer in
/// parentheses, otherwise a dash.
fn category_cell(card: &Scorecard, category: Category, offer: Option<u32>) -> String {
    match (card.score(category), offer) {
        (Some(score), _) => score.to_string(),
        (None, Some(points)) => format!("({points})"),
        (None, None) => "-".to_string(),
    }
}

fn draw_scorecard(
    f: &mut Frame,
    area: Rect,
    selected: Category,
    snapshot: &GameSnapshot,
    possible: &PossibleScores,
) {
    let totals_style = Style::default().add_modifier(Modifier::BOLD);
    let category_row = |category: Category| {
        let cells = snapshot.players.iter().enumerate().map(|(i, player)| {
            let offer = (i == snapshot.current_player && !snapshot.game_over)
                .then(|| possible.get(category))
                .flatten();
            category_cell(&player.scorecard, category, offer)
        });
        let row = Row::new(std::iter::once(category.label().to_string()).chain(cells));
        if category == selected && !snapshot.game_over {
            row.style(Style::default().add_modifier(Modifier::REVERSED))
        } else {
            row
        }
    };
    let total_row = |label: &str, total: fn(&Scorecard) -> u32| {
        let cells = snapshot
            .players
            .iter()
            .map(|p| total(&p.scorecard).to_string());
        Row::new(std::iter::once(label.to_string()).chain(cells)).style(totals_style)
    };

    let mut rows: Vec<Row> = Category::of_section(Section::Upper)
        .map(&category_row)
        .collect();
    rows.push(total_row("Upper subtotal", |c| c.upper_subtotal));
    rows.push(total_row(
        &format!("Bonus ({UPPER_BONUS_THRESHOLD}+)"),
        |c| c.upper_bonus,
    ));
    rows.push(total_row("Upper total", |c| c.upper_total));
    rows.extend(Category::of_section(Section::Lower).map(&category_row));
    rows.push(total_row("Lower total", |c| c.lower_total));
    rows.push(total_row("Grand total", |c| c.grand_total));

    let header = Row::new(std::iter::once("Category".to_string()).chain(
        snapshot.players.iter().enumerate().map(|(i, p)| {
            if i == snapshot.current_player && !snapshot.game_over {
                format!("> {}", p.name)
            } else {
                p.name.clone()
            }
        }),
    ))
    .style(Style::default().fg(Color::Cyan));
    let widths = std::iter::once(Constraint::Length(16)).chain(
        snapshot
            .players
            .iter()
            .map(|p| Constraint::Length(column_width(&p.name, 6) + 2)),
    );
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Scorecard"));
    f.render_widget(table, area);
}

fn column_width(text: &str, min: u16) -> u16 {
    u16::try_from(text.width()).unwrap_or(u16::MAX).max(min)
}

fn high_score_row(rank: usize, entry: &HighScoreEntry) -> Row<'static> {
    let date = entry
        .created_at
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    Row::new(vec![
        format!("#{rank}"),
        entry.player_name.clone(),
        entry.score.to_string(),
        entry.game_mode.short_label().to_string(),
        date,
    ])
}

fn draw_high_scores(f: &mut Frame, area: Rect, board: &HighScoreBoard) {
    let block = Block::default().borders(Borders::ALL).title("High Scores");
    let entries = match board {
        HighScoreBoard::Loaded(entries) if !entries.is_empty() => entries,
        other => {
            let message = match other {
                HighScoreBoard::Loading => "Loading...",
                HighScoreBoard::Unavailable => "High scores are unavailable right now.",
                HighScoreBoard::Loaded(_) => "No high scores yet! Be the first!",
            };
            let widget = Paragraph::new(message)
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(widget, area);
            return;
        }
    };
    let name_width = entries
        .iter()
        .map(|e| column_width(&e.player_name, 4))
        .max()
        .unwrap_or(4);
    let rows = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| high_score_row(i + 1, entry));
    let widths = [
        Constraint::Length(5),
        Constraint::Length(name_width + 2),
        Constraint::Length(7),
        Constraint::Length(6),
        Constraint::Length(10),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["Rank", "Name", "Score", "Mode", "Date"])
                .style(Style::default().fg(Color::Cyan)),
        )
        .block(block);
    f.render_widget(table, area);
}

fn help_line(route: &Route<'_>) -> &'static str {
    if route.overlay.is_some() {
        return "type your name | Enter submit | Esc cancel";
    }
    match route.view {
        View::Title if route.loading => "Ctrl-C quit",
        View::Title => "1 single | 2 two players | h high scores | q quit",
        View::Game { .. } | View::Blank => {
            "1-5 hold | r/space roll | ↑/↓ select | Enter score | b back"
        }
        View::HighScores(_) => "b/Esc back",
    }
}

fn draw_footer(f: &mut Frame, area: Rect, route: &Route<'_>, status: &str) {
    let status = if status.trim().is_empty() {
        "Ready"
    } else {
        status
    };
    let lines = vec![
        Line::from(Span::styled(status, Style::default().fg(Color::Green))),
        Line::from(help_line(route)),
    ];
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(widget, area);
}

fn draw_name_entry(f: &mut Frame, entry: &NameEntry<'_>) {
    let area = centered_rect(50, 30, f.area());
    let block = Block::default()
        .borders(Borders::ALL)
        .title("New High Score!");
    let lines = vec![
        Line::from(format!("You scored {} points!", entry.candidate.score)),
        Line::from(""),
        Line::from(format!("Name: {}_", entry.input)),
        Line::from(""),
        Line::from("Enter=submit Esc=cancel"),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center);
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(p, block.inner(area));
}

fn draw_notice(f: &mut Frame, message: &str) {
    let area = centered_rect(50, 20, f.area());
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Error")
        .border_style(Style::default().fg(Color::Red));
    let p = Paragraph::new(vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from("press any key"),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(p, block.inner(area));
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(vertical[1])[1]
}
