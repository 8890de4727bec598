use crate::{
    cues::Cue,
    game::{
        Category,
        GameMode,
        GameSnapshot,
        HighScoreCandidate,
        HighScoreCheck,
        HighScoreEntry,
        HighScoreSubmission,
        PossibleScores,
    },
    held::{
        HeldSet,
        HeldSetTracker,
    },
    high_score::HighScoreFlow,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use itertools::Itertools;
use std::{
    fmt,
    time::Duration,
};
use tracing::{
    debug,
    info,
    warn,
};

pub const DEFAULT_ROLL_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_SCORE_DELAY: Duration = Duration::from_millis(200);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Screen {
    Title,
    Game,
    HighScores,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::Title => write!(f, "title"),
            Screen::Game => write!(f, "game"),
            Screen::HighScores => write!(f, "high scores"),
        }
    }
}

/// Presentation windows between a cue and the request it announces.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Timings {
    pub roll_delay: Duration,
    pub score_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            roll_delay: DEFAULT_ROLL_DELAY,
            score_delay: DEFAULT_SCORE_DELAY,
        }
    }
}

/// Identifies one dispatched request and the session state it was issued
/// against. `epoch` moves on every screen change, `revision` on every
/// snapshot swap.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Ticket {
    pub seq: u64,
    pub epoch: u64,
    pub revision: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    CreateGame {
        mode: GameMode,
        player_names: Vec<String>,
    },
    PossibleScores {
        game_id: String,
    },
    Roll {
        game_id: String,
        held: HeldSet,
    },
    Score {
        game_id: String,
        category: Category,
    },
    ListHighScores,
    CheckHighScore {
        score: u32,
    },
    SubmitHighScore(HighScoreSubmission),
}

/// A validated action waiting to be performed: play `cue`, wait `delay`,
/// then send `request`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Dispatch {
    pub ticket: Ticket,
    pub cue: Option<Cue>,
    pub delay: Duration,
    pub request: Request,
}

impl Dispatch {
    fn immediate(ticket: Ticket, request: Request) -> Self {
        Self {
            ticket,
            cue: None,
            delay: Duration::ZERO,
            request,
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Created(Result<GameSnapshot>),
    PossibleScores(Result<PossibleScores>),
    Rolled(Result<GameSnapshot>),
    Scored(Result<GameSnapshot>),
    HighScores(Result<Vec<HighScoreEntry>>),
    Checked(Result<HighScoreCheck>),
    Submitted(Result<()>),
}

#[derive(Debug)]
pub struct Completion {
    pub ticket: Ticket,
    pub outcome: Outcome,
}

/// Why an action was refused before anything was sent.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Rejected {
    WrongScreen(Screen),
    Busy,
    NoPlayers,
    NoGame,
    GameOver,
    InFlight,
    NoRollsLeft,
    NotRolled,
    AlreadyScored(Category),
    NotOffered(Category),
    NoNameEntry,
    BlankName,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejected::WrongScreen(screen) => write!(f, "not available on the {screen} screen"),
            Rejected::Busy => write!(f, "a game is still being created"),
            Rejected::NoPlayers => write!(f, "no player names given"),
            Rejected::NoGame => write!(f, "no game in progress"),
            Rejected::GameOver => write!(f, "the game is over"),
            Rejected::InFlight => write!(f, "a roll or score is already in flight"),
            Rejected::NoRollsLeft => write!(f, "no rolls left this turn"),
            Rejected::NotRolled => write!(f, "roll before scoring"),
            Rejected::AlreadyScored(category) => write!(f, "{category} is already scored"),
            Rejected::NotOffered(category) => write!(f, "{category} is not a scoring choice"),
            Rejected::NoNameEntry => write!(f, "no high score waiting for a name"),
            Rejected::BlankName => write!(f, "enter a name first"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HighScoreBoard {
    #[default]
    Loading,
    Loaded(Vec<HighScoreEntry>),
    Unavailable,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum PendingAction {
    Roll,
    Score { category: Category, scorer: usize },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Pending {
    seq: u64,
    action: PendingAction,
}

/// Owns everything the client knows about the current session and is the
/// only place it changes. Actions validate synchronously and hand back a
/// [`Dispatch`]; replies come back through [`SessionController::apply`].
pub struct SessionController {
    screen: Screen,
    snapshot: Option<GameSnapshot>,
    possible: PossibleScores,
    held: HeldSetTracker,
    board: HighScoreBoard,
    high_score: HighScoreFlow,
    busy: Option<u64>,
    pending: Option<Pending>,
    epoch: u64,
    revision: u64,
    next_seq: u64,
    timings: Timings,
    notice: Option<String>,
    status: String,
}

impl SessionController {
    pub fn new(timings: Timings) -> Self {
        Self {
            screen: Screen::Title,
            snapshot: None,
            possible: PossibleScores::default(),
            held: HeldSetTracker::default(),
            board: HighScoreBoard::default(),
            high_score: HighScoreFlow::default(),
            busy: None,
            pending: None,
            epoch: 0,
            revision: 0,
            next_seq: 0,
            timings,
            notice: None,
            status: String::new(),
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn possible_scores(&self) -> &PossibleScores {
        &self.possible
    }

    pub fn held(&self) -> HeldSet {
        self.held.intent()
    }

    pub fn board(&self) -> &HighScoreBoard {
        &self.board
    }

    pub fn high_score(&self) -> &HighScoreFlow {
        &self.high_score
    }

    pub fn is_loading(&self) -> bool {
        self.busy.is_some()
    }

    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    fn ticket(&mut self) -> Ticket {
        self.next_seq += 1;
        Ticket {
            seq: self.next_seq,
            epoch: self.epoch,
            revision: self.revision,
        }
    }

    fn enter(&mut self, screen: Screen) {
        self.epoch += 1;
        self.screen = screen;
    }

    fn swap_snapshot(&mut self, snapshot: GameSnapshot) {
        self.revision += 1;
        self.held.sync(&snapshot);
        self.snapshot = Some(snapshot);
    }

    fn raise(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    fn active_game(&self) -> Result<&GameSnapshot, Rejected> {
        if self.screen != Screen::Game {
            return Err(Rejected::NoGame);
        }
        let snapshot = self.snapshot.as_ref().ok_or(Rejected::NoGame)?;
        if snapshot.game_over {
            return Err(Rejected::GameOver);
        }
        Ok(snapshot)
    }

    pub fn start_game(
        &mut self,
        mode: GameMode,
        player_names: Vec<String>,
    ) -> Result<Dispatch, Rejected> {
        if self.screen != Screen::Title {
            return Err(Rejected::WrongScreen(self.screen));
        }
        if self.busy.is_some() {
            return Err(Rejected::Busy);
        }
        if player_names.is_empty() {
            return Err(Rejected::NoPlayers);
        }
        let ticket = self.ticket();
        self.busy = Some(ticket.seq);
        info!(%mode, players = ?player_names, "starting game");
        Ok(Dispatch::immediate(
            ticket,
            Request::CreateGame { mode, player_names },
        ))
    }

    pub fn show_high_scores(&mut self) -> Result<Dispatch, Rejected> {
        if self.screen != Screen::Title {
            return Err(Rejected::WrongScreen(self.screen));
        }
        if self.busy.is_some() {
            return Err(Rejected::Busy);
        }
        self.enter(Screen::HighScores);
        self.board = HighScoreBoard::Loading;
        let ticket = self.ticket();
        Ok(Dispatch::immediate(ticket, Request::ListHighScores))
    }

    /// Abandons whatever is on screen. Outstanding replies become stale.
    pub fn back_to_title(&mut self) {
        if let Some(snapshot) = &self.snapshot {
            info!(game_id = %snapshot.id, "leaving game");
        }
        self.enter(Screen::Title);
        self.snapshot = None;
        self.possible = PossibleScores::default();
        self.held.clear();
        self.board = HighScoreBoard::default();
        self.busy = None;
        self.pending = None;
    }

    pub fn toggle_die(&mut self, index: usize) -> bool {
        if self.screen != Screen::Game {
            return false;
        }
        match &self.snapshot {
            Some(snapshot) if !snapshot.game_over => self.held.toggle(index, snapshot),
            _ => false,
        }
    }

    pub fn request_roll(&mut self) -> Result<Dispatch, Rejected> {
        let snapshot = self.active_game()?;
        if self.pending.is_some() {
            return Err(Rejected::InFlight);
        }
        if snapshot.rolls_remaining == 0 {
            return Err(Rejected::NoRollsLeft);
        }
        let game_id = snapshot.id.clone();
        let held = self.held.intent();
        let ticket = self.ticket();
        self.pending = Some(Pending {
            seq: ticket.seq,
            action: PendingAction::Roll,
        });
        Ok(Dispatch {
            ticket,
            cue: Some(Cue::Roll),
            delay: self.timings.roll_delay,
            request: Request::Roll { game_id, held },
        })
    }

    pub fn request_score(&mut self, category: Category) -> Result<Dispatch, Rejected> {
        let snapshot = self.active_game()?;
        let scorer = snapshot.current_player;
        if snapshot
            .current()
            .is_some_and(|player| player.scorecard.is_scored(category))
        {
            return Err(Rejected::AlreadyScored(category));
        }
        if !snapshot.has_rolled() {
            return Err(Rejected::NotRolled);
        }
        if self.pending.is_some() {
            return Err(Rejected::InFlight);
        }
        if !self.possible.contains(category) {
            return Err(Rejected::NotOffered(category));
        }
        let game_id = snapshot.id.clone();
        let ticket = self.ticket();
        self.pending = Some(Pending {
            seq: ticket.seq,
            action: PendingAction::Score { category, scorer },
        });
        Ok(Dispatch {
            ticket,
            cue: Some(Cue::Score),
            delay: self.timings.score_delay,
            request: Request::Score { game_id, category },
        })
    }

    pub fn name_entry_push(&mut self, c: char) {
        self.high_score.push_char(c);
    }

    pub fn name_entry_backspace(&mut self) {
        self.high_score.backspace();
    }

    pub fn cancel_high_score(&mut self) -> bool {
        self.high_score.cancel()
    }

    pub fn submit_high_score(&mut self) -> Result<Dispatch, Rejected> {
        if self.high_score.name_entry().is_none() {
            return Err(Rejected::NoNameEntry);
        }
        let ticket = self.ticket();
        let submission = self.high_score.submit(ticket.seq).ok_or(Rejected::BlankName)?;
        info!(
            player = %submission.player_name,
            score = submission.score,
            "submitting high score"
        );
        Ok(Dispatch::immediate(
            ticket,
            Request::SubmitHighScore(submission),
        ))
    }

    /// Folds one reply into the session. Returns the request that must
    /// follow it, if any.
    pub fn apply(&mut self, completion: Completion) -> Option<Dispatch> {
        let Completion { ticket, outcome } = completion;
        match outcome {
            Outcome::Created(result) => self.on_created(ticket, result),
            Outcome::PossibleScores(result) => {
                self.on_possible_scores(ticket, result);
                None
            }
            Outcome::Rolled(result) => self.on_rolled(ticket, result),
            Outcome::Scored(result) => self.on_scored(ticket, result),
            Outcome::HighScores(result) => {
                self.on_high_scores(ticket, result);
                None
            }
            Outcome::Checked(result) => {
                self.on_checked(ticket, result);
                None
            }
            Outcome::Submitted(result) => {
                self.on_submitted(ticket, result);
                None
            }
        }
    }

    fn possible_scores_for(&mut self, game_id: String) -> Dispatch {
        let ticket = self.ticket();
        Dispatch::immediate(ticket, Request::PossibleScores { game_id })
    }

    fn on_created(
        &mut self,
        ticket: Ticket,
        result: Result<GameSnapshot>,
    ) -> Option<Dispatch> {
        if self.busy != Some(ticket.seq)
            || ticket.epoch != self.epoch
            || self.screen != Screen::Title
        {
            debug!(seq = ticket.seq, "discarding stale create game response");
            return None;
        }
        self.busy = None;
        match result.and_then(checked) {
            Ok(snapshot) => {
                info!(
                    game_id = %snapshot.id,
                    mode = %snapshot.game_mode,
                    "game started"
                );
                self.status = format!(
                    "New {} game: {}",
                    snapshot.game_mode,
                    snapshot.players.iter().map(|p| p.name.as_str()).join(" vs ")
                );
                let game_id = snapshot.id.clone();
                self.enter(Screen::Game);
                self.possible = PossibleScores::default();
                self.swap_snapshot(snapshot);
                Some(self.possible_scores_for(game_id))
            }
            Err(err) => {
                warn!(?err, "create game failed");
                self.raise("Error starting game. Please try again.");
                None
            }
        }
    }

    fn on_possible_scores(&mut self, ticket: Ticket, result: Result<PossibleScores>) {
        if ticket.revision != self.revision
            || ticket.epoch != self.epoch
            || self.snapshot.is_none()
        {
            debug!(seq = ticket.seq, "discarding stale possible scores");
            return;
        }
        match result {
            Ok(possible) => self.possible = possible,
            Err(err) => {
                warn!(?err, "fetching possible scores failed");
                self.raise("Error loading possible scores.");
            }
        }
    }

    /// Releases the roll/score slot if `ticket` owns it in the current epoch.
    fn take_pending(&mut self, ticket: Ticket) -> Option<PendingAction> {
        match self.pending {
            Some(pending) if pending.seq == ticket.seq && ticket.epoch == self.epoch => {
                self.pending = None;
                Some(pending.action)
            }
            _ => None,
        }
    }

    fn same_game(&self, result: Result<GameSnapshot>) -> Result<GameSnapshot> {
        let snapshot = result.and_then(checked)?;
        match &self.snapshot {
            Some(current) if current.id != snapshot.id => Err(eyre!(
                "reply for game {} while playing {}",
                snapshot.id,
                current.id
            )),
            _ => Ok(snapshot),
        }
    }

    fn on_rolled(&mut self, ticket: Ticket, result: Result<GameSnapshot>) -> Option<Dispatch> {
        let Some(PendingAction::Roll) = self.take_pending(ticket) else {
            debug!(seq = ticket.seq, "discarding stale roll response");
            return None;
        };
        match self.same_game(result) {
            Ok(snapshot) => {
                self.status = format!("Rolled {}", snapshot.dice.values.iter().join(" "));
                info!(
                    game_id = %snapshot.id,
                    dice = ?snapshot.dice.values,
                    rolls_remaining = snapshot.rolls_remaining,
                    "dice rolled"
                );
                let game_id = snapshot.id.clone();
                self.possible = PossibleScores::default();
                self.swap_snapshot(snapshot);
                Some(self.possible_scores_for(game_id))
            }
            Err(err) => {
                warn!(?err, "roll failed");
                self.raise("Error rolling dice. Please try again.");
                None
            }
        }
    }

    fn on_scored(&mut self, ticket: Ticket, result: Result<GameSnapshot>) -> Option<Dispatch> {
        let Some(PendingAction::Score { category, scorer }) = self.take_pending(ticket) else {
            debug!(seq = ticket.seq, "discarding stale score response");
            return None;
        };
        let snapshot = match self.same_game(result) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(?err, %category, "score failed");
                self.raise("Error scoring category. Please try again.");
                return None;
            }
        };
        if let Some(player) = snapshot.players.get(scorer) {
            let points = player.scorecard.score(category).unwrap_or_default();
            self.status = format!("{} scored {points} in {category}", player.name);
            info!(game_id = %snapshot.id, player = %player.name, %category, points, "category scored");
        }
        let game_over = snapshot.game_over;
        let candidate = game_over.then(|| high_score_candidate(&snapshot)).flatten();
        let game_id = snapshot.id.clone();
        self.possible = PossibleScores::default();
        self.swap_snapshot(snapshot);
        self.held.clear();
        if !game_over {
            return Some(self.possible_scores_for(game_id));
        }
        let Some(candidate) = candidate else {
            warn!(game_id = %game_id, "game over without a winner total; skipping high score check");
            return None;
        };
        self.status = format!(
            "Game over! {} wins with {}",
            candidate.player_name, candidate.score
        );
        info!(winner = %candidate.player_name, score = candidate.score, "game over");
        let ticket = self.ticket();
        let score = candidate.score;
        self.high_score.begin_check(candidate, ticket.seq);
        Some(Dispatch::immediate(
            ticket,
            Request::CheckHighScore { score },
        ))
    }

    fn on_high_scores(&mut self, ticket: Ticket, result: Result<Vec<HighScoreEntry>>) {
        if ticket.epoch != self.epoch || self.screen != Screen::HighScores {
            debug!(seq = ticket.seq, "discarding stale high score list");
            return;
        }
        match result {
            Ok(entries) => self.board = HighScoreBoard::Loaded(entries),
            Err(err) => {
                warn!(?err, "listing high scores failed");
                self.board = HighScoreBoard::Unavailable;
                self.raise("Error loading high scores.");
            }
        }
    }

    fn on_checked(&mut self, ticket: Ticket, result: Result<HighScoreCheck>) {
        let applied = match result {
            Ok(check) => self.high_score.apply_check(ticket.seq, &check),
            Err(err) => {
                let applied = self.high_score.check_failed(ticket.seq);
                if applied {
                    warn!(?err, "high score check failed");
                    self.raise("Error checking high score.");
                }
                applied
            }
        };
        if !applied {
            debug!(seq = ticket.seq, "discarding stale high score check");
        }
    }

    fn on_submitted(&mut self, ticket: Ticket, result: Result<()>) {
        if !self.high_score.submit_finished(ticket.seq) {
            debug!(seq = ticket.seq, "discarding stale high score submission");
            return;
        }
        match result {
            Ok(()) => {
                info!("high score saved");
                self.status = "High score saved".to_string();
            }
            Err(err) => {
                warn!(?err, "high score submission failed");
                self.raise("Error submitting high score. Please try again.");
            }
        }
    }
}

fn checked(snapshot: GameSnapshot) -> Result<GameSnapshot> {
    snapshot.validate()?;
    Ok(snapshot)
}

fn high_score_candidate(snapshot: &GameSnapshot) -> Option<HighScoreCandidate> {
    let winner = snapshot.winner_player()?;
    Some(HighScoreCandidate {
        score: winner.scorecard.grand_total,
        game_mode: snapshot.game_mode,
        player_name: winner.name.clone(),
    })
}
