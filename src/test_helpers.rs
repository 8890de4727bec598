use crate::{
    api_client::GameApi,
    game::{
        Category,
        DICE_COUNT,
        Dice,
        GameMode,
        GameSnapshot,
        HighScoreCheck,
        HighScoreEntry,
        HighScoreSubmission,
        Player,
        PossibleScores,
        ROLLS_PER_TURN,
        Scorecard,
        Section,
        UPPER_BONUS_THRESHOLD,
    },
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use std::{
    collections::VecDeque,
    sync::{
        Arc,
        Mutex,
    },
};

pub struct SnapshotBuilder {
    snapshot: GameSnapshot,
}

impl SnapshotBuilder {
    pub fn single(id: &str) -> Self {
        Self::with_players(id, GameMode::Single, &["Player 1"])
    }

    pub fn multiplayer(id: &str, names: &[&str]) -> Self {
        Self::with_players(id, GameMode::Multiplayer, names)
    }

    fn with_players(id: &str, game_mode: GameMode, names: &[&str]) -> Self {
        let players = names
            .iter()
            .enumerate()
            .map(|(i, name)| Player {
                id: format!("{id}-p{}", i + 1),
                name: name.to_string(),
                scorecard: Scorecard::default(),
            })
            .collect();
        Self {
            snapshot: GameSnapshot {
                id: id.to_string(),
                turn_number: 1,
                current_player: 0,
                rolls_remaining: ROLLS_PER_TURN,
                rolls_used: 0,
                dice: Dice {
                    values: [1; DICE_COUNT],
                    held: [false; DICE_COUNT],
                },
                players,
                game_over: false,
                winner: None,
                game_mode,
            },
        }
    }

    pub fn rolled(mut self, rolls_used: u8, values: [u8; DICE_COUNT]) -> Self {
        self.snapshot.rolls_used = rolls_used;
        self.snapshot.rolls_remaining = ROLLS_PER_TURN - rolls_used;
        self.snapshot.dice.values = values;
        self
    }

    pub fn held(mut self, held: [bool; DICE_COUNT]) -> Self {
        self.snapshot.dice.held = held;
        self
    }

    pub fn current_player(mut self, index: usize) -> Self {
        self.snapshot.current_player = index;
        self
    }

    pub fn turn(mut self, turn_number: u32) -> Self {
        self.snapshot.turn_number = turn_number;
        self
    }

    /// Records a score and refreshes the derived totals the way the service
    /// reports them.
    pub fn scored(mut self, player: usize, category: Category, value: u32) -> Self {
        let card = &mut self.snapshot.players[player].scorecard;
        *card.slot_mut(category) = Some(value);
        let section_sum = |card: &Scorecard, section| {
            Category::of_section(section)
                .filter_map(|c| card.score(c))
                .sum::<u32>()
        };
        card.upper_subtotal = section_sum(card, Section::Upper);
        card.upper_bonus = if card.upper_subtotal >= UPPER_BONUS_THRESHOLD {
            35
        } else {
            0
        };
        card.upper_total = card.upper_subtotal + card.upper_bonus;
        card.lower_total = section_sum(card, Section::Lower);
        card.grand_total = card.upper_total + card.lower_total;
        self
    }

    /// Fills every category of `player` except `open`.
    pub fn all_scored_except(mut self, player: usize, open: &[Category], value: u32) -> Self {
        for category in Category::ALL {
            if !open.contains(&category) {
                self = self.scored(player, category, value);
            }
        }
        self
    }

    pub fn game_over(mut self, winner: &str) -> Self {
        self.snapshot.game_over = true;
        self.snapshot.winner = Some(winner.to_string());
        self
    }

    pub fn build(self) -> GameSnapshot {
        self.snapshot
    }
}

pub fn possible(scores: &[(Category, u32)]) -> PossibleScores {
    scores.iter().copied().collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiCall {
    CreateGame {
        mode: GameMode,
        player_names: Vec<String>,
    },
    PossibleScores {
        game_id: String,
    },
    Roll {
        game_id: String,
        held_dice: [bool; DICE_COUNT],
    },
    Score {
        game_id: String,
        category: Category,
    },
    HighScores,
    CheckHighScore {
        score: u32,
    },
    SubmitHighScore(HighScoreSubmission),
}

type Scripted<T> = VecDeque<Result<T, String>>;

#[derive(Default)]
struct FakeState {
    calls: Vec<ApiCall>,
    created: Scripted<GameSnapshot>,
    possible: Scripted<PossibleScores>,
    rolled: Scripted<GameSnapshot>,
    scored: Scripted<GameSnapshot>,
    boards: Scripted<Vec<HighScoreEntry>>,
    checks: Scripted<HighScoreCheck>,
    submits: Scripted<()>,
}

/// Game service double that replays scripted replies in order and records
/// every call it receives.
#[derive(Clone, Default)]
pub struct FakeGameApi {
    state: Arc<Mutex<FakeState>>,
}

fn script<T>(reply: Result<T, &str>) -> Result<T, String> {
    reply.map_err(str::to_string)
}

fn next<T>(queue: &mut Scripted<T>, endpoint: &str) -> Result<T> {
    match queue.pop_front() {
        Some(Ok(value)) => Ok(value),
        Some(Err(msg)) => Err(eyre!("{endpoint} failed: {msg}")),
        None => Err(eyre!("no scripted reply for {endpoint}")),
    }
}

impl FakeGameApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn push_create(&self, reply: Result<GameSnapshot, &str>) -> &Self {
        self.state.lock().unwrap().created.push_back(script(reply));
        self
    }

    pub fn push_possible(&self, reply: Result<PossibleScores, &str>) -> &Self {
        self.state.lock().unwrap().possible.push_back(script(reply));
        self
    }

    pub fn push_roll(&self, reply: Result<GameSnapshot, &str>) -> &Self {
        self.state.lock().unwrap().rolled.push_back(script(reply));
        self
    }

    pub fn push_score(&self, reply: Result<GameSnapshot, &str>) -> &Self {
        self.state.lock().unwrap().scored.push_back(script(reply));
        self
    }

    pub fn push_high_scores(&self, reply: Result<Vec<HighScoreEntry>, &str>) -> &Self {
        self.state.lock().unwrap().boards.push_back(script(reply));
        self
    }

    pub fn push_check(&self, reply: Result<HighScoreCheck, &str>) -> &Self {
        self.state.lock().unwrap().checks.push_back(script(reply));
        self
    }

    pub fn push_submit(&self, reply: Result<(), &str>) -> &Self {
        self.state.lock().unwrap().submits.push_back(script(reply));
        self
    }

    fn record(&self, call: ApiCall) -> std::sync::MutexGuard<'_, FakeState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

impl GameApi for FakeGameApi {
    async fn create_game(
        &self,
        mode: GameMode,
        player_names: &[String],
    ) -> Result<GameSnapshot> {
        let mut state = self.record(ApiCall::CreateGame {
            mode,
            player_names: player_names.to_vec(),
        });
        next(&mut state.created, "create game")
    }

    async fn possible_scores(&self, game_id: &str) -> Result<PossibleScores> {
        let mut state = self.record(ApiCall::PossibleScores {
            game_id: game_id.to_string(),
        });
        next(&mut state.possible, "possible scores")
    }

    async fn roll(
        &self,
        game_id: &str,
        held_dice: [bool; DICE_COUNT],
    ) -> Result<GameSnapshot> {
        let mut state = self.record(ApiCall::Roll {
            game_id: game_id.to_string(),
            held_dice,
        });
        next(&mut state.rolled, "roll")
    }

    async fn score(&self, game_id: &str, category: Category) -> Result<GameSnapshot> {
        let mut state = self.record(ApiCall::Score {
            game_id: game_id.to_string(),
            category,
        });
        next(&mut state.scored, "score")
    }

    async fn high_scores(&self) -> Result<Vec<HighScoreEntry>> {
        let mut state = self.record(ApiCall::HighScores);
        next(&mut state.boards, "list high scores")
    }

    async fn check_high_score(&self, score: u32) -> Result<HighScoreCheck> {
        let mut state = self.record(ApiCall::CheckHighScore { score });
        next(&mut state.checks, "check high score")
    }

    async fn submit_high_score(&self, submission: &HighScoreSubmission) -> Result<()> {
        let mut state = self.record(ApiCall::SubmitHighScore(submission.clone()));
        next(&mut state.submits, "submit high score")
    }
}
