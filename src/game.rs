use chrono::NaiveDateTime;
use color_eyre::eyre::{
    Result,
    eyre,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::BTreeMap,
    fmt,
};

pub const DICE_COUNT: usize = 5;
pub const ROLLS_PER_TURN: u8 = 3;
pub const UPPER_BONUS_THRESHOLD: u32 = 63;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Section {
    Upper,
    Lower,
}

#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Ones,
    Twos,
    Threes,
    Fours,
    Fives,
    Sixes,
    ThreeOfAKind,
    FourOfAKind,
    FullHouse,
    SmallStraight,
    LargeStraight,
    Yahtzee,
    Chance,
}

impl Category {
    /// All categories in scorecard display order.
    pub const ALL: [Category; 13] = [
        Category::Ones,
        Category::Twos,
        Category::Threes,
        Category::Fours,
        Category::Fives,
        Category::Sixes,
        Category::ThreeOfAKind,
        Category::FourOfAKind,
        Category::FullHouse,
        Category::SmallStraight,
        Category::LargeStraight,
        Category::Yahtzee,
        Category::Chance,
    ];

    pub fn section(self) -> Section {
        match self {
            Category::Ones
            | Category::Twos
            | Category::Threes
            | Category::Fours
            | Category::Fives
            | Category::Sixes => Section::Upper,
            _ => Section::Lower,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Ones => "Ones",
            Category::Twos => "Twos",
            Category::Threes => "Threes",
            Category::Fours => "Fours",
            Category::Fives => "Fives",
            Category::Sixes => "Sixes",
            Category::ThreeOfAKind => "3 of a Kind",
            Category::FourOfAKind => "4 of a Kind",
            Category::FullHouse => "Full House",
            Category::SmallStraight => "Small Straight",
            Category::LargeStraight => "Large Straight",
            Category::Yahtzee => "YAHTZEE",
            Category::Chance => "Chance",
        }
    }

    pub fn of_section(section: Section) -> impl Iterator<Item = Category> {
        Category::ALL
            .into_iter()
            .filter(move |category| category.section() == section)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Single,
    Multiplayer,
}

impl GameMode {
    pub fn short_label(self) -> &'static str {
        match self {
            GameMode::Single => "1P",
            GameMode::Multiplayer => "2P",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameMode::Single => "single",
            GameMode::Multiplayer => "multiplayer",
        };
        write!(f, "{name}")
    }
}

/// Per-player scores. `None` marks an unscored category; totals are
/// computed by the service and only displayed here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scorecard {
    pub ones: Option<u32>,
    pub twos: Option<u32>,
    pub threes: Option<u32>,
    pub fours: Option<u32>,
    pub fives: Option<u32>,
    pub sixes: Option<u32>,
    pub three_of_a_kind: Option<u32>,
    pub four_of_a_kind: Option<u32>,
    pub full_house: Option<u32>,
    pub small_straight: Option<u32>,
    pub large_straight: Option<u32>,
    pub yahtzee: Option<u32>,
    pub chance: Option<u32>,
    #[serde(default)]
    pub upper_subtotal: u32,
    #[serde(default)]
    pub upper_bonus: u32,
    #[serde(default)]
    pub upper_total: u32,
    #[serde(default)]
    pub lower_total: u32,
    #[serde(default)]
    pub grand_total: u32,
}

impl Scorecard {
    pub fn score(&self, category: Category) -> Option<u32> {
        *self.slot(category)
    }

    pub fn is_scored(&self, category: Category) -> bool {
        self.score(category).is_some()
    }

    fn slot(&self, category: Category) -> &Option<u32> {
        match category {
            Category::Ones => &self.ones,
            Category::Twos => &self.twos,
            Category::Threes => &self.threes,
            Category::Fours => &self.fours,
            Category::Fives => &self.fives,
            Category::Sixes => &self.sixes,
            Category::ThreeOfAKind => &self.three_of_a_kind,
            Category::FourOfAKind => &self.four_of_a_kind,
            Category::FullHouse => &self.full_house,
            Category::SmallStraight => &self.small_straight,
            Category::LargeStraight => &self.large_straight,
            Category::Yahtzee => &self.yahtzee,
            Category::Chance => &self.chance,
        }
    }

    pub(crate) fn slot_mut(&mut self, category: Category) -> &mut Option<u32> {
        match category {
            Category::Ones => &mut self.ones,
            Category::Twos => &mut self.twos,
            Category::Threes => &mut self.threes,
            Category::Fours => &mut self.fours,
            Category::Fives => &mut self.fives,
            Category::Sixes => &mut self.sixes,
            Category::ThreeOfAKind => &mut self.three_of_a_kind,
            Category::FourOfAKind => &mut self.four_of_a_kind,
            Category::FullHouse => &mut self.full_house,
            Category::SmallStraight => &mut self.small_straight,
            Category::LargeStraight => &mut self.large_straight,
            Category::Yahtzee => &mut self.yahtzee,
            Category::Chance => &mut self.chance,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub scorecard: Scorecard,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dice {
    pub values: [u8; DICE_COUNT],
    pub held: [bool; DICE_COUNT],
}

/// One point-in-time game state as returned by the game service. Replaced
/// wholesale after every roll or score; never patched field by field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: String,
    pub turn_number: u32,
    pub current_player: usize,
    pub rolls_remaining: u8,
    pub rolls_used: u8,
    pub dice: Dice,
    pub players: Vec<Player>,
    pub game_over: bool,
    #[serde(default)]
    pub winner: Option<String>,
    pub game_mode: GameMode,
}

impl GameSnapshot {
    pub fn current(&self) -> Option<&Player> {
        self.players.get(self.current_player)
    }

    pub fn player_named(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn winner_player(&self) -> Option<&Player> {
        self.winner.as_deref().and_then(|name| self.player_named(name))
    }

    pub fn has_rolled(&self) -> bool {
        self.rolls_used > 0
    }

    /// Checks the invariants every snapshot from the service must satisfy
    /// before it may replace the current one.
    pub fn validate(&self) -> Result<()> {
        let rolls_total = u16::from(self.rolls_remaining) + u16::from(self.rolls_used);
        if rolls_total != u16::from(ROLLS_PER_TURN) {
            return Err(eyre!(
                "game {}: rolls_remaining ({}) + rolls_used ({}) != {}",
                self.id,
                self.rolls_remaining,
                self.rolls_used,
                ROLLS_PER_TURN
            ));
        }
        if let Some(value) = self.dice.values.iter().find(|v| !(1..=6).contains(*v)) {
            return Err(eyre!("game {}: die value {value} out of range", self.id));
        }
        if self.current().is_none() {
            return Err(eyre!(
                "game {}: current_player {} out of range for {} player(s)",
                self.id,
                self.current_player,
                self.players.len()
            ));
        }
        if self.game_over && self.winner_player().is_none() {
            return Err(eyre!(
                "game {}: finished without a winner among its players (winner: {:?})",
                self.id,
                self.winner
            ));
        }
        Ok(())
    }
}

/// Score each still-open category would yield with the current dice.
/// A missing key means the category is not a legal choice right now.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PossibleScores(BTreeMap<Category, u32>);

impl PossibleScores {
    pub fn get(&self, category: Category) -> Option<u32> {
        self.0.get(&category).copied()
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0.contains_key(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        self.0.iter().map(|(c, s)| (*c, *s))
    }
}

impl FromIterator<(Category, u32)> for PossibleScores {
    fn from_iter<T: IntoIterator<Item = (Category, u32)>>(iter: T) -> Self {
        PossibleScores(iter.into_iter().collect())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub id: String,
    pub player_name: String,
    pub score: u32,
    pub game_mode: GameMode,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreCheck {
    pub is_high_score: bool,
    #[serde(default)]
    pub rank: Option<u32>,
}

/// Transient value held only while the high-score interaction is open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighScoreCandidate {
    pub score: u32,
    pub game_mode: GameMode,
    pub player_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreSubmission {
    pub player_name: String,
    pub score: u32,
    pub game_mode: GameMode,
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;

    const WIRE_SNAPSHOT: &str = r#"{
        "id": "5f1c",
        "players": [{
            "id": "p1",
            "name": "Player 1",
            "scorecard": {
                "ones": 2, "twos": null, "threes": null, "fours": null,
                "fives": null, "sixes": null, "three_of_a_kind": null,
                "four_of_a_kind": null, "full_house": null,
                "small_straight": null, "large_straight": null,
                "yahtzee": null, "chance": null,
                "upper_subtotal": 2, "upper_bonus": 0, "upper_total": 2,
                "lower_total": 0, "grand_total": 2
            },
            "is_active": true
        }],
        "current_player": 0,
        "dice": {"values": [1, 1, 3, 4, 6], "held": [true, true, false, false, false]},
        "rolls_remaining": 2,
        "rolls_used": 1,
        "turn_number": 2,
        "game_mode": "single",
        "game_over": false,
        "winner": null,
        "created_at": "2025-03-01T10:00:00.123456"
    }"#;

    fn valid_snapshot() -> GameSnapshot {
        serde_json::from_str(WIRE_SNAPSHOT).unwrap()
    }

    #[test]
    fn snapshot__decodes_service_payload() {
        // when
        let snapshot = valid_snapshot();

        // then
        assert_eq!(snapshot.dice.values, [1, 1, 3, 4, 6]);
        assert_eq!(snapshot.dice.held, [true, true, false, false, false]);
        assert_eq!(snapshot.game_mode, GameMode::Single);
        let player = snapshot.current().unwrap();
        assert_eq!(player.scorecard.score(Category::Ones), Some(2));
        assert!(!player.scorecard.is_scored(Category::Chance));
        assert_eq!(player.scorecard.grand_total, 2);
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn possible_scores__decode_category_keys() {
        // given
        let body = r#"{"ones": 2, "three_of_a_kind": 0, "chance": 15}"#;

        // when
        let scores: PossibleScores = serde_json::from_str(body).unwrap();

        // then
        assert_eq!(scores.get(Category::Ones), Some(2));
        assert_eq!(scores.get(Category::ThreeOfAKind), Some(0));
        assert_eq!(scores.get(Category::Chance), Some(15));
        assert!(!scores.contains(Category::Yahtzee));
    }

    #[test]
    fn possible_scores__empty_object_means_no_choices() {
        let scores: PossibleScores = serde_json::from_str("{}").unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn category__serializes_to_wire_keys() {
        let keys: Vec<String> = Category::ALL
            .iter()
            .map(|c| serde_json::to_value(c).unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            keys,
            vec![
                "ones",
                "twos",
                "threes",
                "fours",
                "fives",
                "sixes",
                "three_of_a_kind",
                "four_of_a_kind",
                "full_house",
                "small_straight",
                "large_straight",
                "yahtzee",
                "chance",
            ]
        );
    }

    #[test]
    fn category__sections_split_six_and_seven() {
        assert_eq!(Category::of_section(Section::Upper).count(), 6);
        assert_eq!(Category::of_section(Section::Lower).count(), 7);
    }

    #[test]
    fn validate__rejects_current_player_out_of_range() {
        // given
        let mut snapshot = valid_snapshot();
        snapshot.current_player = 1;

        // then
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn validate__rejects_game_over_with_unknown_winner() {
        // given
        let mut snapshot = valid_snapshot();
        snapshot.game_over = true;
        snapshot.winner = Some("Nobody".to_string());

        // then
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn validate__accepts_game_over_with_named_winner() {
        // given
        let mut snapshot = valid_snapshot();
        snapshot.game_over = true;
        snapshot.winner = Some("Player 1".to_string());

        // then
        assert!(snapshot.validate().is_ok());
        assert_eq!(snapshot.winner_player().unwrap().id, "p1");
    }

    #[test]
    fn high_score_entry__decodes_timestamp_and_mode() {
        // given
        let body = r#"{"id": "h1", "player_name": "Ann", "score": 254,
            "game_mode": "multiplayer", "created_at": "2025-03-01T10:00:00.5"}"#;

        // when
        let entry: HighScoreEntry = serde_json::from_str(body).unwrap();

        // then
        assert_eq!(entry.game_mode.short_label(), "2P");
        assert_eq!(entry.created_at.unwrap().date().to_string(), "2025-03-01");
    }

    proptest! {
        #[test]
        fn validate__accepts_only_roll_counts_summing_to_three(
            remaining in 0u8..=4,
            used in 0u8..=4,
        ) {
            let mut snapshot = valid_snapshot();
            snapshot.rolls_remaining = remaining;
            snapshot.rolls_used = used;
            prop_assert_eq!(
                snapshot.validate().is_ok(),
                remaining + used == ROLLS_PER_TURN
            );
        }

        #[test]
        fn validate__rejects_any_die_outside_one_to_six(
            index in 0usize..DICE_COUNT,
            value in prop_oneof![Just(0u8), 7u8..=255],
        ) {
            let mut snapshot = valid_snapshot();
            snapshot.dice.values[index] = value;
            prop_assert!(snapshot.validate().is_err());
        }
    }
}
