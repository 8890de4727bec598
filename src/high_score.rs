use crate::game::{
    HighScoreCandidate,
    HighScoreCheck,
    HighScoreSubmission,
};
use tracing::{
    debug,
    info,
};

pub const MAX_NAME_LEN: usize = 20;

/// Post-game interaction: ask the service whether the winner's total
/// qualifies, collect a name if it does, and submit it once.
///
/// `seq` values are the dispatch sequence numbers of the outstanding
/// request, so a reply only lands in the state that asked for it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum HighScoreFlow {
    #[default]
    Idle,
    Checking {
        candidate: HighScoreCandidate,
        seq: u64,
    },
    NameEntry {
        candidate: HighScoreCandidate,
        input: String,
    },
    Submitting {
        candidate: HighScoreCandidate,
        seq: u64,
    },
}

impl HighScoreFlow {
    pub fn begin_check(&mut self, candidate: HighScoreCandidate, seq: u64) {
        if !matches!(self, HighScoreFlow::Idle) {
            debug!(previous = ?self, "high score flow replaced by a newer game");
        }
        *self = HighScoreFlow::Checking { candidate, seq };
    }

    /// Returns `false` when the reply is not the one being waited for.
    pub fn apply_check(&mut self, seq: u64, check: &HighScoreCheck) -> bool {
        let HighScoreFlow::Checking {
            candidate,
            seq: expected,
        } = self
        else {
            return false;
        };
        if *expected != seq {
            return false;
        }
        if check.is_high_score {
            info!(
                score = candidate.score,
                rank = ?check.rank,
                "score qualifies for the high score table"
            );
            *self = HighScoreFlow::NameEntry {
                candidate: candidate.clone(),
                input: String::new(),
            };
        } else {
            *self = HighScoreFlow::Idle;
        }
        true
    }

    pub fn check_failed(&mut self, seq: u64) -> bool {
        match self {
            HighScoreFlow::Checking { seq: expected, .. } if *expected == seq => {
                *self = HighScoreFlow::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn name_entry(&self) -> Option<(&HighScoreCandidate, &str)> {
        match self {
            HighScoreFlow::NameEntry { candidate, input } => Some((candidate, input)),
            _ => None,
        }
    }

    pub fn push_char(&mut self, c: char) {
        if let HighScoreFlow::NameEntry { input, .. } = self
            && !c.is_control()
            && input.chars().count() < MAX_NAME_LEN
        {
            input.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let HighScoreFlow::NameEntry { input, .. } = self {
            input.pop();
        }
    }

    /// Closes the name entry and yields what to send. Refused (`None`) while
    /// the trimmed name is empty.
    pub fn submit(&mut self, seq: u64) -> Option<HighScoreSubmission> {
        let HighScoreFlow::NameEntry { candidate, input } = self else {
            return None;
        };
        let name = input.trim();
        if name.is_empty() {
            return None;
        }
        let submission = HighScoreSubmission {
            player_name: name.to_string(),
            score: candidate.score,
            game_mode: candidate.game_mode,
        };
        *self = HighScoreFlow::Submitting {
            candidate: candidate.clone(),
            seq,
        };
        Some(submission)
    }

    /// Success or failure, the flow ends; there is no retry.
    pub fn submit_finished(&mut self, seq: u64) -> bool {
        match self {
            HighScoreFlow::Submitting { seq: expected, .. } if *expected == seq => {
                *self = HighScoreFlow::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) -> bool {
        if let HighScoreFlow::NameEntry { candidate, .. } = self {
            debug!(score = candidate.score, "high score entry cancelled");
            *self = HighScoreFlow::Idle;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::game::GameMode;

    fn candidate() -> HighScoreCandidate {
        HighScoreCandidate {
            score: 212,
            game_mode: GameMode::Single,
            player_name: "Player 1".to_string(),
        }
    }

    fn qualifying() -> HighScoreCheck {
        HighScoreCheck {
            is_high_score: true,
            rank: Some(3),
        }
    }

    fn in_name_entry(input: &str) -> HighScoreFlow {
        HighScoreFlow::NameEntry {
            candidate: candidate(),
            input: input.to_string(),
        }
    }

    #[test]
    fn apply_check__opens_name_entry_with_candidate_score() {
        // given
        let mut flow = HighScoreFlow::default();
        flow.begin_check(candidate(), 7);

        // when
        let applied = flow.apply_check(7, &qualifying());

        // then
        assert!(applied);
        let (candidate, input) = flow.name_entry().unwrap();
        assert_eq!(candidate.score, 212);
        assert_eq!(input, "");
    }

    #[test]
    fn apply_check__closes_flow_when_score_does_not_qualify() {
        let mut flow = HighScoreFlow::default();
        flow.begin_check(candidate(), 7);
        let check = HighScoreCheck {
            is_high_score: false,
            rank: None,
        };
        assert!(flow.apply_check(7, &check));
        assert_eq!(flow, HighScoreFlow::Idle);
    }

    #[test]
    fn apply_check__ignores_reply_for_other_request() {
        // given
        let mut flow = HighScoreFlow::default();
        flow.begin_check(candidate(), 7);

        // when
        let applied = flow.apply_check(6, &qualifying());

        // then
        assert!(!applied);
        assert!(matches!(flow, HighScoreFlow::Checking { seq: 7, .. }));
    }

    #[test]
    fn push_char__stops_at_max_name_length() {
        // given
        let mut flow = in_name_entry("");

        // when
        for c in "abcdefghijklmnopqrstuvwxyz".chars() {
            flow.push_char(c);
        }

        // then
        let (_, input) = flow.name_entry().unwrap();
        assert_eq!(input, "abcdefghijklmnopqrst");
    }

    #[test]
    fn push_char__ignores_control_characters() {
        let mut flow = in_name_entry("Al");
        flow.push_char('\t');
        flow.backspace();
        assert_eq!(flow.name_entry().unwrap().1, "A");
    }

    #[test]
    fn submit__trims_name_and_closes_entry() {
        // given
        let mut flow = in_name_entry("  Ada  ");

        // when
        let submission = flow.submit(9).unwrap();

        // then
        assert_eq!(submission.player_name, "Ada");
        assert_eq!(submission.score, 212);
        assert_eq!(submission.game_mode, GameMode::Single);
        assert!(flow.name_entry().is_none());
        assert!(flow.submit_finished(9));
        assert_eq!(flow, HighScoreFlow::Idle);
    }

    #[test]
    fn submit__refuses_blank_name() {
        let mut flow = in_name_entry("   ");
        assert!(flow.submit(9).is_none());
        assert!(flow.name_entry().is_some());
    }

    #[test]
    fn cancel__discards_candidate() {
        // given
        let mut flow = in_name_entry("Ada");

        // when
        let cancelled = flow.cancel();

        // then
        assert!(cancelled);
        assert_eq!(flow, HighScoreFlow::Idle);
        assert!(flow.submit(1).is_none());
    }
}
