use crate::{
    game::{
        GameSnapshot,
        HighScoreCandidate,
        PossibleScores,
    },
    held::HeldSet,
    session::{
        HighScoreBoard,
        Screen,
        SessionController,
    },
};

#[derive(Debug, PartialEq)]
pub enum View<'a> {
    Title,
    Game {
        snapshot: &'a GameSnapshot,
        possible: &'a PossibleScores,
        held: HeldSet,
    },
    HighScores(&'a HighScoreBoard),
    /// `Game` screen without a snapshot. Not reachable through the
    /// controller's own transitions.
    Blank,
}

#[derive(Debug, PartialEq)]
pub struct NameEntry<'a> {
    pub candidate: &'a HighScoreCandidate,
    pub input: &'a str,
}

#[derive(Debug, PartialEq)]
pub struct Route<'a> {
    pub view: View<'a>,
    pub loading: bool,
    pub overlay: Option<NameEntry<'a>>,
}

pub fn route(session: &SessionController) -> Route<'_> {
    let view = match (session.screen(), session.snapshot()) {
        (Screen::Title, _) => View::Title,
        (Screen::Game, Some(snapshot)) => View::Game {
            snapshot,
            possible: session.possible_scores(),
            held: session.held(),
        },
        (Screen::Game, None) => View::Blank,
        (Screen::HighScores, _) => View::HighScores(session.board()),
    };
    let overlay = session
        .high_score()
        .name_entry()
        .map(|(candidate, input)| NameEntry { candidate, input });
    Route {
        view,
        loading: session.is_loading(),
        overlay,
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        game::GameMode,
        session::{
            Completion,
            Outcome,
            Timings,
        },
        test_helpers::SnapshotBuilder,
    };

    #[test]
    fn route__title_by_default() {
        let session = SessionController::new(Timings::default());
        let route = route(&session);
        assert_eq!(route.view, View::Title);
        assert!(!route.loading);
        assert!(route.overlay.is_none());
    }

    #[test]
    fn route__title_reports_loading_while_game_starts() {
        // given
        let mut session = SessionController::new(Timings::default());
        session
            .start_game(GameMode::Single, vec!["Player 1".to_string()])
            .unwrap();

        // when
        let route = route(&session);

        // then
        assert_eq!(route.view, View::Title);
        assert!(route.loading);
    }

    #[test]
    fn route__game_view_carries_snapshot_and_held_dice() {
        // given
        let mut session = SessionController::new(Timings::default());
        let start = session
            .start_game(GameMode::Single, vec!["Player 1".to_string()])
            .unwrap();
        session.apply(Completion {
            ticket: start.ticket,
            outcome: Outcome::Created(Ok(SnapshotBuilder::single("g1")
                .rolled(1, [3, 3, 3, 2, 2])
                .held([true, true, true, false, false])
                .build())),
        });

        // when
        let route = route(&session);

        // then
        let View::Game { snapshot, held, .. } = route.view else {
            panic!("expected game view, got {:?}", route.view);
        };
        assert_eq!(snapshot.id, "g1");
        assert_eq!(held, HeldSet::new([true, true, true, false, false]));
    }

    #[test]
    fn route__high_scores_view_shows_board() {
        let mut session = SessionController::new(Timings::default());
        session.show_high_scores().unwrap();
        assert_eq!(
            route(&session).view,
            View::HighScores(&HighScoreBoard::Loading)
        );
    }
}
