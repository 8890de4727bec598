use crate::{
    api_client::GameApi,
    cues::CuePlayer,
    session::{
        Completion,
        Dispatch,
        Outcome,
        Request,
    },
};
use std::sync::Arc;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time,
};
use tracing::debug;

/// Runs one dispatch to completion: cue, presentation delay, then the
/// request. The delay holds back the request, never its reply.
pub async fn perform<A>(api: &A, cues: &dyn CuePlayer, dispatch: Dispatch) -> Completion
where
    A: GameApi + Sync,
{
    let Dispatch {
        ticket,
        cue,
        delay,
        request,
    } = dispatch;
    if let Some(cue) = cue {
        cues.play(cue);
    }
    if !delay.is_zero() {
        time::sleep(delay).await;
    }
    debug!(seq = ticket.seq, ?request, "sending request");
    let outcome = match request {
        Request::CreateGame { mode, player_names } => {
            Outcome::Created(api.create_game(mode, &player_names).await)
        }
        Request::PossibleScores { game_id } => {
            Outcome::PossibleScores(api.possible_scores(&game_id).await)
        }
        Request::Roll { game_id, held } => {
            Outcome::Rolled(api.roll(&game_id, held.as_array()).await)
        }
        Request::Score { game_id, category } => {
            Outcome::Scored(api.score(&game_id, category).await)
        }
        Request::ListHighScores => Outcome::HighScores(api.high_scores().await),
        Request::CheckHighScore { score } => {
            Outcome::Checked(api.check_high_score(score).await)
        }
        Request::SubmitHighScore(submission) => {
            Outcome::Submitted(api.submit_high_score(&submission).await)
        }
    };
    Completion { ticket, outcome }
}

/// Performs `dispatch` on its own task and posts the completion to `done`.
pub fn spawn<A>(
    api: A,
    cues: Arc<dyn CuePlayer>,
    dispatch: Dispatch,
    done: mpsc::UnboundedSender<Completion>,
) -> JoinHandle<()>
where
    A: GameApi + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let completion = perform(&api, cues.as_ref(), dispatch).await;
        if done.send(completion).is_err() {
            debug!("completion receiver dropped");
        }
    })
}
