use crate::game::{
    Category,
    DICE_COUNT,
    GameMode,
    GameSnapshot,
    HighScoreCheck,
    HighScoreEntry,
    HighScoreSubmission,
    PossibleScores,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::{
    Deserialize,
    Serialize,
    de::{
        DeserializeOwned,
        IgnoredAny,
    },
};
use std::{
    fmt,
    future::Future,
    time::Duration,
};

/// The remote game service. It owns dice, scoring and persistence; the
/// client only asks and renders what comes back.
pub trait GameApi {
    fn create_game(
        &self,
        mode: GameMode,
        player_names: &[String],
    ) -> impl Future<Output = Result<GameSnapshot>> + Send;

    fn possible_scores(
        &self,
        game_id: &str,
    ) -> impl Future<Output = Result<PossibleScores>> + Send;

    fn roll(
        &self,
        game_id: &str,
        held_dice: [bool; DICE_COUNT],
    ) -> impl Future<Output = Result<GameSnapshot>> + Send;

    fn score(
        &self,
        game_id: &str,
        category: Category,
    ) -> impl Future<Output = Result<GameSnapshot>> + Send;

    fn high_scores(&self) -> impl Future<Output = Result<Vec<HighScoreEntry>>> + Send;

    fn check_high_score(
        &self,
        score: u32,
    ) -> impl Future<Output = Result<HighScoreCheck>> + Send;

    fn submit_high_score(
        &self,
        submission: &HighScoreSubmission,
    ) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Clone)]
pub struct HttpGameApi {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct CreateGameDto<'a> {
    game_mode: GameMode,
    player_names: &'a [String],
}

#[derive(Serialize)]
struct RollDto<'a> {
    game_id: &'a str,
    held_dice: [bool; DICE_COUNT],
}

#[derive(Serialize)]
struct ScoreDto<'a> {
    game_id: &'a str,
    category: Category,
}

#[derive(Deserialize)]
struct ServiceErrorDto {
    detail: String,
}

impl HttpGameApi {
    /// `backend_url` is the service root; every endpoint lives under `/api`.
    pub fn new(backend_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let backend_url = backend_url.into();
        let root = backend_url.trim_end_matches('/');
        if root.is_empty() {
            return Err(eyre!("game service URL must not be empty"));
        }
        let base_url = format!("{root}/api");
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .wrap_err("failed to build HTTP client for game service")?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .wrap_err_with(|| format!("game service request failed ({what})"))?;
        Self::read_json(res, what).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .wrap_err_with(|| format!("game service request failed ({what})"))?;
        Self::read_json(res, what).await
    }

    async fn read_json<T: DeserializeOwned>(res: reqwest::Response, what: &str) -> Result<T> {
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .wrap_err_with(|| format!("failed to read game service response ({what})"))?;
        if !status.is_success() {
            let detail = serde_json::from_slice::<ServiceErrorDto>(&bytes)
                .map(|dto| dto.detail)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(eyre!(
                "game service responded with {status} when {what}: {detail}"
            ));
        }
        serde_json::from_slice(&bytes)
            .wrap_err_with(|| format!("invalid game service payload ({what})"))
    }
}

impl GameApi for HttpGameApi {
    async fn create_game(
        &self,
        mode: GameMode,
        player_names: &[String],
    ) -> Result<GameSnapshot> {
        let body = CreateGameDto {
            game_mode: mode,
            player_names,
        };
        self.post_json("/games", &body, "creating a game").await
    }

    async fn possible_scores(&self, game_id: &str) -> Result<PossibleScores> {
        let path = format!("/games/{game_id}/possible-scores");
        self.get_json(&path, "fetching possible scores").await
    }

    async fn roll(
        &self,
        game_id: &str,
        held_dice: [bool; DICE_COUNT],
    ) -> Result<GameSnapshot> {
        let path = format!("/games/{game_id}/roll");
        let body = RollDto { game_id, held_dice };
        self.post_json(&path, &body, "rolling dice").await
    }

    async fn score(&self, game_id: &str, category: Category) -> Result<GameSnapshot> {
        let path = format!("/games/{game_id}/score");
        let body = ScoreDto { game_id, category };
        self.post_json(&path, &body, "scoring a category").await
    }

    async fn high_scores(&self) -> Result<Vec<HighScoreEntry>> {
        self.get_json("/high-scores", "listing high scores").await
    }

    async fn check_high_score(&self, score: u32) -> Result<HighScoreCheck> {
        let path = format!("/high-scores/check/{score}");
        self.get_json(&path, "checking a high score").await
    }

    async fn submit_high_score(&self, submission: &HighScoreSubmission) -> Result<()> {
        let _: IgnoredAny = self
            .post_json("/high-scores", submission, "submitting a high score")
            .await?;
        Ok(())
    }
}

impl fmt::Display for HttpGameApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}
