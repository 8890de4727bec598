use crate::{
    game::GameMode,
    session::Timings,
};
use clap::Parser;
use color_eyre::eyre::{
    Result,
    eyre,
};
use std::{
    path::PathBuf,
    time::Duration,
};

pub const DEFAULT_API_URL: &str = "http://localhost:8001";
const MULTIPLAYER_SEATS: usize = 2;

#[derive(Parser, Debug)]
#[command(version, about = "Terminal client for a remote Yahtzee game service", long_about = None)]
pub struct Args {
    /// Game service root; requests go to `<url>/api`.
    #[arg(long, env = "YAHTZEE_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Player name, repeat for the second seat.
    #[arg(long = "player", value_name = "NAME")]
    pub players: Vec<String>,

    #[arg(long, default_value_t = 500)]
    pub roll_delay_ms: u64,

    #[arg(long, default_value_t = 200)]
    pub score_delay_ms: u64,

    #[arg(long, default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Do not ring the terminal bell on rolls and scores.
    #[arg(long)]
    pub mute: bool,

    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_url: String,
    pub players: Vec<String>,
    pub timings: Timings,
    pub request_timeout: Duration,
    pub mute: bool,
    pub log_dir: PathBuf,
}

impl TryFrom<Args> for AppConfig {
    type Error = color_eyre::eyre::Report;

    fn try_from(args: Args) -> Result<Self> {
        if args.request_timeout_secs == 0 {
            return Err(eyre!("--request-timeout-secs must be at least 1"));
        }
        let mut players = args
            .players
            .iter()
            .map(|raw| {
                let name = raw.trim();
                if name.is_empty() {
                    Err(eyre!("--player names must not be blank"))
                } else {
                    Ok(name.to_string())
                }
            })
            .collect::<Result<Vec<_>>>()?;
        while players.len() < MULTIPLAYER_SEATS {
            players.push(format!("Player {}", players.len() + 1));
        }
        Ok(AppConfig {
            api_url: args.api_url,
            players,
            timings: Timings {
                roll_delay: Duration::from_millis(args.roll_delay_ms),
                score_delay: Duration::from_millis(args.score_delay_ms),
            },
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            mute: args.mute,
            log_dir: args.log_dir,
        })
    }
}

impl AppConfig {
    pub fn player_names(&self, mode: GameMode) -> Vec<String> {
        let seats = match mode {
            GameMode::Single => 1,
            GameMode::Multiplayer => MULTIPLAYER_SEATS,
        };
        self.players.iter().take(seats).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn config(argv: &[&str]) -> Result<AppConfig> {
        let argv = std::iter::once("yahtzee-client").chain(argv.iter().copied());
        let args = Args::try_parse_from(argv)?;
        AppConfig::try_from(args)
    }

    #[test]
    fn try_from__defaults_match_service_and_timings() {
        // when
        let config = config(&[]).unwrap();

        // then
        assert_eq!(config.players, vec!["Player 1", "Player 2"]);
        assert_eq!(config.timings, Timings::default());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert!(!config.mute);
    }

    #[test]
    fn try_from__pads_missing_seat_and_trims_names() {
        // when
        let config = config(&["--player", "  Ada "]).unwrap();

        // then
        assert_eq!(config.player_names(GameMode::Single), vec!["Ada"]);
        assert_eq!(
            config.player_names(GameMode::Multiplayer),
            vec!["Ada", "Player 2"]
        );
    }

    #[test]
    fn try_from__rejects_blank_player() {
        assert!(config(&["--player", "   "]).is_err());
    }

    #[test]
    fn try_from__rejects_zero_timeout() {
        assert!(config(&["--request-timeout-secs", "0"]).is_err());
    }

    #[test]
    fn args__reads_delays_and_mute() {
        // when
        let config = config(&[
            "--api-url",
            "http://games.local:9000",
            "--roll-delay-ms",
            "0",
            "--score-delay-ms",
            "50",
            "--mute",
        ])
        .unwrap();

        // then
        assert_eq!(config.api_url, "http://games.local:9000");
        assert_eq!(config.timings.roll_delay, Duration::ZERO);
        assert_eq!(config.timings.score_delay, Duration::from_millis(50));
        assert!(config.mute);
    }
}
