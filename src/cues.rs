use std::{
    fmt,
    io::Write,
};
use tracing::debug;

/// Fire-and-forget feedback played right before a roll or score request
/// leaves the client.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Cue {
    Roll,
    Score,
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cue::Roll => write!(f, "roll"),
            Cue::Score => write!(f, "score"),
        }
    }
}

/// Plays a cue. Has no result: a cue that cannot be played is simply lost.
pub trait CuePlayer: Send + Sync {
    fn play(&self, cue: Cue);
}

/// Rings the terminal bell, once for a score and twice for a roll.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalBell;

impl TerminalBell {
    fn bells(cue: Cue) -> &'static [u8] {
        match cue {
            Cue::Roll => b"\x07\x07",
            Cue::Score => b"\x07",
        }
    }
}

impl CuePlayer for TerminalBell {
    fn play(&self, cue: Cue) {
        let mut out = std::io::stdout();
        if let Err(e) = out.write_all(Self::bells(cue)).and_then(|_| out.flush()) {
            debug!(error = %e, %cue, "terminal bell failed");
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl CuePlayer for Silent {
    fn play(&self, _cue: Cue) {}
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn terminal_bell__rings_twice_for_roll_once_for_score() {
        assert_eq!(TerminalBell::bells(Cue::Roll), b"\x07\x07");
        assert_eq!(TerminalBell::bells(Cue::Score), b"\x07");
    }
}
