use crate::game::{
    DICE_COUNT,
    GameSnapshot,
};

/// Which dice the player wants to keep on the next roll. Never authoritative:
/// the service echoes it back in `dice.held` and that echo wins.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct HeldSet([bool; DICE_COUNT]);

impl HeldSet {
    pub const NONE: HeldSet = HeldSet([false; DICE_COUNT]);

    pub fn new(held: [bool; DICE_COUNT]) -> Self {
        HeldSet(held)
    }

    pub fn as_array(&self) -> [bool; DICE_COUNT] {
        self.0
    }

    pub fn is_held(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }
}

/// Local held-die intent between rolls.
///
/// Reconciliation: the client owns the intent between rolls, the service wins
/// on every snapshot swap, and a successful score clears everything.
#[derive(Clone, Debug, Default)]
pub struct HeldSetTracker {
    intent: HeldSet,
}

impl HeldSetTracker {
    pub fn intent(&self) -> HeldSet {
        self.intent
    }

    /// Flips one die. A no-op (returns `false`) once the turn has no rolls
    /// left or when `index` is not a die.
    pub fn toggle(&mut self, index: usize, snapshot: &GameSnapshot) -> bool {
        if snapshot.rolls_remaining == 0 || index >= DICE_COUNT {
            return false;
        }
        self.intent.0[index] = !self.intent.0[index];
        true
    }

    pub fn sync(&mut self, snapshot: &GameSnapshot) {
        self.intent = HeldSet(snapshot.dice.held);
    }

    pub fn clear(&mut self) {
        self.intent = HeldSet::NONE;
    }
}
