//! Tip-follow statistics derived from a batch of moves.

use crate::domain::Move;

/// Counts of offered and followed tips over a move batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TipStats {
    pub received: u32,
    /// Moves where a tip was offered and the player played it.
    pub followed: u32,
}

impl TipStats {
    pub fn from_moves(moves: &[Move]) -> Self {
        moves.iter().fold(Self::default(), |mut stats, mv| {
            if mv.tip_received {
                stats.received += 1;
                if mv.tip_followed {
                    stats.followed += 1;
                }
            }
            stats
        })
    }

    /// Share of offered tips that were followed, in `[0, 100]`.
    pub fn found_percent(&self) -> f64 {
        if self.received == 0 {
            return 0.0;
        }
        100.0 * f64::from(self.followed) / f64::from(self.received)
    }
}
