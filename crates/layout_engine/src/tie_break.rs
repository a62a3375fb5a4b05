use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::config::TieBreakMode;

/// Settles layouts that tie on every rating dimension.
#[derive(Debug, Clone)]
pub enum TieBreaker {
    /// Fair coin flip, fresh entropy per worker
    Random(StdRng),
    /// Fair coin flip, reproducible across runs with the same seed
    Seeded(StdRng),
    /// Always keeps the layout met first
    First,
}

impl TieBreaker {
    pub fn random() -> Self {
        Self::Random(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::Seeded(StdRng::seed_from_u64(seed))
    }

    pub fn from_mode(mode: TieBreakMode, seed: Option<u64>) -> Self {
        match (mode, seed) {
            (TieBreakMode::Random, _) => Self::random(),
            (TieBreakMode::Seeded, Some(seed)) => Self::seeded(seed),
            (TieBreakMode::Seeded, None) => {
                log::warn!("Seeded tie break without a seed, falling back to random");
                Self::random()
            }
            (TieBreakMode::First, _) => Self::First,
        }
    }

    pub fn keep_first(&mut self) -> bool {
        match self {
            Self::Random(rng) | Self::Seeded(rng) => rng.gen_bool(0.5),
            Self::First => true,
        }
    }
}

impl Default for TieBreaker {
    fn default() -> Self {
        Self::random()
    }
}
