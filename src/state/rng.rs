//! Process-wide random source.
//!
//! Every random decision (role permutation, respondent split, correct-answer
//! coin, pseudonym words, choice order) draws from one `GameRng`. Draws are
//! never reseeded from the clock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Shared, lockable ChaCha20 generator.
#[derive(Debug)]
pub struct GameRng {
    inner: Mutex<ChaCha20Rng>,
}

impl GameRng {
    /// Seed from operating-system entropy.
    pub fn from_entropy() -> Self {
        Self {
            inner: Mutex::new(ChaCha20Rng::from_entropy()),
        }
    }

    /// Seed deterministically. Two generators with the same seed produce
    /// identical draws.
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Mutex::new(ChaCha20Rng::seed_from_u64(seed)),
        }
    }

    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Uniformly permute a slice in place.
    pub fn shuffle<T>(&self, items: &mut [T]) {
        items.shuffle(&mut *self.lock());
    }

    /// Fair coin.
    pub fn coin(&self) -> bool {
        self.lock().gen_bool(0.5)
    }

    /// Pick one element uniformly, `None` for an empty slice.
    pub fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, ChaCha20Rng> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_is_deterministic() {
        let a = GameRng::seeded(7);
        let b = GameRng::seeded(7);

        let mut xs = [1, 2, 3, 4, 5];
        let mut ys = [1, 2, 3, 4, 5];
        a.shuffle(&mut xs);
        b.shuffle(&mut ys);
        assert_eq!(xs, ys);
        assert_eq!(a.pick(&[1, 2, 3, 4, 5]), b.pick(&[1, 2, 3, 4, 5]));
        assert_eq!(a.coin(), b.coin());
    }

    #[test]
    fn test_pick_empty() {
        let rng = GameRng::seeded(1);
        let empty: [u8; 0] = [];
        assert!(rng.pick(&empty).is_none());
        assert_eq!(rng.pick(&[9]), Some(&9));
    }

    #[test]
    fn test_coin_is_roughly_fair() {
        let rng = GameRng::seeded(99);
        let heads = (0..10_000).filter(|_| rng.coin()).count();
        assert!((4_500..5_500).contains(&heads), "heads = {}", heads);
    }
}
