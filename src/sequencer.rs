use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// What to do after the audio output reports that a track played to its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfTrack {
    /// Loop mode: seek the same track back to zero and keep playing.
    Restart(usize),
    /// Move on to this track.
    Advance(usize),
    /// Nothing to play.
    Idle,
}

/// Tracks the current position in a fixed-size track list together with the
/// shuffle and loop flags, and decides which index plays next.
///
/// Indices always refer to the full track list, never to a filtered view.
#[derive(Debug)]
pub struct PlaybackSequencer {
    track_count: usize,
    current: Option<usize>,
    shuffle: bool,
    looping: bool,
    rng: SmallRng,
}

impl PlaybackSequencer {
    pub fn new(track_count: usize) -> Self {
        Self::with_rng(track_count, SmallRng::from_os_rng())
    }

    pub fn with_seed(track_count: usize, seed: u64) -> Self {
        Self::with_rng(track_count, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(track_count: usize, rng: SmallRng) -> Self {
        Self {
            track_count,
            current: None,
            shuffle: false,
            looping: false,
            rng,
        }
    }

    pub fn track_count(&self) -> usize {
        self.track_count
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn is_shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn is_loop(&self) -> bool {
        self.looping
    }

    /// Makes `index` current. Out-of-range indices are ignored.
    pub fn select_track(&mut self, index: usize) -> Option<usize> {
        if index >= self.track_count {
            return None;
        }
        self.current = Some(index);
        Some(index)
    }

    /// Moves forward one step and returns the new current index.
    pub fn advance(&mut self) -> Option<usize> {
        let next = self.next_index()?;
        self.current = Some(next);
        Some(next)
    }

    /// Moves back to the sequential predecessor. Shuffle has no effect here.
    pub fn retreat(&mut self) -> Option<usize> {
        let current = self.current?;
        if self.track_count == 0 {
            return None;
        }
        let prev = (current + self.track_count - 1) % self.track_count;
        self.current = Some(prev);
        Some(prev)
    }

    /// Loop wins over shuffle: a looping track always restarts itself.
    pub fn on_track_ended(&mut self) -> EndOfTrack {
        if self.track_count == 0 {
            return EndOfTrack::Idle;
        }

        if self.looping
            && let Some(current) = self.current
        {
            return EndOfTrack::Restart(current);
        }

        match self.advance() {
            Some(next) => EndOfTrack::Advance(next),
            None => EndOfTrack::Idle,
        }
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }

    pub fn toggle_loop(&mut self) -> bool {
        self.looping = !self.looping;
        self.looping
    }

    fn next_index(&mut self) -> Option<usize> {
        if self.track_count == 0 {
            return None;
        }

        if !self.shuffle {
            return Some(self.current.map_or(0, |current| (current + 1) % self.track_count));
        }

        if self.track_count == 1 {
            return Some(0);
        }

        match self.current {
            // Draw among the other n - 1 slots, then step over the current one.
            Some(current) => {
                let draw = self.rng.random_range(0..self.track_count - 1);
                Some((current + 1 + draw) % self.track_count)
            }
            None => Some(self.rng.random_range(0..self.track_count)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prop_assert;
    use proptest::prop_assert_eq;
    use std::collections::HashSet;

    fn at(track_count: usize, current: usize) -> PlaybackSequencer {
        let mut seq = PlaybackSequencer::with_seed(track_count, 7);
        seq.select_track(current).expect("valid start index");
        seq
    }

    #[test]
    fn advance_then_retreat_returns_to_start() {
        let mut seq = at(5, 2);
        assert_eq!(seq.advance(), Some(3));
        assert_eq!(seq.retreat(), Some(2));
    }

    #[test]
    fn advance_wraps_to_first_track() {
        let mut seq = at(5, 4);
        assert_eq!(seq.advance(), Some(0));
    }

    #[test]
    fn advance_from_nothing_selected_starts_at_zero() {
        let mut seq = PlaybackSequencer::with_seed(3, 1);
        assert_eq!(seq.current(), None);
        assert_eq!(seq.advance(), Some(0));
    }

    #[test]
    fn retreat_wraps_to_last_track() {
        let mut seq = at(5, 0);
        assert_eq!(seq.retreat(), Some(4));
    }

    #[test]
    fn retreat_without_selection_is_noop() {
        let mut seq = PlaybackSequencer::with_seed(3, 1);
        assert_eq!(seq.retreat(), None);
        assert_eq!(seq.current(), None);
    }

    #[test]
    fn select_out_of_range_is_ignored() {
        let mut seq = at(5, 1);
        assert_eq!(seq.select_track(7), None);
        assert_eq!(seq.current(), Some(1));
    }

    #[test]
    fn empty_catalog_never_moves() {
        let mut seq = PlaybackSequencer::with_seed(0, 1);
        seq.toggle_shuffle();
        assert_eq!(seq.advance(), None);
        assert_eq!(seq.retreat(), None);
        assert_eq!(seq.on_track_ended(), EndOfTrack::Idle);
        assert_eq!(seq.select_track(0), None);
        assert_eq!(seq.current(), None);
    }

    #[test]
    fn single_track_shuffle_stays_put() {
        let mut seq = at(1, 0);
        seq.toggle_shuffle();
        for _ in 0..10 {
            assert_eq!(seq.advance(), Some(0));
        }
    }

    #[test]
    fn single_track_end_without_loop_replays_it() {
        let mut seq = at(1, 0);
        seq.toggle_shuffle();
        assert_eq!(seq.on_track_ended(), EndOfTrack::Advance(0));
        assert_eq!(seq.current(), Some(0));
    }

    #[test]
    fn loop_beats_shuffle_on_track_end() {
        let mut seq = at(6, 3);
        seq.toggle_shuffle();
        seq.toggle_loop();
        for _ in 0..20 {
            assert_eq!(seq.on_track_ended(), EndOfTrack::Restart(3));
        }
        assert_eq!(seq.current(), Some(3));
    }

    #[test]
    fn track_end_without_loop_advances() {
        let mut seq = at(3, 2);
        assert_eq!(seq.on_track_ended(), EndOfTrack::Advance(0));
    }

    #[test]
    fn loop_with_nothing_selected_starts_first_track() {
        let mut seq = PlaybackSequencer::with_seed(3, 1);
        seq.toggle_loop();
        assert_eq!(seq.on_track_ended(), EndOfTrack::Advance(0));
    }

    #[test]
    fn toggles_report_new_state() {
        let mut seq = PlaybackSequencer::with_seed(3, 1);
        assert!(seq.toggle_shuffle());
        assert!(!seq.toggle_shuffle());
        assert!(seq.toggle_loop());
        assert!(seq.is_loop());
        assert!(!seq.is_shuffle());
    }

    #[test]
    fn shuffle_reaches_every_other_track() {
        let mut seq = at(5, 0);
        seq.toggle_shuffle();
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let before = seq.current();
            let next = seq.advance().expect("next");
            assert_ne!(Some(next), before);
            seen.insert(next);
        }
        assert_eq!(seen.len(), 5);
    }

    proptest::proptest! {
        #[test]
        fn sequential_cycle_visits_every_index(len in 2usize..64, start in 0usize..64) {
            let start = start % len;
            let mut seq = at(len, start);
            let mut seen = HashSet::new();
            for _ in 0..len {
                seen.insert(seq.advance().expect("next"));
            }
            prop_assert_eq!(seq.current(), Some(start));
            prop_assert_eq!(seen.len(), len);
        }

        #[test]
        fn shuffle_never_repeats_immediately(len in 2usize..64, start in 0usize..64, seed in 0u64..1_000) {
            let mut seq = PlaybackSequencer::with_seed(len, seed);
            seq.select_track(start % len);
            seq.toggle_shuffle();
            for _ in 0..32 {
                let before = seq.current().expect("selected");
                let next = seq.advance().expect("next");
                prop_assert!(next < len);
                prop_assert!(next != before);
            }
        }

        #[test]
        fn retreat_ignores_shuffle(len in 1usize..64, start in 0usize..64) {
            let start = start % len;
            let mut plain = at(len, start);
            let mut shuffled = at(len, start);
            shuffled.toggle_shuffle();
            prop_assert_eq!(plain.retreat(), shuffled.retreat());
        }

        #[test]
        fn indices_stay_in_range(len in 0usize..16, ops in proptest::collection::vec(0u8..6, 1..200)) {
            let mut seq = PlaybackSequencer::with_seed(len, 42);
            for op in ops {
                match op {
                    0 => { let _ = seq.advance(); }
                    1 => { let _ = seq.retreat(); }
                    2 => { let _ = seq.on_track_ended(); }
                    3 => { seq.toggle_shuffle(); }
                    4 => { seq.toggle_loop(); }
                    _ => { let _ = seq.select_track(usize::from(op) * 3); }
                }
                if let Some(current) = seq.current() {
                    prop_assert!(current < len);
                }
            }
            if len == 0 {
                prop_assert_eq!(seq.current(), None);
            }
        }
    }
}
