#![no_main]

use libfuzzer_sys::fuzz_target;
use tracklist::sequencer::{EndOfTrack, PlaybackSequencer};

fuzz_target!(|data: &[u8]| {
    let len = data.first().map_or(0, |byte| usize::from(*byte % 16));
    let mut seq = PlaybackSequencer::with_seed(len, 0);

    for byte in data.iter().skip(1) {
        let before = seq.current();
        match byte % 6 {
            0 => {
                let next = seq.advance();
                if seq.is_shuffle() && len > 1 && before.is_some() {
                    assert_ne!(next, before);
                }
            }
            1 => {
                let _ = seq.retreat();
            }
            2 => {
                if let EndOfTrack::Restart(index) = seq.on_track_ended() {
                    assert_eq!(Some(index), before);
                }
            }
            3 => {
                seq.toggle_shuffle();
            }
            4 => {
                seq.toggle_loop();
            }
            _ => {
                let _ = seq.select_track(usize::from(byte / 6));
            }
        }
        if let Some(current) = seq.current() {
            assert!(current < len);
        }
    }
});
