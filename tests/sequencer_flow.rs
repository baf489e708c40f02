use tracklist::sequencer::{EndOfTrack, PlaybackSequencer};

#[test]
fn next_then_previous_from_middle() {
    let mut seq = PlaybackSequencer::new(5);
    seq.select_track(2);

    assert_eq!(seq.advance(), Some(3));
    assert_eq!(seq.retreat(), Some(2));
}

#[test]
fn next_wraps_around_at_end() {
    let mut seq = PlaybackSequencer::new(5);
    seq.select_track(4);
    assert_eq!(seq.advance(), Some(0));
}

#[test]
fn single_track_shuffle_end_stays_on_it() {
    let mut seq = PlaybackSequencer::new(1);
    seq.select_track(0);
    seq.toggle_shuffle();

    assert_eq!(seq.on_track_ended(), EndOfTrack::Advance(0));
    assert_eq!(seq.current(), Some(0));
}

#[test]
fn out_of_range_select_keeps_position() {
    let mut seq = PlaybackSequencer::new(5);
    seq.select_track(1);
    assert_eq!(seq.select_track(7), None);
    assert_eq!(seq.current(), Some(1));
}

#[test]
fn toggling_mid_track_only_affects_next_decision() {
    let mut seq = PlaybackSequencer::with_seed(4, 99);
    seq.select_track(1);
    seq.toggle_loop();
    assert_eq!(seq.current(), Some(1));
    assert_eq!(seq.on_track_ended(), EndOfTrack::Restart(1));

    seq.toggle_loop();
    assert_eq!(seq.on_track_ended(), EndOfTrack::Advance(2));
}
