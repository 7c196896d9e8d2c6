use std::fs;
use std::path::Path;

use super::format::*;
use super::playback::*;
use super::session::*;
use crate::db::Database;
use crate::identity::identify_file;
use crate::store::{DisplayMode, StateStore};

fn test_store() -> StateStore {
    let db = Database::open_in_memory().expect("in-memory database should open");
    db.migrate().expect("migration should succeed");
    StateStore::new(db)
}

#[test]
fn parse_watch_later_reads_start_and_speed() {
    let raw = "start=42.500000\nspeed=1.500000\n";
    let snapshot = parse_watch_later(raw).expect("entry should parse");
    assert_eq!(snapshot.position_seconds, 42.5);
    assert_eq!(snapshot.playback_rate, 1.5);
}

#[test]
fn parse_watch_later_defaults_speed_to_one() {
    let snapshot = parse_watch_later("start=10\n").expect("entry should parse");
    assert_eq!(snapshot.position_seconds, 10.0);
    assert_eq!(snapshot.playback_rate, 1.0);
}

#[test]
fn parse_watch_later_requires_a_start_line() {
    assert!(parse_watch_later("speed=2.0\n").is_none());
    assert!(parse_watch_later("").is_none());
}

#[test]
fn parse_watch_later_skips_comments_and_unknown_keys() {
    let raw = "# redirect entry\nvid=0\nstart=5.25\naudio-delay=0\nspeed=2\n";
    let snapshot = parse_watch_later(raw).expect("entry should parse");
    assert_eq!(snapshot.position_seconds, 5.25);
    assert_eq!(snapshot.playback_rate, 2.0);
}

#[test]
fn parse_watch_later_clamps_out_of_range_values() {
    let snapshot = parse_watch_later("start=-3\nspeed=99\n").expect("entry should parse");
    assert_eq!(snapshot.position_seconds, 0.0);
    assert_eq!(snapshot.playback_rate, 16.0);
}

#[test]
fn format_position_renders_minutes_and_seconds() {
    assert_eq!(format_position(0.0), "0:00");
    assert_eq!(format_position(42.5), "0:42");
    assert_eq!(format_position(61.0), "1:01");
    assert_eq!(format_position(600.0), "10:00");
}

#[test]
fn format_position_includes_hours_only_when_nonzero() {
    assert_eq!(format_position(3600.0), "1:00:00");
    assert_eq!(format_position(3725.0), "1:02:05");
    assert_eq!(format_position(3599.0), "59:59");
}

#[test]
fn format_position_treats_negative_as_zero() {
    assert_eq!(format_position(-12.0), "0:00");
}

#[test]
fn format_position_with_mode_tags_remaining() {
    assert_eq!(
        format_position_with_mode(90.0, DisplayMode::Elapsed),
        "1:30"
    );
    assert_eq!(
        format_position_with_mode(90.0, DisplayMode::Remaining),
        "1:30 (rem.)"
    );
}

#[test]
fn clamp_rate_keeps_value_inside_player_range() {
    assert_eq!(clamp_rate(1.5), 1.5);
    assert_eq!(clamp_rate(0.01), MIN_RATE);
    assert_eq!(clamp_rate(100.0), MAX_RATE);
}

#[test]
fn clamp_rate_falls_back_to_normal_speed() {
    assert_eq!(clamp_rate(0.0), 1.0);
    assert_eq!(clamp_rate(-2.0), 1.0);
    assert_eq!(clamp_rate(f64::NAN), 1.0);
}

#[test]
fn format_last_opened_display_handles_out_of_range_timestamp() {
    assert_eq!(format_last_opened_display(i64::MAX), "-");
}

#[test]
fn truncate_shortens_long_titles() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a very long video title", 10), "a very ...");
}

#[test]
fn is_video_file_checks_extension_case_insensitively() {
    assert!(is_video_file(Path::new("clip.mp4")));
    assert!(is_video_file(Path::new("clip.MKV")));
    assert!(!is_video_file(Path::new("notes.txt")));
    assert!(!is_video_file(Path::new("noextension")));
}

#[test]
fn file_title_strips_the_extension() {
    assert_eq!(file_title(Path::new("/tmp/my clip.mp4")), "my clip");
    assert_eq!(file_title(Path::new("archive.tar.mp4")), "archive.tar");
}

#[test]
fn open_rejects_non_video_files() {
    let store = test_store();
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("notes.txt");
    fs::write(&path, b"not a video").expect("file should be written");

    let mut session = PlayerSession::new(&store);
    assert!(session.open(&path).is_err());
}

#[test]
fn open_play_save_reopen_scenario() {
    let store = test_store();
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("clip.mp4");
    fs::write(&path, b"clip bytes").expect("file should be written");

    let mut session = PlayerSession::new(&store);
    let restored = session.open(&path).expect("open should succeed");
    assert!(restored.is_none());

    session
        .record_progress(42.5, 1.5)
        .expect("progress should be saved");

    // Same bytes under a different name resolve to the same saved state.
    let copy = dir.path().join("clip_copy.mp4");
    fs::write(&copy, b"clip bytes").expect("copy should be written");
    let mut second = PlayerSession::new(&store);
    let restored = second
        .open(&copy)
        .expect("open should succeed")
        .expect("saved state should be restored");
    assert_eq!(restored.position_seconds, 42.5);
    assert_eq!(restored.playback_rate, 1.5);
    assert_eq!(second.identity(), session.identity());
}

#[test]
fn finished_clears_the_saved_position() {
    let store = test_store();
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("clip.mp4");
    fs::write(&path, b"clip bytes").expect("file should be written");

    let mut session = PlayerSession::new(&store);
    session.open(&path).expect("open should succeed");
    session
        .record_progress(42.5, 1.5)
        .expect("progress should be saved");

    let identity = session.identity().expect("session should have a file").clone();
    assert!(store.has(&identity).expect("has should succeed"));

    session.finished().expect("finish should succeed");
    assert!(!store.has(&identity).expect("has should succeed"));
}

#[test]
fn record_progress_stores_display_metadata() {
    let store = test_store();
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("holiday.mp4");
    fs::write(&path, b"holiday bytes").expect("file should be written");

    let mut session = PlayerSession::new(&store);
    session.open(&path).expect("open should succeed");
    session
        .record_progress(10.0, 1.0)
        .expect("progress should be saved");

    let identity = session.identity().expect("session should have a file");
    let record = store.load(identity).expect("record should load");
    assert_eq!(record.title.as_deref(), Some("holiday"));
    assert_eq!(record.path.as_deref(), Some(path.as_path()));
    assert_eq!(record.display_mode, DisplayMode::Elapsed);
}

#[test]
fn record_progress_clamps_position_and_rate() {
    let store = test_store();
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("clip.mp4");
    fs::write(&path, b"clip bytes").expect("file should be written");

    let mut session = PlayerSession::new(&store);
    session.open(&path).expect("open should succeed");
    session
        .record_progress(-5.0, 0.0)
        .expect("progress should be saved");

    let identity = session.identity().expect("session should have a file");
    let record = store.load(identity).expect("record should load");
    assert_eq!(record.position_seconds, 0.0);
    assert_eq!(record.playback_rate, 1.0);
}

#[test]
fn open_discards_a_corrupt_record() {
    let store = test_store();
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("clip.mp4");
    fs::write(&path, b"clip bytes").expect("file should be written");

    let identity = identify_file(&path).expect("file should hash");
    store
        .backend()
        .set(identity.as_str(), "{not json")
        .expect("raw set should succeed");

    let mut session = PlayerSession::new(&store);
    let restored = session.open(&path).expect("open should succeed");
    assert!(restored.is_none());
    assert!(!store.has(&identity).expect("has should succeed"));
}

#[test]
fn open_preserves_the_stored_display_mode() {
    let store = test_store();
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("clip.mp4");
    fs::write(&path, b"clip bytes").expect("file should be written");

    let mut session = PlayerSession::new(&store);
    session.open(&path).expect("open should succeed");
    session
        .record_progress(30.0, 1.0)
        .expect("progress should be saved");

    let identity = session.identity().expect("session should have a file").clone();
    let mut record = store.load(&identity).expect("record should load");
    record.display_mode = DisplayMode::Remaining;
    store.save(&identity, &record).expect("save should succeed");

    let mut second = PlayerSession::new(&store);
    second.open(&path).expect("open should succeed");
    second
        .record_progress(45.0, 1.0)
        .expect("progress should be saved");
    let updated = store.load(&identity).expect("record should load");
    assert_eq!(updated.display_mode, DisplayMode::Remaining);
}
