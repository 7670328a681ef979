//! Integration tests for the log data facade.
//!
//! Tests cover:
//! - Initial attach and line access
//! - Watcher-driven partial and full reindexing
//! - Display encoding behaviour
//! - Event ordering guarantees

use logview_common::{BytePos, LineLength, LineNumber, LinesCount};
use logview_core::Encoding;
use logview_data::{
    FileChangeStatus, IndexingStatus, LineAccess, LogData, LogDataEvent,
};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Helper to create a log file with the given content
fn fixture(dir: &TempDir, content: &[u8]) -> PathBuf {
    let path = dir.path().join("test.log");
    std::fs::write(&path, content).unwrap();
    path
}

fn append(path: &PathBuf, content: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(content).unwrap();
    file.sync_all().unwrap();
}

/// Wait for the next loading_finished event, forwarding everything else.
fn wait_finished(events: &Receiver<LogDataEvent>) -> IndexingStatus {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    loop {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .expect("timed out waiting for loading_finished");
        if let LogDataEvent::LoadingFinished(status) =
            events.recv_timeout(remaining).expect("event channel closed")
        {
            return status;
        }
    }
}

/// Wait for the next file_changed event.
fn wait_file_changed(events: &Receiver<LogDataEvent>) -> FileChangeStatus {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    loop {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .expect("timed out waiting for file_changed");
        if let LogDataEvent::FileChanged(status) =
            events.recv_timeout(remaining).expect("event channel closed")
        {
            return status;
        }
    }
}

/// Poll until the facade reports the expected line count.
fn wait_nb_lines(log_data: &LogData, expected: u64) {
    let deadline = Instant::now() + EVENT_TIMEOUT;
    while log_data.nb_lines().get() != expected {
        assert!(
            Instant::now() < deadline,
            "expected {} lines, still at {}",
            expected,
            log_data.nb_lines()
        );
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Create a facade attached to `content`, loaded and ready.
fn attach_and_load(
    dir: &TempDir,
    content: &[u8],
) -> (LogData, Receiver<LogDataEvent>, PathBuf) {
    let path = fixture(dir, content);
    let (log_data, events) = LogData::new().unwrap();
    log_data.attach(&path).unwrap();
    assert_eq!(wait_finished(&events), IndexingStatus::Successful);
    (log_data, events, path)
}

#[test]
fn test_attach_and_read_lines() {
    let dir = TempDir::new().unwrap();
    let (log_data, _events, _path) = attach_and_load(&dir, b"alpha\nbeta\ngamma\n");

    assert_eq!(log_data.nb_lines(), LinesCount(3));
    assert_eq!(log_data.get_line(LineNumber(0)), "alpha");
    assert_eq!(log_data.get_line(LineNumber(1)), "beta");
    assert_eq!(log_data.get_line(LineNumber(2)), "gamma");
    assert_eq!(log_data.max_length(), LineLength(5));
    assert_eq!(log_data.file_size(), BytePos(17));
}

#[test]
fn test_progress_precedes_finished() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, &b"some log line\n".repeat(50_000));

    let (log_data, events) = LogData::new().unwrap();
    log_data.attach(&path).unwrap();

    let mut percents = Vec::new();
    let status = loop {
        match events.recv_timeout(EVENT_TIMEOUT).unwrap() {
            LogDataEvent::LoadingProgressed(percent) => percents.push(percent),
            LogDataEvent::LoadingFinished(status) => break status,
            LogDataEvent::FileChanged(_) => panic!("unexpected file_changed"),
        }
    };

    assert_eq!(status, IndexingStatus::Successful);
    assert!(!percents.is_empty(), "no progress reported");
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(*percents.last().unwrap(), 100);
}

#[test]
fn test_attach_twice_fails() {
    let dir = TempDir::new().unwrap();
    let (log_data, _events, path) = attach_and_load(&dir, b"alpha\n");

    let result = log_data.attach(&path);
    assert!(matches!(
        result,
        Err(logview_data::DataError::AlreadyAttached)
    ));
}

#[test]
fn test_attach_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let (log_data, _events) = LogData::new().unwrap();

    assert!(log_data.attach(dir.path().join("absent.log")).is_err());
    // The facade stays unattached and reusable
    let path = fixture(&dir, b"alpha\n");
    assert!(log_data.attach(&path).is_ok());
}

#[test]
fn test_unattached_facade_is_empty() {
    let (log_data, _events) = LogData::new().unwrap();

    assert_eq!(log_data.nb_lines(), LinesCount(0));
    assert_eq!(log_data.max_length(), LineLength(0));
    assert_eq!(log_data.file_size(), BytePos(0));
    assert_eq!(log_data.last_modified(), None);
    assert_eq!(log_data.get_line(LineNumber(0)), "");
    assert!(log_data.get_lines(LineNumber(0), LinesCount(1)).is_empty());
}

#[test]
fn test_out_of_range_reads_are_empty() {
    let dir = TempDir::new().unwrap();
    let (log_data, _events, _path) = attach_and_load(&dir, b"alpha\nbeta\n");

    assert_eq!(log_data.get_line(LineNumber(2)), "");
    assert_eq!(log_data.get_expanded_line(LineNumber(99)), "");
    assert_eq!(log_data.get_line_length(LineNumber(2)), LineLength(0));
    assert!(log_data.get_lines(LineNumber(1), LinesCount(2)).is_empty());
    assert!(log_data
        .get_expanded_lines(LineNumber(0), LinesCount(3))
        .is_empty());
}

#[test]
fn test_get_lines_matches_get_line() {
    let dir = TempDir::new().unwrap();
    let (log_data, _events, _path) =
        attach_and_load(&dir, b"first\nsecond line\n\nfourth\tcolumn\nfifth");

    let lines = log_data.get_lines(LineNumber(0), LinesCount(5));
    assert_eq!(lines.len(), 5);
    for (offset, line) in lines.iter().enumerate() {
        assert_eq!(*line, log_data.get_line(LineNumber(offset as u64)));
    }

    let expanded = log_data.get_expanded_lines(LineNumber(2), LinesCount(3));
    for (offset, line) in expanded.iter().enumerate() {
        assert_eq!(
            *line,
            log_data.get_expanded_line(LineNumber(2 + offset as u64))
        );
    }
}

#[test]
fn test_empty_count_returns_no_lines() {
    let dir = TempDir::new().unwrap();
    let (log_data, _events, _path) = attach_and_load(&dir, b"alpha\n");

    assert!(log_data.get_lines(LineNumber(0), LinesCount(0)).is_empty());
}

#[test]
fn test_tab_expansion() {
    let dir = TempDir::new().unwrap();
    let (log_data, _events, _path) = attach_and_load(&dir, b"a\tb\n");

    assert_eq!(log_data.get_line(LineNumber(0)), "a\tb");
    assert_eq!(log_data.get_expanded_line(LineNumber(0)), "a       b");
    assert_eq!(log_data.max_length(), LineLength(9));
    assert_eq!(log_data.get_line_length(LineNumber(0)), LineLength(9));
}

#[test]
fn test_final_line_without_terminator() {
    let dir = TempDir::new().unwrap();
    let (log_data, _events, _path) = attach_and_load(&dir, b"one\ntwo");

    assert_eq!(log_data.nb_lines(), LinesCount(2));
    assert_eq!(log_data.get_line(LineNumber(1)), "two");
}

#[test]
fn test_append_triggers_partial_reindex() {
    let dir = TempDir::new().unwrap();
    let (log_data, events, path) = attach_and_load(&dir, b"alpha\nbeta\ngamma\n");

    append(&path, b"delta\n");

    assert_eq!(wait_file_changed(&events), FileChangeStatus::DataAdded);
    assert_eq!(wait_finished(&events), IndexingStatus::Successful);
    wait_nb_lines(&log_data, 4);

    assert_eq!(log_data.get_line(LineNumber(3)), "delta");
    assert_eq!(log_data.get_line(LineNumber(0)), "alpha");
    assert_eq!(log_data.file_size(), BytePos(23));
}

#[test]
fn test_truncation_triggers_full_reindex() {
    let dir = TempDir::new().unwrap();
    let (log_data, events, path) = attach_and_load(&dir, b"alpha\nbeta\ngamma\n");

    std::fs::write(&path, b"alpha\n").unwrap();

    assert_eq!(wait_file_changed(&events), FileChangeStatus::Truncated);
    wait_nb_lines(&log_data, 1);

    assert_eq!(log_data.get_line(LineNumber(0)), "alpha");
    assert_eq!(log_data.file_size(), BytePos(6));
}

#[test]
fn test_reload_reindexes_the_same_file() {
    let dir = TempDir::new().unwrap();
    let (log_data, events, _path) = attach_and_load(&dir, b"alpha\nbeta\n");

    let lines_before = log_data.nb_lines();
    let size_before = log_data.file_size();

    log_data.reload(None);
    assert_eq!(wait_finished(&events), IndexingStatus::Successful);

    assert_eq!(log_data.nb_lines(), lines_before);
    assert_eq!(log_data.file_size(), size_before);
    assert_eq!(log_data.get_line(LineNumber(1)), "beta");
}

#[test]
fn test_reload_with_forced_encoding() {
    let dir = TempDir::new().unwrap();
    let (log_data, events, _path) = attach_and_load(&dir, b"alpha\n");

    log_data.reload(Some(Encoding::Latin1));
    assert_eq!(wait_finished(&events), IndexingStatus::Successful);

    assert_eq!(log_data.get_line(LineNumber(0)), "alpha");
}

#[test]
fn test_detected_encoding_is_reported() {
    let dir = TempDir::new().unwrap();
    let (log_data, _events, _path) = attach_and_load(&dir, "héllo wörld\n".as_bytes());

    assert_eq!(log_data.detected_encoding(), Encoding::Utf8);
}

#[test]
fn test_display_encoding_same_width_class_switches_in_place() {
    let dir = TempDir::new().unwrap();
    let (log_data, events, _path) = attach_and_load(&dir, b"alpha\n");

    // Latin-1 and UTF-8 share code-unit geometry: no reindex needed
    log_data.set_display_encoding(Encoding::Utf8);
    assert_eq!(log_data.display_encoding(), Encoding::Utf8);
    assert_eq!(log_data.get_line(LineNumber(0)), "alpha");
    assert_eq!(log_data.nb_lines(), LinesCount(1));

    // A wide encoding invalidates the line offsets: a reload runs
    log_data.set_display_encoding(Encoding::Utf16Le);
    assert_eq!(log_data.display_encoding(), Encoding::Utf16Le);
    let _ = wait_finished(&events);
}

#[test]
fn test_filtered_view_delegates_to_the_facade() {
    let dir = TempDir::new().unwrap();
    let (log_data, _events, _path) = attach_and_load(&dir, b"alpha\nbeta\n");

    let view = log_data.new_filtered_view();
    assert_eq!(LineAccess::nb_lines(&view), log_data.nb_lines());
    assert_eq!(LineAccess::get_line(&view, LineNumber(0)), "alpha");
    assert_eq!(
        LineAccess::pos_for_line(&view, LineNumber(0)),
        Some(BytePos(6))
    );
    assert_eq!(LineAccess::get_expanded_line(&view, LineNumber(1)), "beta");
}

#[test]
fn test_last_modified_after_load() {
    let dir = TempDir::new().unwrap();
    let (log_data, _events, _path) = attach_and_load(&dir, b"alpha\n");

    assert!(log_data.last_modified().is_some());
}

#[test]
fn test_pos_for_line_reports_line_ends() {
    let dir = TempDir::new().unwrap();
    let (log_data, _events, _path) = attach_and_load(&dir, b"alpha\nbeta\ngamma\n");

    assert_eq!(log_data.pos_for_line(LineNumber(0)), Some(BytePos(6)));
    assert_eq!(log_data.pos_for_line(LineNumber(1)), Some(BytePos(11)));
    assert_eq!(log_data.pos_for_line(LineNumber(2)), Some(BytePos(17)));
    assert_eq!(log_data.pos_for_line(LineNumber(3)), None);
}

#[test]
fn test_drop_while_loading_shuts_down_cleanly() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, &b"x\n".repeat(500_000));

    let (log_data, _events) = LogData::new().unwrap();
    log_data.attach(&path).unwrap();

    // Dropping mid-index must interrupt the pass and join the worker
    drop(log_data);
}

#[test]
fn test_interrupt_then_reload_recovers() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, &b"line of text\n".repeat(100_000));

    let (log_data, events) = LogData::new().unwrap();
    log_data.attach(&path).unwrap();
    log_data.interrupt_loading();

    // Whatever the first pass ended with, a reload makes the data whole
    let _ = wait_finished(&events);
    log_data.reload(None);

    let deadline = Instant::now() + EVENT_TIMEOUT;
    loop {
        assert!(Instant::now() < deadline, "reload never completed");
        if wait_finished(&events) == IndexingStatus::Successful
            && log_data.nb_lines().get() == 100_000
        {
            break;
        }
    }
    assert_eq!(log_data.get_line(LineNumber(99_999)), "line of text");
}
