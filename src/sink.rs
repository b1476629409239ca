//! Snapshot sinks
//!
//! The file sink writes a human-readable status file next to a bounded CSV
//! history log, both derived from one base path.

use crate::error::Result;
use crate::metrics::MetricsSnapshot;
use log::{debug, warn};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Records kept in the CSV history log
pub const DEFAULT_HISTORY_LIMIT: usize = 300;

/// Receives a snapshot on every engine flush
pub trait MetricsSink: Send {
    fn publish(&mut self, snapshot: &MetricsSnapshot) -> Result<()>;
}

/// Status and history file locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub status: PathBuf,
    pub history: PathBuf,
}

impl OutputPaths {
    /// Derive both paths from a base path.
    ///
    /// The status file gets a `.txt` suffix unless it already has one; the
    /// history log replaces that extension with `.csv`. Without a base path
    /// `fps.txt` and `fps.csv` in the working directory are used.
    pub fn from_base(base: Option<&Path>) -> Self {
        let status = match base {
            Some(base) if !base.as_os_str().is_empty() => {
                let has_txt = base
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("txt"))
                    .unwrap_or(false);
                if has_txt {
                    base.to_path_buf()
                } else {
                    let mut name = OsString::from(base.as_os_str());
                    name.push(".txt");
                    PathBuf::from(name)
                }
            }
            _ => PathBuf::from("fps.txt"),
        };
        let history = status.with_extension("csv");
        Self { status, history }
    }
}

/// Writes `fps.txt`-style status files and a bounded CSV history
#[derive(Debug)]
pub struct FileSink {
    paths: OutputPaths,
    history_limit: usize,
}

impl FileSink {
    pub fn new(paths: OutputPaths, history_limit: usize, clear_history_on_start: bool) -> Self {
        let sink = Self {
            paths,
            history_limit: history_limit.max(1),
        };
        if clear_history_on_start {
            if let Err(e) = sink.clear_history() {
                warn!("Failed to clear history log {:?}: {}", sink.paths.history, e);
            }
        }
        sink
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    /// Truncate the history log
    pub fn clear_history(&self) -> Result<()> {
        fs::write(&self.paths.history, b"")?;
        Ok(())
    }

    fn write_status(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let mut text = format!(
            "FPS: {}\nFrametime: {:.2} ms\nLast frametime: {:.2} ms\n",
            snapshot.display_fps(),
            snapshot.frametime_ms,
            snapshot.last_frametime_ms
        );
        if snapshot.tearing_warning() {
            text.push_str("WARNING: tearing detected\n");
        }
        fs::write(&self.paths.status, text)?;
        Ok(())
    }

    fn append_history(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.paths.history)?;
        writeln!(
            file,
            "{},{},{:.2}",
            snapshot.timestamp,
            snapshot.display_fps(),
            snapshot.frametime_ms
        )?;
        drop(file);
        keep_last_lines(&self.paths.history, self.history_limit)
    }
}

impl MetricsSink for FileSink {
    fn publish(&mut self, snapshot: &MetricsSnapshot) -> Result<()> {
        let status = self.write_status(snapshot);
        let history = self.append_history(snapshot);
        status.and(history)
    }
}

/// Rewrite `path` keeping only its last `limit` lines, in order.
///
/// Lines are handled as raw bytes so a corrupted record cannot stop trimming.
fn keep_last_lines(path: &Path, limit: usize) -> Result<()> {
    let mut lines = Vec::new();
    for line in BufReader::new(File::open(path)?).split(b'\n') {
        lines.push(line?);
    }
    if lines.len() <= limit {
        return Ok(());
    }

    let dropped = lines.len() - limit;
    let mut kept = Vec::new();
    for line in &lines[dropped..] {
        kept.extend_from_slice(line);
        kept.push(b'\n');
    }
    fs::write(path, kept)?;
    debug!("Trimmed {} records from {:?}", dropped, path);
    Ok(())
}

/// Publishes to several sinks; every sink is tried, the first error is returned
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn MetricsSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn MetricsSink>) {
        self.sinks.push(sink);
    }
}

impl MetricsSink for FanoutSink {
    fn publish(&mut self, snapshot: &MetricsSnapshot) -> Result<()> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.publish(snapshot) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::AnalyzerError;
    use tempfile::TempDir;

    /// Scratch directory removed when the guard drops
    pub(crate) fn temp_dir(tag: &str) -> TempDir {
        tempfile::Builder::new()
            .prefix(&format!("fps-analyzer-{}-", tag))
            .tempdir()
            .unwrap()
    }

    pub(crate) fn snapshot(timestamp: u64, frametime_ms: f64) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp,
            fps: MetricsSnapshot::fps_from_frametime(frametime_ms),
            instant_fps: 0,
            frametime_ms,
            last_frametime_ms: frametime_ms,
            tearing: None,
            unique_frames: 0,
            total_frames: 0,
        }
    }

    #[test]
    fn default_paths() {
        let paths = OutputPaths::from_base(None);
        assert_eq!(paths.status, PathBuf::from("fps.txt"));
        assert_eq!(paths.history, PathBuf::from("fps.csv"));
        assert_eq!(OutputPaths::from_base(Some(Path::new(""))), paths);
    }

    #[test]
    fn base_path_derivation() {
        let paths = OutputPaths::from_base(Some(Path::new("/tmp/stats/game.TXT")));
        assert_eq!(paths.status, PathBuf::from("/tmp/stats/game.TXT"));
        assert_eq!(paths.history, PathBuf::from("/tmp/stats/game.csv"));

        let paths = OutputPaths::from_base(Some(Path::new("/tmp/stats/game")));
        assert_eq!(paths.status, PathBuf::from("/tmp/stats/game.txt"));
        assert_eq!(paths.history, PathBuf::from("/tmp/stats/game.csv"));

        let paths = OutputPaths::from_base(Some(Path::new("capture.log")));
        assert_eq!(paths.status, PathBuf::from("capture.log.txt"));
        assert_eq!(paths.history, PathBuf::from("capture.log.csv"));
    }

    #[test]
    fn status_file_contents() {
        let dir = temp_dir("status");
        let mut sink = FileSink::new(OutputPaths::from_base(Some(&dir.path().join("fps"))), 300, true);

        let mut snap = snapshot(1_700_000_000, 16.666);
        snap.tearing = Some(true);
        sink.publish(&snap).unwrap();

        let status = fs::read_to_string(&sink.paths().status).unwrap();
        assert_eq!(
            status,
            "FPS: 60\nFrametime: 16.67 ms\nLast frametime: 16.67 ms\nWARNING: tearing detected\n"
        );
        let history = fs::read_to_string(&sink.paths().history).unwrap();
        assert_eq!(history, "1700000000,60,16.67\n");
    }

    #[test]
    fn history_keeps_most_recent_records_in_order() {
        let dir = temp_dir("history");
        let mut sink = FileSink::new(OutputPaths::from_base(Some(&dir.path().join("fps"))), DEFAULT_HISTORY_LIMIT, true);

        for ts in 0..310u64 {
            sink.publish(&snapshot(ts, 20.0)).unwrap();
        }

        let history = fs::read_to_string(&sink.paths().history).unwrap();
        let stamps: Vec<u64> = history
            .lines()
            .map(|line| line.split(',').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(stamps.len(), DEFAULT_HISTORY_LIMIT);
        assert_eq!(stamps, (10..310).collect::<Vec<u64>>());
    }

    #[test]
    fn clear_on_start_truncates_existing_log() {
        let dir = temp_dir("clear");
        let paths = OutputPaths::from_base(Some(&dir.path().join("fps")));
        fs::write(&paths.history, "1,2,3.00\n").unwrap();

        FileSink::new(paths.clone(), 300, false);
        assert_eq!(fs::read_to_string(&paths.history).unwrap(), "1,2,3.00\n");

        FileSink::new(paths.clone(), 300, true);
        assert_eq!(fs::read_to_string(&paths.history).unwrap(), "");
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = temp_dir("missing");
        let paths = OutputPaths::from_base(Some(&dir.path().join("no-such-dir").join("fps")));
        let mut sink = FileSink::new(paths, 300, false);
        assert!(matches!(sink.publish(&snapshot(0, 10.0)), Err(AnalyzerError::Io(_))));
    }

    struct Failing;

    impl MetricsSink for Failing {
        fn publish(&mut self, _snapshot: &MetricsSnapshot) -> Result<()> {
            Err(AnalyzerError::Metrics("down".into()))
        }
    }

    #[test]
    fn fanout_tries_every_sink() {
        let dir = temp_dir("fanout");
        let paths = OutputPaths::from_base(Some(&dir.path().join("fps")));
        let mut fanout = FanoutSink::new();
        fanout.push(Box::new(Failing));
        fanout.push(Box::new(FileSink::new(paths.clone(), 300, true)));

        assert!(fanout.publish(&snapshot(5, 10.0)).is_err());
        assert_eq!(fs::read_to_string(&paths.history).unwrap(), "5,100,10.00\n");
    }

    #[test]
    fn history_with_invalid_utf8_is_still_bounded() {
        let dir = temp_dir("binary");
        let paths = OutputPaths::from_base(Some(&dir.path().join("fps")));
        fs::write(&paths.history, b"\xff\xfe,1,2.00\n0,1,2.00\n\xc3,1,2.00\n").unwrap();

        let mut sink = FileSink::new(paths.clone(), 2, false);
        sink.publish(&snapshot(7, 10.0)).unwrap();
        sink.publish(&snapshot(8, 10.0)).unwrap();

        assert_eq!(fs::read(&paths.history).unwrap(), b"7,100,10.00\n8,100,10.00\n");
    }

    #[test]
    fn trimming_keeps_raw_bytes_of_recent_lines() {
        let dir = temp_dir("raw");
        let path = dir.path().join("log.csv");
        fs::write(&path, b"a\n\xffb\nc\n").unwrap();

        keep_last_lines(&path, 2).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"\xffb\nc\n");
    }
}
