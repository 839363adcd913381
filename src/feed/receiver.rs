// Signal Feed Receiver
//
// Reads JSON-line signal records from a named pipe and forwards them onto
// the engine channel, with automatic reconnection and error recovery.
// The feed owns no detection state: it parses, filters out-of-scope
// packages, and sends. Malformed lines are counted and skipped.

use crate::audio::SharedAudioMode;
use crate::signal::{EngineEvent, PhoneState, UiEvent, UiEventKind};
use crate::types::AudioMode;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

const PIPE_PATH: &str = "/tmp/callwatch_pipe";
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Source packages whose UI events are worth forwarding at all: the
/// monitored messaging apps plus the stock dialer surfaces. Everything
/// else is dropped at ingestion, the way the original event source scopes
/// its registration.
const SCOPE_PACKAGES: [&str; 9] = [
    "com.whatsapp",
    "com.whatsapp.w4b",
    "org.telegram.messenger",
    "org.thunderdog.challegram",
    "com.facebook.orca",
    "com.android.dialer",
    "com.google.android.dialer",
    "com.samsung.android.dialer",
    "com.android.incallui",
];

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("signal pipe i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("named pipes are not supported on this platform")]
    Unsupported,
}

/// Wire form of a signal record, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireRecord {
    /// Cellular call-state change.
    Phone { state: PhoneState },
    /// Foreground window transition.
    Window {
        app: String,
        #[serde(default)]
        surface: String,
    },
    /// Notification posted or removed.
    Notification { app: String },
    /// Audio routing mode changed.
    AudioMode { mode: AudioMode },
    /// Host asks for a permission re-check.
    Recheck,
}

/// Configuration for the signal feed.
pub struct FeedConfig {
    pub pipe_path: String,
    pub reconnect_delay: Duration,
    pub max_reconnects: u32,
    pub enable_stats: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            pipe_path: PIPE_PATH.to_string(),
            reconnect_delay: RECONNECT_DELAY,
            max_reconnects: MAX_RECONNECT_ATTEMPTS,
            enable_stats: true,
        }
    }
}

/// Feed receiver statistics.
#[derive(Debug)]
struct FeedStats {
    records_received: u64,
    parse_errors: u64,
    out_of_scope: u64,
    reconnects: u64,
    start_time: Instant,
}

impl FeedStats {
    fn new() -> Self {
        Self {
            records_received: 0,
            parse_errors: 0,
            out_of_scope: 0,
            reconnects: 0,
            start_time: Instant::now(),
        }
    }

    fn log_summary(&self) {
        info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            records = self.records_received,
            parse_errors = self.parse_errors,
            out_of_scope = self.out_of_scope,
            reconnects = self.reconnects,
            "feed statistics"
        );
    }
}

/// How a read session ended.
enum FeedExit {
    /// Writer side closed the pipe; reopen and keep listening.
    WriterClosed,
    /// Engine channel is gone; the feed has nothing left to do.
    ConsumerDisconnected,
}

/// Start the signal feed thread with default configuration.
pub fn start_signal_feed(
    event_sender: Sender<EngineEvent>,
    audio: SharedAudioMode,
) -> thread::JoinHandle<()> {
    start_signal_feed_with_config(event_sender, audio, FeedConfig::default())
}

/// Start the signal feed thread.
pub fn start_signal_feed_with_config(
    event_sender: Sender<EngineEvent>,
    audio: SharedAudioMode,
    config: FeedConfig,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        info!(pipe = %config.pipe_path, "signal feed starting");
        let mut stats = FeedStats::new();
        let mut consecutive_failures: u32 = 0;

        loop {
            match run_feed_session(&event_sender, &audio, &config, &mut stats) {
                Ok(FeedExit::ConsumerDisconnected) => {
                    info!("engine channel closed, feed shutting down");
                    break;
                }
                Ok(FeedExit::WriterClosed) => {
                    // Normal for a FIFO: the writer finished a batch.
                    // Reopen and wait for the next one.
                    debug!("signal pipe closed by writer, reopening");
                    consecutive_failures = 0;
                    if config.enable_stats {
                        stats.log_summary();
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    stats.reconnects += 1;
                    error!(
                        attempt = consecutive_failures,
                        max = config.max_reconnects,
                        "feed session failed: {e}"
                    );

                    if consecutive_failures >= config.max_reconnects {
                        warn!("max feed failures reached, recreating pipe");
                        if let Err(e) = recreate_pipe(&config.pipe_path) {
                            error!("failed to recreate pipe: {e}");
                        }
                        consecutive_failures = 0;
                    }

                    thread::sleep(config.reconnect_delay * consecutive_failures.max(1));
                }
            }
        }

        if config.enable_stats {
            stats.log_summary();
        }
    })
}

/// Run a single read session against the pipe.
fn run_feed_session(
    event_sender: &Sender<EngineEvent>,
    audio: &SharedAudioMode,
    config: &FeedConfig,
    stats: &mut FeedStats,
) -> Result<FeedExit, FeedError> {
    ensure_pipe(&config.pipe_path)?;

    // Opening a FIFO read-only blocks until a writer appears
    let file = OpenOptions::new().read(true).open(&config.pipe_path)?;
    debug!(pipe = %config.pipe_path, "signal pipe open, listening");

    read_records(BufReader::new(file), event_sender, audio, stats)
}

/// Drain records from `reader` into the engine channel until the reader
/// ends or the consumer goes away. Factored over `BufRead` so it can be
/// driven from a buffer in tests.
fn read_records<R: BufRead>(
    reader: R,
    event_sender: &Sender<EngineEvent>,
    audio: &SharedAudioMode,
    stats: &mut FeedStats,
) -> Result<FeedExit, FeedError> {
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: WireRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                stats.parse_errors += 1;
                warn!(error = %e, line = %line, "malformed signal record skipped");
                continue;
            }
        };

        stats.records_received += 1;
        if let Some(event) = translate(record, audio, stats) {
            if event_sender.send(event).is_err() {
                return Ok(FeedExit::ConsumerDisconnected);
            }
        }
    }

    Ok(FeedExit::WriterClosed)
}

/// Turn a wire record into an engine event, or consume it here.
fn translate(
    record: WireRecord,
    audio: &SharedAudioMode,
    stats: &mut FeedStats,
) -> Option<EngineEvent> {
    match record {
        WireRecord::Phone { state } => Some(EngineEvent::Telephony(state)),
        WireRecord::Window { app, surface } => {
            if !in_scope(&app) {
                stats.out_of_scope += 1;
                return None;
            }
            Some(EngineEvent::Ui(UiEvent {
                kind: UiEventKind::WindowTransition,
                app_identity: app,
                surface_identity: surface,
            }))
        }
        WireRecord::Notification { app } => {
            if !in_scope(&app) {
                stats.out_of_scope += 1;
                return None;
            }
            Some(EngineEvent::Ui(UiEvent {
                kind: UiEventKind::NotificationChange,
                app_identity: app,
                surface_identity: String::new(),
            }))
        }
        // Audio mode never reaches the engine as an event: it lands in
        // the shared cell the tracker queries at decision time
        WireRecord::AudioMode { mode } => {
            debug!(?mode, "audio mode update");
            audio.set(mode);
            None
        }
        WireRecord::Recheck => Some(EngineEvent::RecheckPermissions),
    }
}

fn in_scope(app: &str) -> bool {
    SCOPE_PACKAGES.contains(&app)
}

/// Make sure the pipe exists and really is a FIFO.
fn ensure_pipe(path: &str) -> Result<(), FeedError> {
    let pipe_path = Path::new(path);

    if pipe_path.exists() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            let metadata = fs::metadata(pipe_path)?;
            if !metadata.file_type().is_fifo() {
                warn!(path, "path exists but is not a FIFO, recreating");
                fs::remove_file(pipe_path)?;
                create_named_pipe(path)?;
            }
        }
        return Ok(());
    }

    create_named_pipe(path)
}

fn recreate_pipe(path: &str) -> Result<(), FeedError> {
    let pipe_path = Path::new(path);
    if pipe_path.exists() {
        fs::remove_file(pipe_path)?;
        thread::sleep(Duration::from_millis(100));
    }
    create_named_pipe(path)
}

#[cfg(target_os = "linux")]
fn create_named_pipe(path: &str) -> Result<(), FeedError> {
    use nix::sys::stat;
    use nix::unistd;

    match unistd::mkfifo(
        path,
        stat::Mode::S_IRUSR | stat::Mode::S_IWUSR | stat::Mode::S_IWGRP | stat::Mode::S_IWOTH,
    ) {
        Ok(_) => {
            info!(path, "named pipe created");
            Ok(())
        }
        Err(nix::errno::Errno::EEXIST) => Ok(()),
        Err(e) => Err(FeedError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("mkfifo failed: {e}"),
        ))),
    }
}

#[cfg(target_os = "macos")]
fn create_named_pipe(path: &str) -> Result<(), FeedError> {
    use std::process::Command;

    let output = Command::new("mkfifo").arg("-m").arg("622").arg(path).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.contains("File exists") {
            return Err(FeedError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("mkfifo failed: {stderr}"),
            )));
        }
    }
    info!(path, "named pipe created");
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn create_named_pipe(_path: &str) -> Result<(), FeedError> {
    Err(FeedError::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc::channel;

    fn stats() -> FeedStats {
        FeedStats::new()
    }

    #[test]
    fn test_wire_record_parsing() {
        let record: WireRecord =
            serde_json::from_str(r#"{"kind":"phone","state":"offhook"}"#).unwrap();
        assert!(matches!(
            record,
            WireRecord::Phone {
                state: PhoneState::Offhook
            }
        ));

        let record: WireRecord = serde_json::from_str(
            r#"{"kind":"window","app":"com.whatsapp","surface":"com.whatsapp.voipcalling.VoipActivityV2"}"#,
        )
        .unwrap();
        match record {
            WireRecord::Window { app, surface } => {
                assert_eq!(app, "com.whatsapp");
                assert_eq!(surface, "com.whatsapp.voipcalling.VoipActivityV2");
            }
            other => panic!("expected Window, got {:?}", other),
        }

        // Surface may be absent
        let record: WireRecord =
            serde_json::from_str(r#"{"kind":"window","app":"com.whatsapp"}"#).unwrap();
        match record {
            WireRecord::Window { surface, .. } => assert_eq!(surface, ""),
            other => panic!("expected Window, got {:?}", other),
        }

        let record: WireRecord =
            serde_json::from_str(r#"{"kind":"audio_mode","mode":"communication"}"#).unwrap();
        assert!(matches!(
            record,
            WireRecord::AudioMode {
                mode: AudioMode::Communication
            }
        ));

        assert!(serde_json::from_str::<WireRecord>(r#"{"kind":"recheck"}"#).is_ok());
        assert!(serde_json::from_str::<WireRecord>(r#"{"kind":"bogus"}"#).is_err());
    }

    #[test]
    fn test_translate_scope_filter() {
        let audio = SharedAudioMode::new(AudioMode::Normal);
        let mut stats = stats();

        let kept = translate(
            WireRecord::Window {
                app: "com.whatsapp".to_string(),
                surface: "X".to_string(),
            },
            &audio,
            &mut stats,
        );
        assert!(kept.is_some());

        let dropped = translate(
            WireRecord::Window {
                app: "com.spotify.music".to_string(),
                surface: "X".to_string(),
            },
            &audio,
            &mut stats,
        );
        assert!(dropped.is_none());
        assert_eq!(stats.out_of_scope, 1);
    }

    #[test]
    fn test_translate_audio_mode_updates_shared_cell() {
        use crate::audio::AudioModeProbe;

        let audio = SharedAudioMode::new(AudioMode::Normal);
        let mut stats = stats();

        let event = translate(
            WireRecord::AudioMode {
                mode: AudioMode::Communication,
            },
            &audio,
            &mut stats,
        );
        assert!(event.is_none());
        assert_eq!(audio.current_mode(), AudioMode::Communication);
    }

    #[test]
    fn test_read_records_from_buffer() {
        let input = concat!(
            "{\"kind\":\"phone\",\"state\":\"offhook\"}\n",
            "\n",
            "not json at all\n",
            "{\"kind\":\"window\",\"app\":\"com.whatsapp\",\"surface\":\"VoipActivity\"}\n",
            "{\"kind\":\"window\",\"app\":\"com.unrelated.app\",\"surface\":\"MainActivity\"}\n",
            "{\"kind\":\"recheck\"}\n",
        );
        let audio = SharedAudioMode::new(AudioMode::Normal);
        let (tx, rx) = channel();
        let mut stats = stats();

        let exit = read_records(Cursor::new(input), &tx, &audio, &mut stats).unwrap();
        assert!(matches!(exit, FeedExit::WriterClosed));

        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineEvent::Telephony(PhoneState::Offhook)
        ));
        match rx.try_recv().unwrap() {
            EngineEvent::Ui(ui) => {
                assert_eq!(ui.kind, UiEventKind::WindowTransition);
                assert_eq!(ui.app_identity, "com.whatsapp");
            }
            other => panic!("expected Ui, got {:?}", other),
        }
        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineEvent::RecheckPermissions
        ));
        assert!(rx.try_recv().is_err());

        assert_eq!(stats.records_received, 4);
        assert_eq!(stats.parse_errors, 1);
        assert_eq!(stats.out_of_scope, 1);
    }

    #[test]
    fn test_read_records_stops_when_consumer_gone() {
        let audio = SharedAudioMode::new(AudioMode::Normal);
        let (tx, rx) = channel();
        drop(rx);
        let mut stats = stats();

        let input = "{\"kind\":\"phone\",\"state\":\"idle\"}\n";
        let exit = read_records(Cursor::new(input), &tx, &audio, &mut stats).unwrap();
        assert!(matches!(exit, FeedExit::ConsumerDisconnected));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_ensure_pipe_creates_fifo() {
        use std::os::unix::fs::FileTypeExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed_pipe");
        let path = path.to_str().unwrap();

        ensure_pipe(path).unwrap();
        let metadata = fs::metadata(path).unwrap();
        assert!(metadata.file_type().is_fifo());

        // Idempotent on an existing FIFO
        ensure_pipe(path).unwrap();
    }
}
