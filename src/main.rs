// callwatch daemon
//
// Wires the detection engine to the named-pipe signal feed and logs every
// emitted call-ended event in place of the external notifier/recorder
// collaborator.

use callwatch::{
    start_engine, start_signal_feed, AudioMode, DetectionEngine, EventEmitter, SharedAudioMode,
    StaticPermission,
};
use std::sync::mpsc::channel;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (event_tx, event_rx) = channel();
    let (ended_tx, ended_rx) = channel();

    // The daemon has no live platform audio stack of its own: the feed
    // keeps this cell current from audio_mode records
    let audio = SharedAudioMode::new(AudioMode::Other);

    let engine = DetectionEngine::new(
        Box::new(audio.clone()),
        Box::new(StaticPermission(true)),
        EventEmitter::new(ended_tx),
    );

    let _engine_handle = start_engine(event_rx, engine);
    let _feed_handle = start_signal_feed(event_tx, audio);

    // Stand-in consumer for the external notifier collaborator
    for ended in ended_rx {
        info!(
            channel = ?ended.channel,
            duration_ms = ended.duration_ms,
            source = %ended.source_identity,
            "call ended"
        );
    }
}
