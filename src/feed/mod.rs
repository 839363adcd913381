// Feed Module - Named-pipe signal ingestion

pub mod receiver;

pub use receiver::{start_signal_feed, start_signal_feed_with_config, FeedConfig, FeedError, WireRecord};
