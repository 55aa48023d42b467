//! Tunables for the live source graph.

use std::time::Duration;

/// Timestamp jitter correction strategy, see [`crate::live::jitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JitterMode {
    /// Clamp timestamp jumps, starting from the first observed timestamp.
    #[default]
    Full,
    /// Like [`JitterMode::Full`] but the first corrected timestamp is zero.
    Zero,
    /// Pass timestamps through unmodified.
    Off,
}

/// How [`LiveSource::on_publish`](super::source::LiveSource::on_publish) handles a
/// publish request while another publisher already holds the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishPolicy {
    /// Fail the new publish attempt with `LiveError::StreamBusy`.
    #[default]
    Reject,
    /// Evict the current publisher and hand the slot to the new one.
    Replace,
}

/// Configuration shared by every [`LiveSource`](super::source::LiveSource) created
/// through a [`Registry`](super::registry::Registry).
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Outbound chunk size advertised to players.
    pub chunk_size: usize,
    /// Maximum duration a consumer's queue may hold before the overflow policy kicks in.
    pub queue_length: Duration,
    /// Whether to retain a GOP cache so new consumers don't wait for the next keyframe.
    pub gop_cache: bool,
    /// Absolute timestamp continuity: when true, jitter correction is disabled.
    pub atc: bool,
    /// Jitter correction strategy used when `atc` is false.
    pub time_jitter: JitterMode,
    /// When true, audio and video share a single jitter clock instead of independent ones.
    pub mix_correct: bool,
    /// How long a play loop accumulates drained messages before writing them as one
    /// batch, amortizing the write syscall cost. Zero disables batching.
    pub mw_latency: Duration,
    /// Maximum time to wait for a publisher's first media message.
    pub publish_first_packet_timeout: Duration,
    /// Maximum allowed gap between a publisher's messages before it is considered stalled.
    pub publish_normal_timeout: Duration,
    /// What to do when a second publisher targets a stream key that already has one.
    pub exclusive_agent: PublishPolicy,
    /// Delay before a forwarder retries a failed upstream connection.
    pub forwarder_retry_interval: Duration,
    /// Whether an embedder should set `TCP_NODELAY` on accepted sockets. The core
    /// itself is transport-generic (`ServerSession<S, H>`) and cannot apply this;
    /// it is read by the embedder at accept time, e.g. `crates/rtmp/examples/src/basic.rs`.
    pub tcp_nodelay: bool,
}

impl LiveConfig {
    /// The jitter mode actually in effect, folding `atc` into `time_jitter`.
    pub fn jitter_mode(&self) -> JitterMode {
        if self.atc { JitterMode::Off } else { self.time_jitter }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            chunk_size: 60000,
            queue_length: Duration::from_secs(30),
            gop_cache: true,
            atc: false,
            time_jitter: JitterMode::Full,
            mix_correct: false,
            mw_latency: Duration::from_millis(350),
            publish_first_packet_timeout: Duration::from_secs(20),
            publish_normal_timeout: Duration::from_secs(5),
            exclusive_agent: PublishPolicy::Reject,
            forwarder_retry_interval: Duration::from_secs(3),
            tcp_nodelay: false,
        }
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_mode_folds_atc() {
        let mut config = LiveConfig { atc: true, ..LiveConfig::default() };
        assert_eq!(config.jitter_mode(), JitterMode::Off);

        config.atc = false;
        assert_eq!(config.jitter_mode(), JitterMode::Full);
    }
}
