//! A subscriber's bounded message queue.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;

use crate::live::config::LiveConfig;
use crate::live::jitter::JitterCorrector;
use crate::live::shared_message::{MessageKind, SharedMessage};

/// Result of enqueueing a message into a [`Consumer`]'s queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The message was appended without the queue exceeding its duration budget.
    Ok,
    /// The queue exceeded its duration budget and was shrunk to the newest keyframe.
    Shrunk,
    /// The queue exceeded its duration budget and the oldest messages were dropped.
    Dropped,
}

struct QueueState {
    messages: VecDeque<SharedMessage>,
    closed: bool,
    audio_jitter: JitterCorrector,
    video_jitter: JitterCorrector,
}

/// A single player's view of a [`LiveSource`](super::source::LiveSource).
///
/// Messages are pushed in by the source on the publish side and drained out by the
/// session driving the player's connection. The queue never blocks the publisher:
/// when it exceeds its configured duration, old messages are dropped per the
/// overflow policy rather than the publish side being slowed down.
///
/// Each consumer owns its own jitter corrector rather than sharing the source's: the
/// source hands every consumer the same raw, publisher-timestamped messages, and each
/// consumer independently decides (via `atc`) whether to pass those timestamps through
/// or rewrite them onto a monotonic clock.
pub struct Consumer {
    state: Mutex<QueueState>,
    notify: Notify,
    max_duration: Duration,
    atc: bool,
    mix_correct: bool,
}

impl Consumer {
    /// Creates an empty consumer queue configured from `config`.
    pub fn new(config: &LiveConfig) -> Self {
        let mode = config.jitter_mode();
        Self {
            state: Mutex::new(QueueState {
                messages: VecDeque::new(),
                closed: false,
                audio_jitter: JitterCorrector::new(mode),
                video_jitter: JitterCorrector::new(mode),
            }),
            notify: Notify::new(),
            max_duration: config.queue_length,
            atc: config.atc,
            mix_correct: config.mix_correct,
        }
    }

    /// Appends a message, rewriting its timestamp per this consumer's jitter/atc
    /// settings and applying the overflow policy if the queue has grown past its
    /// duration budget. Never blocks.
    pub fn enqueue(&self, msg: SharedMessage) -> EnqueueOutcome {
        let mut state = self.state.lock().unwrap();

        let corrected = if self.atc {
            msg.timestamp
        } else if self.mix_correct {
            state.audio_jitter.correct(msg.timestamp)
        } else {
            match msg.kind {
                MessageKind::Audio => state.audio_jitter.correct(msg.timestamp),
                MessageKind::Video => state.video_jitter.correct(msg.timestamp),
                MessageKind::Amf0 => msg.timestamp,
            }
        };

        state.messages.push_back(msg.with_timestamp(corrected));

        let outcome = Self::enforce_budget(&mut state.messages, self.max_duration);
        drop(state);

        self.notify.notify_one();
        outcome
    }

    fn enforce_budget(messages: &mut VecDeque<SharedMessage>, max_duration: Duration) -> EnqueueOutcome {
        let max_ms = max_duration.as_millis() as u32;

        let Some(first) = messages.front() else {
            return EnqueueOutcome::Ok;
        };
        let Some(last) = messages.back() else {
            return EnqueueOutcome::Ok;
        };

        if last.timestamp.wrapping_sub(first.timestamp) <= max_ms {
            return EnqueueOutcome::Ok;
        }

        let has_video = messages.iter().any(|m| m.kind == MessageKind::Video);
        if has_video {
            // Shrink to the newest keyframe: find its index and drop everything before it.
            if let Some(idx) = messages.iter().rposition(|m| m.is_keyframe()) {
                messages.drain(..idx);
            }
            EnqueueOutcome::Shrunk
        } else {
            while messages.len() > 1 {
                let first = messages.front().unwrap();
                let last = messages.back().unwrap();
                if last.timestamp.wrapping_sub(first.timestamp) <= max_ms {
                    break;
                }
                messages.pop_front();
            }
            EnqueueOutcome::Dropped
        }
    }

    /// Marks the queue as closed, e.g. because the source unpublished. Wakes any
    /// pending [`Consumer::drain`] call so it can observe end-of-stream.
    pub fn close(&self) {
        self.state.lock().unwrap().closed = true;
        self.notify.notify_one();
    }

    /// Waits for at least one message (or closure) and returns everything currently
    /// queued. Returns an empty vec only when the queue has been closed and drained.
    pub async fn drain(&self) -> Vec<SharedMessage> {
        loop {
            {
                let mut state = self.state.lock().unwrap();
                if !state.messages.is_empty() {
                    return state.messages.drain(..).collect();
                }
                if state.closed {
                    return Vec::new();
                }
            }
            self.notify.notified().await;
        }
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::live::config::JitterMode;

    fn config_with_queue(millis: u64) -> LiveConfig {
        LiveConfig {
            queue_length: Duration::from_millis(millis),
            ..LiveConfig::default()
        }
    }

    fn video(ts: u32, keyframe: bool) -> SharedMessage {
        let first_byte = if keyframe { 0x17 } else { 0x27 };
        SharedMessage::new(MessageKind::Video, ts, Bytes::from(vec![first_byte, 0x01]))
    }

    #[tokio::test]
    async fn test_enqueue_and_drain() {
        let consumer = Consumer::new(&config_with_queue(1000));
        assert_eq!(consumer.enqueue(video(0, true)), EnqueueOutcome::Ok);
        assert_eq!(consumer.enqueue(video(10, false)), EnqueueOutcome::Ok);

        let drained = consumer.drain().await;
        assert_eq!(drained.len(), 2);
    }

    #[tokio::test]
    async fn test_drain_returns_empty_after_close() {
        let consumer = Consumer::new(&config_with_queue(1000));
        consumer.close();
        let drained = consumer.drain().await;
        assert!(drained.is_empty());
    }

    #[test]
    fn test_overflow_shrinks_to_keyframe_for_video() {
        let consumer = Consumer::new(&config_with_queue(100));
        consumer.enqueue(video(0, true));
        consumer.enqueue(video(50, false));
        let outcome = consumer.enqueue(video(500, true));
        assert_eq!(outcome, EnqueueOutcome::Shrunk);

        let messages = consumer.state.lock().unwrap();
        assert_eq!(messages.messages.len(), 1);
        assert!(messages.messages[0].is_keyframe());
    }

    #[test]
    fn test_overflow_drops_oldest_without_video() {
        let consumer = Consumer::new(&config_with_queue(100));
        for ts in [0, 40, 80, 500] {
            consumer.enqueue(SharedMessage::new(MessageKind::Audio, ts, Bytes::from_static(&[0xAF, 0x01])));
        }

        let messages = consumer.state.lock().unwrap();
        let first = messages.messages.front().unwrap();
        let last = messages.messages.back().unwrap();
        assert!(last.timestamp - first.timestamp <= 100);
    }

    #[test]
    fn test_atc_passes_timestamp_through_unmodified() {
        let config = LiveConfig {
            atc: true,
            ..config_with_queue(1000)
        };
        let consumer = Consumer::new(&config);
        consumer.enqueue(video(1_000_000, true));

        let messages = consumer.state.lock().unwrap();
        assert_eq!(messages.messages[0].timestamp, 1_000_000);
    }

    #[test]
    fn test_non_atc_applies_jitter_correction() {
        let config = LiveConfig {
            atc: false,
            time_jitter: JitterMode::Full,
            ..config_with_queue(1000)
        };
        let consumer = Consumer::new(&config);
        consumer.enqueue(video(1000, true));
        consumer.enqueue(video(1000 + 10_000, false));

        let messages = consumer.state.lock().unwrap();
        // The huge forward jump is clamped by the jitter corrector, not passed through.
        assert_eq!(messages.messages[1].timestamp, 1000 + crate::live::jitter::MAX_JUMP_MS);
    }
}
