//! Timestamp jitter correction.
//!
//! Publishers reconnect, clocks drift, and individual messages can arrive with
//! timestamps that jump backwards or leap far ahead of the previous one. A jitter
//! corrector turns an arbitrary input timestamp sequence into a monotonically
//! non-decreasing output sequence suitable for a downstream player's clock.

use crate::live::config::JitterMode;

/// Clamp applied to a single step between two corrected timestamps.
pub const MAX_JUMP_MS: u32 = 250;

/// Per-stream jitter correction state.
///
/// [`JitterMode::Full`] and [`JitterMode::Zero`] both track the previous input and
/// output timestamp and clamp the delta between consecutive corrected outputs to
/// [`MAX_JUMP_MS`]. They differ only in what the first correction produces.
#[derive(Debug, Clone)]
pub struct JitterCorrector {
    mode: JitterMode,
    state: Option<State>,
}

#[derive(Debug, Clone, Copy)]
struct State {
    last_input: u32,
    last_output: u32,
}

impl JitterCorrector {
    /// Creates a new corrector in the given mode.
    pub fn new(mode: JitterMode) -> Self {
        Self { mode, state: None }
    }

    /// Corrects a single input timestamp, advancing internal state.
    pub fn correct(&mut self, input: u32) -> u32 {
        match self.mode {
            JitterMode::Off => input,
            JitterMode::Full | JitterMode::Zero => {
                let Some(state) = self.state else {
                    let first_output = if self.mode == JitterMode::Zero { 0 } else { input };
                    self.state = Some(State {
                        last_input: input,
                        last_output: first_output,
                    });
                    return first_output;
                };

                let delta = input.wrapping_sub(state.last_input) as i32;
                let delta = delta.clamp(0, MAX_JUMP_MS as i32) as u32;
                let output = state.last_output.wrapping_add(delta);

                self.state = Some(State {
                    last_input: input,
                    last_output: output,
                });

                output
            }
        }
    }

    /// Resets correction state, as if no message had ever been corrected.
    ///
    /// Called when a publisher reconnects with `atc` disabled, so the new stream's
    /// first timestamp doesn't get clamped relative to the previous publisher's last
    /// one.
    pub fn reset(&mut self) {
        self.state = None;
    }
}
