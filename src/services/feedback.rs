//! Outcome feedback (audio tone / haptic pulse)
//!
//! Feedback is cosmetic: best-effort, synchronous, and never part of the
//! correctness contract. Duplicate and error use different multi-pulse
//! patterns so an operator can tell them apart without looking at the
//! screen.

use serde::Serialize;
use utoipa::ToSchema;

/// Outcome class driving the pulse pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Feedback {
    Success,
    Duplicate,
    Error,
}

impl Feedback {
    /// Vibration pattern in milliseconds: [pulse, pause, pulse, ...]
    pub fn pulse_pattern(self) -> &'static [u64] {
        match self {
            Feedback::Success => &[200],
            Feedback::Duplicate => &[50, 50, 50],
            Feedback::Error => &[100, 50, 100],
        }
    }

    /// Beep frequency in Hz for the audio tone
    pub fn tone_hz(self) -> u32 {
        match self {
            Feedback::Success => 800,
            Feedback::Duplicate => 500,
            Feedback::Error => 300,
        }
    }
}

/// Capability interface for sound/vibration rendering.
///
/// Implementations swallow their own failures; a missing speaker or
/// vibration motor must never propagate into the mode engine.
pub trait FeedbackPort: Send + Sync {
    fn emit(&self, feedback: Feedback);
}

/// Default implementation: logs the pattern for the presentation layer's
/// audio/haptic renderer to pick up from the event stream
pub struct TracingFeedback;

impl FeedbackPort for TracingFeedback {
    fn emit(&self, feedback: Feedback) {
        tracing::debug!(
            "Feedback {:?}: tone {} Hz, pulses {:?}",
            feedback,
            feedback.tone_hz(),
            feedback.pulse_pattern()
        );
    }
}

/// No-op implementation for headless and test environments
pub struct NoopFeedback;

impl FeedbackPort for NoopFeedback {
    fn emit(&self, _feedback: Feedback) {}
}
