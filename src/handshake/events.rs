//! Events for the configuration handshake state machine.
//!
//! This modules is private and restricted to the
//! [`handshake`](crate::handshake) scope.
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use super::Field;

// FieldsSubmittedEvent ========================================================

/// Event fired to trigger a transition to the `SubmittedField` state.
///
/// Happens while awaiting prompts in the apply handshake, right after the last
/// prompt of the sequence was answered.
#[derive(Debug)]
pub(crate) struct FieldsSubmittedEvent {
    /// The prompt whose answer completed the sequence.
    pub last: Field,
}

// CompletedEvent ==============================================================

/// Event fired when the exchange reached its goal. It triggers a transition to
/// the terminal `Completed` state.
#[derive(Debug)]
pub(crate) struct CompletedEvent {
    /// The last line received from the device.
    pub last_line: String,
}

// TimedOutEvent ===============================================================

/// Event fired when the idle budget is used up. It triggers a transition to
/// the terminal `FailedTimeout` state.
#[derive(Debug)]
pub(crate) struct TimedOutEvent {
    pub idle_cycles: u32,
}

// Events enum ==================================================================

/// Events that can be triggered within the handshake state machine.
///
/// `Continue` keeps the current state: the line was handled (or ignored) and
/// the next one should be read.
#[derive(Debug)]
pub(crate) enum Event {
    Continue,
    FieldsSubmitted(FieldsSubmittedEvent),
    Completed(CompletedEvent),
    TimedOut(TimedOutEvent),
}
