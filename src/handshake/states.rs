//! States for the configuration handshake state machine.
//!
//! This modules is private and restricted to the
//! [`handshake`](crate::handshake) scope. The public interface of the
//! handshake is provided by [`handshake`](crate::handshake).
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use log::{debug, info};

use super::{
    events::*,
    link::Link,
    prompts::{Received, CLEAR_SENTINEL},
    Field, Variant,
};
use crate::{device::Device, error::Result};

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Trait adding the ability for a state to be `run` after a transition into it.
pub(crate) trait Runnable {
    /// Handle exactly one line from the device.
    ///
    /// The state reads the line through the `link`, answers it if needed and
    /// requests a transition by returning the appropriate `event`. I/O errors
    /// abort the handshake right away.
    fn run<D: Device>(&mut self, link: &mut Link<D>) -> Result<Event>;
}

// AwaitingPrompt State ========================================================

/// The initial state: the device may be booting, printing its banner or
/// prompting for settings.
///
/// From the `AwaitingPromptState`, the state machine can evolve via the
/// following transitions:
///
///  * **[`FieldsSubmittedEvent`] => [`SubmittedFieldState`]** once the syslog
///    port prompt was answered (apply),
///  * **[`CompletedEvent`] => [`CompletedState`]** once the sentinel was sent
///    in answer to the ssid or password prompt (clear),
///  * **[`TimedOutEvent`] => [`FailedTimeoutState`]** when the idle budget is
///    used up.
#[derive(Debug)]
pub(crate) struct AwaitingPromptState {}
impl Runnable for AwaitingPromptState {
    fn run<D: Device>(&mut self, link: &mut Link<D>) -> Result<Event> {
        let variant = link.policy.variant;
        let line = link.read_line()?;
        match (variant, Received::parse(&line, variant)) {
            (_, Received::Idle) => on_idle(link),

            (Variant::Apply, Received::Prompt(field)) => {
                link.answer(field)?;
                if field == Field::SyslogPort {
                    return Ok(Event::FieldsSubmitted(FieldsSubmittedEvent { last: field }));
                }
                Ok(Event::Continue)
            }
            (Variant::Apply, Received::SetupEnd) => {
                debug!("device left configuration mode before all fields were sent");
                link.reenter_config()?;
                Ok(Event::Continue)
            }

            (Variant::Clear, Received::Prompt(Field::Ssid))
            | (Variant::Clear, Received::Prompt(Field::Password)) => {
                link.send(CLEAR_SENTINEL)?;
                Ok(Event::Completed(CompletedEvent {
                    last_line: line.clone(),
                }))
            }
            (Variant::Clear, Received::SetupEnd) => {
                link.reenter_config()?;
                Ok(Event::Continue)
            }

            (Variant::Clear, Received::Prompt(_)) | (_, Received::Chatter(_)) => {
                Ok(Event::Continue)
            }
        }
    }
}

// SubmittedField State ========================================================

/// Every prompt of the sequence has been answered, the device is expected to
/// confirm with `setup end` or a `Config ` status line.
///
///  * **[`CompletedEvent`] => [`CompletedState`]** on the confirmation,
///  * **[`TimedOutEvent`] => [`FailedTimeoutState`]** when the idle budget is
///    used up.
///
/// A device that prompts again is answered again, without leaving this state.
#[derive(Debug)]
pub(crate) struct SubmittedFieldState {
    /// The prompt that completed the sequence.
    pub last: Field,
}
impl Runnable for SubmittedFieldState {
    fn run<D: Device>(&mut self, link: &mut Link<D>) -> Result<Event> {
        let line = link.read_line()?;
        match Received::parse(&line, link.policy.variant) {
            Received::Idle => on_idle(link),
            Received::Prompt(field) => {
                debug!("device prompted again after {:?}", self.last);
                link.answer(field)?;
                self.last = field;
                Ok(Event::Continue)
            }
            Received::SetupEnd => Ok(Event::Completed(CompletedEvent {
                last_line: line.clone(),
            })),
            Received::Chatter(_) => Ok(Event::Continue),
        }
    }
}

// Completed State =============================================================

/// Terminal state reached when the handshake succeeded. No further line is
/// read.
#[derive(Debug)]
pub(crate) struct CompletedState {
    pub last_line: String,
}

// FailedTimeout State =========================================================

/// Terminal state reached when the device stayed silent for the whole idle
/// budget. No further line is read.
#[derive(Debug, Copy, Clone)]
pub(crate) struct FailedTimeoutState {
    pub idle_cycles: u32,
}

// =============================================================================
// Private stuff
// =============================================================================

fn on_idle<D: Device>(link: &mut Link<D>) -> Result<Event> {
    if link.idle()? {
        info!("Idle budget of {} windows used up", link.policy.idle_budget);
        return Ok(Event::TimedOut(TimedOutEvent {
            idle_cycles: link.idle_count,
        }));
    }
    Ok(Event::Continue)
}
