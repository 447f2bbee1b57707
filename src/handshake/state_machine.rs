//! Configuration handshake state machine.
//!
//! The handshake reads the device console one line at a time. Each state
//! handles a single line and answers with an event deciding the next state:
//!
//! ```text
//!                    prompt answered / chatter / idle
//!                          +-------+
//!                          |       v
//!                   +-----------------+  syslog port answered   +----------------+
//!  start ---------> | AwaitingPrompt  | ----------------------> | SubmittedField |
//!                   +-----------------+        (apply)          +----------------+
//!                     |            |                              |           |
//!  sentinel sent      |            | idle budget used up          |           |
//!  (clear)            v            v                              |           |
//!           +-----------+    +---------------+   idle budget      |           |
//!           | Completed |    | FailedTimeout | <------------------+           |
//!           +-----------+    +---------------+                                |
//!                 ^                                                           |
//!                 +------------------ setup end / Config status --------------+
//! ```
//!
//! `Completed` and `FailedTimeout` are terminal: once reached, nothing else is
//! read from or written to the device.

use log::info;

use super::events::*;
use super::link::Link;
use super::states::*;
use super::{Policy, Report};
use crate::{
    device::Device,
    error::{Error, Result},
    settings::Settings,
};

// =============================================================================
// Public Interface
// =============================================================================

/// Represents the configuration handshake state machine. Use the `factory()`
/// function to get an instance then run it by calling its `run()` method.
pub struct Handshake<D: Device> {
    sm: HandshakeStates<D>,
}
impl<D: Device> Handshake<D> {
    /// Runs the handshake until a terminal state is reached.
    ///
    /// Returns the report of a successful exchange, [`Error::HandshakeTimeout`]
    /// when the idle budget was used up, or the first I/O error. An apply
    /// handshake missing its ssid or syslog ip fails with
    /// [`Error::MissingField`] before the device is touched.
    pub fn run(self) -> Result<Report> {
        let mut sm = self.sm;
        if let HandshakeStates::AwaitingPrompt(start) = &sm {
            start.link.check_settings()?;
        }
        loop {
            sm = match sm.step()? {
                HandshakeStates::Completed(sm) => {
                    info!(
                        "{} handshake completed on {:?}",
                        sm.link.policy.variant, sm.state.last_line
                    );
                    return Ok(sm.link.report());
                }
                HandshakeStates::FailedTimeout(sm) => {
                    return Err(Error::HandshakeTimeout {
                        idle_cycles: sm.state.idle_cycles,
                    });
                }
                next => next,
            };
        }
    }
}

/// Factory function for the handshake state machine. The device is expected
/// to be open and freshly reset.
pub fn factory<D: Device>(settings: Settings, policy: Policy, device: D) -> Handshake<D> {
    Handshake {
        // The machine naturally starts in the `AwaitingPrompt` state.
        sm: HandshakeStates::AwaitingPrompt(HandshakeSM::new(settings, policy, device)),
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// The raw state machine implementing the handshake.
///
/// The `link` is the data shared by all states (device, settings, counters),
/// the `state` holds the data specific to the current state.
#[derive(Debug)]
struct HandshakeSM<D, S> {
    link: Link<D>,
    state: S,
}

/// The state machine starts in the `AwaitingPromptState`.
impl<D: Device> HandshakeSM<D, AwaitingPromptState> {
    fn new(settings: Settings, policy: Policy, device: D) -> Self {
        HandshakeSM {
            link: Link::new(settings, policy, device),
            state: AwaitingPromptState {},
        }
    }
}

impl<D: Device, S: Runnable> HandshakeSM<D, S> {
    fn run(&mut self) -> Result<Event> {
        self.state.run(&mut self.link)
    }
}

/// An enum wrapper around the states of the handshake state machine.
enum HandshakeStates<D> {
    AwaitingPrompt(HandshakeSM<D, AwaitingPromptState>),
    SubmittedField(HandshakeSM<D, SubmittedFieldState>),
    Completed(HandshakeSM<D, CompletedState>),
    FailedTimeout(HandshakeSM<D, FailedTimeoutState>),
}
impl<D: Device> HandshakeStates<D> {
    /// The unit of work in the state machine event loop: one line in, one
    /// transition out. Transitions from events are implemented using the
    /// `From`/`Into` pattern.
    fn step(self) -> Result<Self> {
        Ok(match self {
            HandshakeStates::AwaitingPrompt(mut sm) => match sm.run()? {
                Event::Continue => HandshakeStates::AwaitingPrompt(sm),
                Event::FieldsSubmitted(ev) => {
                    HandshakeStates::SubmittedField((sm.link, ev).into())
                }
                Event::Completed(ev) => HandshakeStates::Completed((sm.link, ev).into()),
                Event::TimedOut(ev) => HandshakeStates::FailedTimeout((sm.link, ev).into()),
            },
            HandshakeStates::SubmittedField(mut sm) => match sm.run()? {
                Event::Continue => HandshakeStates::SubmittedField(sm),
                Event::Completed(ev) => HandshakeStates::Completed((sm.link, ev).into()),
                Event::TimedOut(ev) => HandshakeStates::FailedTimeout((sm.link, ev).into()),
                event => unreachable!(
                    "illegal event {:?} at current state {:?}",
                    event, sm.state
                ),
            },
            terminal => terminal,
        })
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl<D> From<(Link<D>, FieldsSubmittedEvent)> for HandshakeSM<D, SubmittedFieldState> {
    fn from((link, event): (Link<D>, FieldsSubmittedEvent)) -> Self {
        HandshakeSM {
            link,
            state: SubmittedFieldState { last: event.last },
        }
    }
}

impl<D> From<(Link<D>, CompletedEvent)> for HandshakeSM<D, CompletedState> {
    fn from((link, event): (Link<D>, CompletedEvent)) -> Self {
        HandshakeSM {
            link,
            state: CompletedState {
                last_line: event.last_line,
            },
        }
    }
}

impl<D> From<(Link<D>, TimedOutEvent)> for HandshakeSM<D, FailedTimeoutState> {
    fn from((link, event): (Link<D>, TimedOutEvent)) -> Self {
        HandshakeSM {
            link,
            state: FailedTimeoutState {
                idle_cycles: event.idle_cycles,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::handshake::{Field, Variant};
    use crate::testing::ScriptedDevice;
    use crate::SettingsBuilder;

    fn settings() -> Settings {
        SettingsBuilder::new()
            .path("/dev/ttyUSB0")
            .ssid("home-network")
            .password("s3cret")
            .syslog_ip("192.168.1.10")
            .syslog_port(5514)
            .finalize()
    }

    fn fast(policy: Policy) -> Policy {
        policy
            .with_reenter_delay(Duration::from_millis(0))
            .with_settle_delay(Duration::from_millis(0))
    }

    fn apply(device: &mut ScriptedDevice) -> Result<Report> {
        factory(settings(), fast(Policy::apply()), device).run()
    }

    fn clear(device: &mut ScriptedDevice) -> Result<Report> {
        factory(settings(), fast(Policy::clear()), device).run()
    }

    fn prompt_sequence(device: ScriptedDevice) -> ScriptedDevice {
        device
            .line("enter ssid:")
            .line("enter password:")
            .line("enter syslog ip:")
            .line("enter syslog port:")
    }

    // Apply -------------------------------------------------------------------

    #[test]
    fn apply_answers_every_prompt_in_order() {
        let mut device = prompt_sequence(ScriptedDevice::new()).line("setup end");
        let report = apply(&mut device).unwrap();

        assert_eq!(
            device.written,
            "home-network\ns3cret\n192.168.1.10\n5514\n"
        );
        assert_eq!(report.variant, Variant::Apply);
        assert_eq!(report.resets, 0);
        assert_eq!(
            report.fields_sent.into_iter().collect::<Vec<_>>(),
            vec![Field::Ssid, Field::Password, Field::SyslogIp, Field::SyslogPort]
        );
    }

    #[test]
    fn apply_ignores_boot_chatter() {
        let mut device = ScriptedDevice::new()
            .line("ets Jun  8 2016 00:22:57")
            .line("rst:0x1 (POWERON_RESET),boot:0x13 (SPI_FAST_FLASH_BOOT)")
            .line("Enter SSID:");
        device = prompt_sequence(device).line("setup end");

        apply(&mut device).unwrap();
        assert_eq!(device.written_lines().len(), 4);
    }

    #[test]
    fn apply_accepts_config_status_as_confirmation() {
        let mut device = prompt_sequence(ScriptedDevice::new()).line("Config saved");
        assert!(apply(&mut device).is_ok());
    }

    #[test]
    fn apply_reenters_config_when_setup_ends_early() {
        // The exchange restarts each time the device gives up early.
        let mut device = ScriptedDevice::new()
            .line("setup end")
            .line("enter ssid:")
            .line("Config done")
            .line("enter ssid:")
            .line("enter password:")
            .line("enter syslog ip:")
            .line("enter syslog port:")
            .line("setup end");
        apply(&mut device).unwrap();
        assert_eq!(
            device.written_lines(),
            vec![
                "config",
                "home-network",
                "config",
                "home-network",
                "s3cret",
                "192.168.1.10",
                "5514"
            ]
        );
    }

    #[test]
    fn apply_waits_before_reentering_config() {
        let mut device = ScriptedDevice::new().line("setup end").idle(10);
        let policy = fast(Policy::apply()).with_reenter_delay(Duration::from_millis(50));

        let started = Instant::now();
        let result = factory(settings(), policy, &mut device).run();

        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(matches!(result, Err(Error::HandshakeTimeout { .. })));
        assert_eq!(device.written, "config\n");
    }

    #[test]
    fn apply_default_policy() {
        let policy = Policy::apply();
        assert_eq!(policy.idle_budget, 10);
        assert_eq!(policy.reset_after_idle, Some(5));
        assert_eq!(policy.reenter_delay, Duration::from_secs(2));
        assert_eq!(policy.settle_delay, Duration::from_millis(100));
    }

    #[test]
    fn apply_resets_once_after_five_idle_windows() {
        let mut device = prompt_sequence(ScriptedDevice::new().idle(5)).line("setup end");
        let report = apply(&mut device).unwrap();

        assert_eq!(device.resets(), 1);
        assert_eq!(device.reset_line, vec![false, true]);
        assert_eq!(report.resets, 1);
        assert_eq!(report.idle_cycles, 5);
    }

    #[test]
    fn apply_does_not_reset_before_threshold() {
        let mut device = prompt_sequence(ScriptedDevice::new().idle(4)).line("setup end");
        let report = apply(&mut device).unwrap();

        assert!(device.reset_line.is_empty());
        assert_eq!(report.resets, 0);
    }

    #[test]
    fn apply_idle_count_survives_chatter() {
        let mut device = ScriptedDevice::new()
            .idle(3)
            .line("waiting for wifi")
            .idle(2)
            .line("still waiting");
        device = prompt_sequence(device).line("setup end");
        let report = apply(&mut device).unwrap();

        assert_eq!(report.idle_cycles, 5);
        assert_eq!(device.resets(), 1);
    }

    #[test]
    fn apply_mid_session_reset_can_be_disabled() {
        let mut device = ScriptedDevice::new();
        let policy = fast(Policy::apply()).with_reset_after_idle(None);
        let result = factory(settings(), policy, &mut device).run();

        assert!(matches!(
            result,
            Err(Error::HandshakeTimeout { idle_cycles: 10 })
        ));
        assert!(device.reset_line.is_empty());
    }

    #[test]
    fn apply_times_out_on_silent_device() {
        let mut device = ScriptedDevice::new();
        let result = apply(&mut device);

        assert!(matches!(
            result,
            Err(Error::HandshakeTimeout { idle_cycles: 10 })
        ));
        assert_eq!(device.resets(), 1);
        assert_eq!(device.reads, 10);
        assert!(device.written.is_empty());
    }

    #[test]
    fn apply_times_out_without_confirmation() {
        let mut device = prompt_sequence(ScriptedDevice::new());
        let result = apply(&mut device);

        assert!(matches!(result, Err(Error::HandshakeTimeout { .. })));
        assert_eq!(device.written_lines().len(), 4);
    }

    #[test]
    fn apply_answers_prompts_again_after_submission() {
        let mut device = prompt_sequence(ScriptedDevice::new())
            .line("enter ssid:")
            .line("setup end");
        apply(&mut device).unwrap();

        assert_eq!(device.written_lines().len(), 5);
        assert_eq!(device.written_lines()[4], "home-network");
    }

    #[test]
    fn apply_stops_reading_once_completed() {
        let mut device = prompt_sequence(ScriptedDevice::new())
            .line("setup end")
            .line("enter ssid:");
        apply(&mut device).unwrap();

        assert_eq!(device.written_lines().len(), 4);
    }

    #[test]
    fn apply_sends_empty_password() {
        let settings = SettingsBuilder::new()
            .path("/dev/ttyUSB0")
            .ssid("open-network")
            .syslog_ip("10.0.0.1")
            .finalize();
        let mut device = prompt_sequence(ScriptedDevice::new()).line("setup end");
        factory(settings, fast(Policy::apply()), &mut device)
            .run()
            .unwrap();

        assert_eq!(device.written, "open-network\n\n10.0.0.1\n514\n");
    }

    #[test]
    fn apply_aborts_on_read_error() {
        let mut device = ScriptedDevice::new().line("enter ssid:").fail();
        let result = apply(&mut device);

        assert!(matches!(result, Err(Error::Io(_))));
        assert_eq!(device.written, "home-network\n");
    }

    #[test]
    fn apply_aborts_on_write_error() {
        let mut device = prompt_sequence(ScriptedDevice::new());
        device.fail_writes = true;

        assert!(matches!(apply(&mut device), Err(Error::Io(_))));
    }

    #[test]
    fn apply_rejects_missing_fields_before_reading() {
        let incomplete = SettingsBuilder::new()
            .path("/dev/ttyUSB0")
            .syslog_ip("192.168.1.10")
            .finalize();
        let mut device = prompt_sequence(ScriptedDevice::new());
        let result = factory(incomplete, fast(Policy::apply()), &mut device).run();

        assert!(matches!(result, Err(Error::MissingField("ssid"))));
        assert_eq!(device.reads, 0);
        assert!(device.written.is_empty());
    }

    #[test]
    fn clear_needs_no_fields() {
        let bare = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
        let mut device = ScriptedDevice::new().line("enter ssid:");
        factory(bare, fast(Policy::clear()), &mut device).run().unwrap();

        assert_eq!(device.written, "clear!\n");
    }

    #[test]
    fn apply_aborts_on_reset_error() {
        let mut device = ScriptedDevice::new();
        device.fail_reset_line = true;

        assert!(matches!(apply(&mut device), Err(Error::Io(_))));
        assert_eq!(device.reads, 5);
    }

    // Clear -------------------------------------------------------------------

    #[test]
    fn clear_answers_ssid_prompt_with_sentinel() {
        let mut device = ScriptedDevice::new()
            .line("booting")
            .line("enter ssid:")
            .line("enter password:");
        let report = clear(&mut device).unwrap();

        assert_eq!(device.written, "clear!\n");
        assert_eq!(report.variant, Variant::Clear);
    }

    #[test]
    fn clear_answers_password_prompt_with_sentinel() {
        let mut device = ScriptedDevice::new()
            .line("enter password:")
            .line("enter ssid:");
        clear(&mut device).unwrap();

        assert_eq!(device.written, "clear!\n");
    }

    #[test]
    fn clear_ignores_syslog_prompts() {
        let mut device = ScriptedDevice::new()
            .line("enter syslog ip:")
            .line("enter syslog port:")
            .line("enter ssid:");
        clear(&mut device).unwrap();

        assert_eq!(device.written, "clear!\n");
    }

    #[test]
    fn clear_reenters_config_on_status_line() {
        let mut device = ScriptedDevice::new()
            .line("Configured")
            .line("setup end")
            .line("enter ssid:");
        clear(&mut device).unwrap();

        assert_eq!(device.written, "config\nconfig\nclear!\n");
    }

    #[test]
    fn clear_default_policy() {
        let policy = Policy::clear();
        assert_eq!(policy.idle_budget, 5);
        assert_eq!(policy.reset_after_idle, None);
    }

    #[test]
    fn clear_times_out_on_silent_device() {
        let mut device = ScriptedDevice::new();
        let result = clear(&mut device);

        assert!(matches!(
            result,
            Err(Error::HandshakeTimeout { idle_cycles: 5 })
        ));
        assert!(device.reset_line.is_empty());
        assert!(device.written.is_empty());
    }
}
