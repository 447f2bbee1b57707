//! Configuration handshake with the sensor firmware over its serial console.
//!
//! Right after a reset, the firmware offers a short window in which it can be
//! asked to enter configuration mode. In that mode it prompts for each setting
//! in turn, one prompt per line, and stores the answers in its persisted
//! configuration:
//!
//! ```text
//! device                         host
//!   enter ssid:            --->
//!                          <---  home-network
//!   enter password:        --->
//!                          <---  s3cret
//!   enter syslog ip:       --->
//!                          <---  192.168.1.10
//!   enter syslog port:     --->
//!                          <---  514
//!   setup end              --->
//! ```
//!
//! When the device prints `setup end` (or a `Config ...` status line) before
//! all the prompts were answered, the host sends `config` to ask for the prompt
//! sequence again.
//!
//! **Example** - Running the handshake on an open device:
//! ```ignore
//! let mut hs = handshake::factory(settings, Policy::apply(), device);
//! let report = hs.run()?;
//! ```

mod events;
mod link;
mod prompts;
mod state_machine;
mod states;

use std::{collections::BTreeSet, fmt, time::Duration};

use crate::device::SETTLE_DELAY;

pub use prompts::Received;
pub use state_machine::{factory, Handshake};

// =============================================================================
// Public Interface
// =============================================================================

/// The two things a handshake can do to the device configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Variant {
    /// Push the Wi-Fi credentials and the syslog destination.
    Apply,
    /// Wipe the stored configuration.
    Clear,
}
impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Apply => f.write_str("apply"),
            Variant::Clear => f.write_str("clear"),
        }
    }
}

/// The settings the device prompts for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Field {
    Ssid,
    Password,
    SyslogIp,
    SyslogPort,
}

/// Tuning of a handshake run.
///
/// The budget and the mid-session reset are counted in idle windows, i.e.
/// reads that timed out with nothing received, never in lines: a chatty device
/// does not use up the budget.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Policy {
    pub variant: Variant,
    /// Idle windows after which the handshake gives up.
    pub idle_budget: u32,
    /// Reset the device once when this many idle windows were seen. `None`
    /// disables the mid-session reset.
    pub reset_after_idle: Option<u32>,
    /// Pause before asking the device to enter configuration mode again.
    pub reenter_delay: Duration,
    /// Settle delay of the reset sequence.
    pub settle_delay: Duration,
}
impl Policy {
    /// Defaults for pushing a configuration.
    pub fn apply() -> Self {
        Policy {
            variant: Variant::Apply,
            idle_budget: 10,
            reset_after_idle: Some(5),
            reenter_delay: Duration::from_secs(2),
            settle_delay: SETTLE_DELAY,
        }
    }

    /// Defaults for clearing the configuration.
    pub fn clear() -> Self {
        Policy {
            variant: Variant::Clear,
            idle_budget: 5,
            reset_after_idle: None,
            reenter_delay: Duration::from_secs(0),
            settle_delay: SETTLE_DELAY,
        }
    }

    pub fn with_idle_budget(mut self, idle_budget: u32) -> Self {
        self.idle_budget = idle_budget;
        self
    }

    pub fn with_reset_after_idle(mut self, reset_after_idle: Option<u32>) -> Self {
        self.reset_after_idle = reset_after_idle;
        self
    }

    pub fn with_reenter_delay(mut self, reenter_delay: Duration) -> Self {
        self.reenter_delay = reenter_delay;
        self
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }
}

/// Summary of a successful handshake.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Report {
    pub variant: Variant,
    /// Idle windows seen before the device completed the exchange.
    pub idle_cycles: u32,
    /// Resets issued by the handshake itself, the initial one not included.
    pub resets: u32,
    /// Fields answered at least once.
    pub fields_sent: BTreeSet<Field>,
}
