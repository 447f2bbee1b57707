//! A serial session with the device and the operations run over it.
//!
//! Every operation checks its preconditions, opens the port, does its work and
//! releases the port when the [`Session`] is dropped, whichever way the
//! operation ends.

use std::{fmt, time::Duration};

use log::{debug, info};
use serialport::SerialPort;

use crate::{
    device::{self, Device, SETTLE_DELAY},
    error::Result,
    handshake::{self, Policy, Report},
    utils::{open_and_setup_port, LineReader},
    Settings,
};

/// An open serial link to the device.
pub struct Session {
    settings: Settings,
    port: Box<dyn SerialPort>,
}
impl Session {
    /// Open the serial port named in `settings`.
    pub fn open(settings: &Settings) -> Result<Self> {
        let port = open_and_setup_port(settings)?;
        let session = Session {
            settings: settings.clone(),
            port,
        };
        debug!("{:?}", session);
        Ok(session)
    }

    /// Reboot the device, holding it in reset for `settle`.
    pub fn reset(&mut self, settle: Duration) -> Result<()> {
        info!("Resetting the device");
        device::reset(&mut self.port, settle)?;
        Ok(())
    }

    /// Reset the device and run a handshake on it.
    pub fn handshake(&mut self, policy: Policy) -> Result<Report> {
        run_handshake(self.settings.clone(), policy, &mut self.port)
    }

    /// Print the device console until the link fails.
    pub fn monitor(&mut self) -> Result<()> {
        let mut reader = LineReader::new(&mut self.port);
        loop {
            let line = reader.read_line()?;
            if !line.is_empty() {
                println!("{}", line);
            }
        }
    }
}
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let port = &self.port;
        debug_fmt_serialport!("Session", port, f).finish()
    }
}
impl Drop for Session {
    fn drop(&mut self) {
        info!(
            "Closing {}",
            self.settings.path.as_deref().unwrap_or_default()
        );
    }
}

// =============================================================================
// Public Interface
// =============================================================================

/// Push the Wi-Fi credentials and syslog destination into the device.
pub fn configure(settings: &Settings) -> Result<Report> {
    configure_with(settings, Policy::apply())
}

/// Like [`configure`], with a custom handshake policy.
pub fn configure_with(settings: &Settings, policy: Policy) -> Result<Report> {
    settings.check_apply()?;
    let mut session = Session::open(settings)?;
    session.handshake(policy)
}

/// Wipe the configuration stored in the device.
pub fn clear(settings: &Settings) -> Result<Report> {
    settings.check_port()?;
    let mut session = Session::open(settings)?;
    session.handshake(Policy::clear())
}

/// Reboot the device, nothing more.
pub fn reset(settings: &Settings) -> Result<()> {
    settings.check_port()?;
    let mut session = Session::open(settings)?;
    session.reset(SETTLE_DELAY)
}

/// Print the device console until the link fails or the process is stopped.
pub fn monitor(settings: &Settings) -> Result<()> {
    settings.check_port()?;
    let mut session = Session::open(settings)?;
    session.monitor()
}

// =============================================================================
// Private stuff
// =============================================================================

/// The device boots straight into its setup prompts, so every handshake starts
/// with a reset.
pub(crate) fn run_handshake<D: Device>(
    settings: Settings,
    policy: Policy,
    mut port: D,
) -> Result<Report> {
    info!("Resetting the device");
    device::reset(&mut port, policy.settle_delay)?;
    handshake::factory(settings, policy, port).run()
}

// =============================================================================
// Unit Tests
// =============================================================================
