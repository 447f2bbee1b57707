//! The device side of the serial link and its hardware reset.

use std::{
    io::{self, Read, Write},
    thread,
    time::Duration,
};

use log::debug;
use serialport::SerialPort;

/// Time given to the board to start rebooting after the reset line has been
/// released.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// A byte stream to the device with a controllable reset line.
///
/// On the usual ESP32 boards the reset line is wired to DTR through the USB
/// serial adapter: driving it low holds the chip in reset.
pub trait Device: Read + Write {
    /// Drive the reset line. `false` holds the device in reset, `true`
    /// releases it.
    fn set_reset_line(&mut self, level: bool) -> io::Result<()>;
}

impl Device for Box<dyn SerialPort> {
    fn set_reset_line(&mut self, level: bool) -> io::Result<()> {
        self.write_data_terminal_ready(level)?;
        Ok(())
    }
}

impl<D: Device + ?Sized> Device for &mut D {
    fn set_reset_line(&mut self, level: bool) -> io::Result<()> {
        (**self).set_reset_line(level)
    }
}

/// Force the device through a hardware reset.
///
/// The line is deasserted, held for `settle` and asserted again. Calling this
/// several times in a row is harmless, every call is one more reboot.
pub fn reset<D: Device + ?Sized>(device: &mut D, settle: Duration) -> io::Result<()> {
    debug!("Resetting device (settle {:?})", settle);
    device.set_reset_line(false)?;
    thread::sleep(settle);
    device.set_reset_line(true)
}

// =============================================================================
// Unit Tests
// =============================================================================
