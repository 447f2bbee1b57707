//! Espcom provisions ESP32 based sensors over their serial console. It pushes
//! the Wi-Fi credentials and the syslog destination into the persisted
//! configuration of the firmware, wipes that configuration, and drives
//! `esptool` to write the firmware images.
//!
//! The firmware exposes its configuration through a plaintext prompt/response
//! exchange on the console, offered for a short time after boot. Espcom resets
//! the board through the DTR line of the USB serial adapter, waits for the
//! prompts and answers them. If the device stays silent for too long, most
//! likely because the boot banner raced the opening of the port, the board is
//! reset again.
//!
//! The handshake is implemented as a state machine with the following
//! characteristics:
//!
//! * Can only be in one state at any time.
//! * Each state can have its own associated data if needed.
//! * Data shared between **all** states (the device, the settings and the
//!   progress counters) travels with the machine from one state to the next.
//! * Transitions between states are triggered via typed **events** and follow
//!   defined semantics.
//! * Only explicitly defined transitions are permitted. Transitioning from one
//!   state to another consumes the original state.
//!
//! The implementation of state transitions leverages `rust`'s `From` and `Into`
//! pattern: a new state is created from the shared data and the event that
//! triggered the transition. Only transitions for which the `From` trait is
//! implemented are authorized and any other transition is detected at
//! compile-time as an error.
//!
//! **Example** - Configuring a device:
//! ```no_run
//! use espcom::SettingsBuilder;
//!
//! let settings = SettingsBuilder::new()
//!     .path("/dev/ttyUSB0")
//!     .ssid("home-network")
//!     .password("s3cret")
//!     .syslog_ip("192.168.1.10")
//!     .finalize();
//! let report = espcom::configure(&settings)?;
//! println!("done after {} idle windows", report.idle_cycles);
//! # Ok::<(), espcom::Error>(())
//! ```

#[macro_use]
mod macros;

mod device;
mod error;
pub mod flasher;
pub mod handshake;
mod session;
mod settings;
mod utils;

#[cfg(test)]
mod testing;

pub use device::{reset as reset_device, Device, SETTLE_DELAY};
pub use error::{Error, Result};
pub use session::{clear, configure, configure_with, monitor, reset, Session};
pub use settings::{DeviceProfile, Settings, SettingsBuilder};
pub use utils::{list_ports, select_port, PortDescriptor};
