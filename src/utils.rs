//! Helpers to deal with serial ports and the device console.

mod lines;
mod ports;

pub(crate) use lines::LineReader;
pub(crate) use ports::open_and_setup_port;
pub use ports::{list_ports, select_port, PortDescriptor};
