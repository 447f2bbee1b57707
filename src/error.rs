//! Errors reported by `espcom` operations.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can terminate an `espcom` session.
///
/// None of these are retried internally: the caller gets the error and the
/// operator is expected to start the whole operation again.
#[derive(Debug, Error)]
pub enum Error {
    /// The serial port could not be opened or configured.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// A read, a write or a control line change failed on an open port.
    #[error("I/O error on the serial link: {0}")]
    Io(#[from] std::io::Error),

    /// The device never went through the prompt sequence within the idle
    /// budget of the handshake.
    #[error("no answer from the device after {idle_cycles} idle cycles")]
    HandshakeTimeout { idle_cycles: u32 },

    /// A value required by the requested operation was not provided.
    #[error("no {0} given")]
    MissingField(&'static str),

    /// `esptool` was neither given explicitly nor found on the system.
    #[error("esptool not found")]
    ToolNotFound,

    /// The flashing tool is a python script but no interpreter was found.
    #[error("python not found to run `{}`", .0.display())]
    InterpreterNotFound(PathBuf),

    /// The flashing tool was found but could not be started.
    #[error("failed to start the flashing tool: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Shorthand for results carrying an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
