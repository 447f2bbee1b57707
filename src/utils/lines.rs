//! Line oriented reads from the device console.

use std::io::{self, Read};

use hexplay::HexViewBuilder;
use log::{log_enabled, trace, Level::Trace};

const CR: u8 = 0x0d;
const LF: u8 = 0x0a;

/// Reads text lines from the device, one byte at a time.
///
/// The device prints with irregular delays between bytes, so nothing is
/// buffered past the end of a line: every call starts from an empty line.
///
/// A read timing out with nothing accumulated yields an **empty** line. The
/// handshake relies on these empty lines to measure how long the device has
/// been silent.
#[derive(Debug)]
pub(crate) struct LineReader<D> {
    inner: D,
}
impl<D: Read> LineReader<D> {
    pub fn new(inner: D) -> Self {
        LineReader { inner }
    }

    pub fn get_mut(&mut self) -> &mut D {
        &mut self.inner
    }

    /// Read the next line.
    ///
    /// CR and LF both end a line and runs of terminators are collapsed, so
    /// `"A\r\n"`, `"A\n"` and `"A\r"` all give `"A"`. A timeout ends the line
    /// with whatever was accumulated so far. Any other read error is
    /// returned as is.
    pub fn read_line(&mut self) -> io::Result<String> {
        let mut line: Vec<u8> = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => match byte[0] {
                    CR | LF => {
                        if !line.is_empty() {
                            break;
                        }
                    }
                    b => line.push(b),
                },
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        if log_enabled!(Trace) && !line.is_empty() {
            let view = HexViewBuilder::new(&line)
                .address_offset(0)
                .row_width(16)
                .finish();
            trace!("line received:\n{}", view);
        }

        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDevice;

    fn first_line(data: &[u8]) -> String {
        let mut reader = LineReader::new(ScriptedDevice::new().bytes(data));
        reader.read_line().unwrap()
    }

    #[test]
    fn terminators_are_equivalent() {
        assert_eq!(first_line(b"A\r\n"), "A");
        assert_eq!(first_line(b"A\n"), "A");
        assert_eq!(first_line(b"A\r"), "A");
    }

    #[test]
    fn leading_terminators_are_skipped() {
        let mut reader = LineReader::new(ScriptedDevice::new().bytes(b"\r\n\r\nenter ssid:\r\n"));
        assert_eq!(reader.read_line().unwrap(), "enter ssid:");
    }

    #[test]
    fn crlf_does_not_produce_blank_lines() {
        let mut reader = LineReader::new(ScriptedDevice::new().bytes(b"one\r\ntwo\r\n"));
        assert_eq!(reader.read_line().unwrap(), "one");
        assert_eq!(reader.read_line().unwrap(), "two");
    }

    #[test]
    fn timeout_yields_empty_line() {
        let mut reader = LineReader::new(ScriptedDevice::new().idle(1));
        assert_eq!(reader.read_line().unwrap(), "");
    }

    #[test]
    fn timeout_after_terminator_yields_empty_line() {
        let mut reader = LineReader::new(ScriptedDevice::new().bytes(b"A\r\n").idle(1));
        assert_eq!(reader.read_line().unwrap(), "A");
        assert_eq!(reader.read_line().unwrap(), "");
    }

    #[test]
    fn timeout_returns_partial_line() {
        let mut reader = LineReader::new(ScriptedDevice::new().bytes(b"Config sav").idle(1));
        assert_eq!(reader.read_line().unwrap(), "Config sav");
    }

    #[test]
    fn zero_byte_read_is_idle() {
        let mut reader = LineReader::new(&b""[..]);
        assert_eq!(reader.read_line().unwrap(), "");
    }

    #[test]
    fn read_errors_are_fatal() {
        let mut reader = LineReader::new(ScriptedDevice::new().bytes(b"abc").fail());
        let err = reader.read_line().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn reads_one_byte_at_a_time() {
        let mut reader = LineReader::new(ScriptedDevice::new().bytes(b"ab\ncd\n"));
        reader.read_line().unwrap();
        assert_eq!(reader.get_mut().reads, 3);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        assert_eq!(first_line(b"\xffok\n"), "\u{fffd}ok");
    }
}
