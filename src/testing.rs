//! In-memory device used by the unit tests.

use std::{
    collections::VecDeque,
    io::{self, Read, Write},
};

use crate::device::Device;

/// One scripted reaction of the device to a read.
#[derive(Debug)]
enum Chunk {
    Bytes(VecDeque<u8>),
    Idle,
    Fail,
}

/// A device replaying a script of output, one byte per read.
///
/// When the script runs dry every read times out, like a silent board.
#[derive(Debug, Default)]
pub(crate) struct ScriptedDevice {
    script: VecDeque<Chunk>,
    /// Everything written by the host, as text.
    pub written: String,
    /// Levels applied to the reset line, in order.
    pub reset_line: Vec<bool>,
    /// Make every reset line change fail.
    pub fail_reset_line: bool,
    /// Make every write fail.
    pub fail_writes: bool,
    /// Number of reads answered so far.
    pub reads: usize,
}
impl ScriptedDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw bytes.
    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.script
            .push_back(Chunk::Bytes(data.iter().cloned().collect()));
        self
    }

    /// Queue a line terminated with CR LF, as the device prints them.
    pub fn line(self, text: &str) -> Self {
        self.bytes(format!("{}\r\n", text).as_bytes())
    }

    /// Queue `count` read timeouts.
    pub fn idle(mut self, count: usize) -> Self {
        for _ in 0..count {
            self.script.push_back(Chunk::Idle);
        }
        self
    }

    /// Queue a read failure.
    pub fn fail(mut self) -> Self {
        self.script.push_back(Chunk::Fail);
        self
    }

    /// The host writes split into lines, terminators removed.
    pub fn written_lines(&self) -> Vec<&str> {
        self.written.lines().collect()
    }

    /// Number of complete reset sequences seen on the reset line.
    pub fn resets(&self) -> usize {
        self.reset_line.iter().filter(|level| !**level).count()
    }
}
impl Read for ScriptedDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        loop {
            match self.script.front_mut() {
                None => return Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")),
                Some(Chunk::Bytes(bytes)) => match bytes.pop_front() {
                    Some(byte) if !buf.is_empty() => {
                        buf[0] = byte;
                        return Ok(1);
                    }
                    Some(_) => return Ok(0),
                    None => {
                        self.script.pop_front();
                    }
                },
                Some(Chunk::Idle) => {
                    self.script.pop_front();
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"));
                }
                Some(Chunk::Fail) => {
                    self.script.pop_front();
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
                }
            }
        }
    }
}
impl Write for ScriptedDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
        }
        self.written.push_str(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
impl Device for ScriptedDevice {
    fn set_reset_line(&mut self, level: bool) -> io::Result<()> {
        if self.fail_reset_line {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
        }
        self.reset_line.push(level);
        Ok(())
    }
}
