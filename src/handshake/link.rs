//! Data shared by all the states of the handshake state machine.

use std::{collections::BTreeSet, io::Write, thread};

use log::{debug, info};

use super::{prompts::ENTER_CONFIG, Field, Policy, Report, Variant};
use crate::{
    device::{self, Device},
    error::Result,
    settings::Settings,
    utils::LineReader,
};

/// The device, its line reader and the progress counters of one handshake.
///
/// The counters only ever grow: an idle window or a reset cannot be undone by
/// anything the device prints afterwards.
#[derive(Debug)]
pub(crate) struct Link<D> {
    pub settings: Settings,
    pub policy: Policy,
    reader: LineReader<D>,
    pub idle_count: u32,
    pub resets: u32,
    pub fields_sent: BTreeSet<Field>,
}
impl<D: Device> Link<D> {
    pub fn new(settings: Settings, policy: Policy, device: D) -> Self {
        Link {
            settings,
            policy,
            reader: LineReader::new(device),
            idle_count: 0,
            resets: 0,
            fields_sent: BTreeSet::new(),
        }
    }

    /// Check the values the handshake is about to push into the device.
    pub fn check_settings(&self) -> Result<()> {
        match self.policy.variant {
            Variant::Apply => self.settings.check_fields(),
            Variant::Clear => Ok(()),
        }
    }

    /// Next line from the device, echoed to the console unless it is an idle
    /// signal.
    pub fn read_line(&mut self) -> Result<String> {
        let line = self.reader.read_line()?;
        if !line.is_empty() {
            println!("{}", line);
        }
        Ok(line)
    }

    /// Send one newline terminated line to the device.
    pub fn send(&mut self, text: &str) -> Result<()> {
        debug!("sending {:?}", text);
        let device = self.reader.get_mut();
        device.write_all(text.as_bytes())?;
        device.write_all(b"\n")?;
        device.flush()?;
        Ok(())
    }

    /// Answer a prompt with the configured value.
    pub fn answer(&mut self, field: Field) -> Result<()> {
        let value = match field {
            Field::Ssid => self.settings.ssid.clone().unwrap_or_default(),
            Field::Password => self.settings.password.clone(),
            Field::SyslogIp => self.settings.syslog_ip.clone().unwrap_or_default(),
            Field::SyslogPort => self.settings.syslog_port.to_string(),
        };
        self.send(&value)?;
        self.fields_sent.insert(field);
        Ok(())
    }

    /// Ask the device to go through the prompts again.
    pub fn reenter_config(&mut self) -> Result<()> {
        if !self.policy.reenter_delay.is_zero() {
            thread::sleep(self.policy.reenter_delay);
        }
        info!("Asking the device to enter configuration mode");
        self.send(ENTER_CONFIG)
    }

    /// Account for one idle window, resetting the device when the policy says
    /// so. Returns `true` once the idle budget is used up.
    pub fn idle(&mut self) -> Result<bool> {
        self.idle_count += 1;
        debug!(
            "idle window {}/{}",
            self.idle_count, self.policy.idle_budget
        );
        if self.policy.reset_after_idle == Some(self.idle_count) {
            info!(
                "No prompt after {} idle windows, resetting the device",
                self.idle_count
            );
            device::reset(self.reader.get_mut(), self.policy.settle_delay)?;
            self.resets += 1;
        }
        Ok(self.idle_count >= self.policy.idle_budget)
    }

    pub fn report(&self) -> Report {
        Report {
            variant: self.policy.variant,
            idle_cycles: self.idle_count,
            resets: self.resets,
            fields_sent: self.fields_sent.clone(),
        }
    }
}
