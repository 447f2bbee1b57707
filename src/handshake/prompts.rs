//! The plaintext vocabulary of the device console.
//!
//! Matching is exact and case sensitive.

use super::{Field, Variant};

pub(crate) const PROMPT_SSID: &str = "enter ssid:";
pub(crate) const PROMPT_PASSWORD: &str = "enter password:";
pub(crate) const PROMPT_SYSLOG_IP: &str = "enter syslog ip:";
pub(crate) const PROMPT_SYSLOG_PORT: &str = "enter syslog port:";
pub(crate) const SETUP_END: &str = "setup end";

/// Status line prefix seen by the apply handshake. The trailing space is part
/// of it.
pub(crate) const CONFIG_STATUS_APPLY: &str = "Config ";
/// Status line prefix seen by the clear handshake.
pub(crate) const CONFIG_STATUS_CLEAR: &str = "Config";

/// Sent to enter configuration mode.
pub(crate) const ENTER_CONFIG: &str = "config";
/// Sent in place of the ssid or password to wipe the configuration.
pub(crate) const CLEAR_SENTINEL: &str = "clear!";

/// A line received from the device, as the handshake understands it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Received<'a> {
    /// The read timed out with nothing received.
    Idle,
    /// The device asks for a setting.
    Prompt(Field),
    /// The device left (or never entered) configuration mode.
    SetupEnd,
    /// Anything else the firmware prints.
    Chatter(&'a str),
}
impl<'a> Received<'a> {
    pub fn parse(line: &'a str, variant: Variant) -> Self {
        let status_prefix = match variant {
            Variant::Apply => CONFIG_STATUS_APPLY,
            Variant::Clear => CONFIG_STATUS_CLEAR,
        };
        match line {
            "" => Received::Idle,
            PROMPT_SSID => Received::Prompt(Field::Ssid),
            PROMPT_PASSWORD => Received::Prompt(Field::Password),
            PROMPT_SYSLOG_IP => Received::Prompt(Field::SyslogIp),
            PROMPT_SYSLOG_PORT => Received::Prompt(Field::SyslogPort),
            SETUP_END => Received::SetupEnd,
            _ if line.starts_with(status_prefix) => Received::SetupEnd,
            _ => Received::Chatter(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts() {
        for (line, field) in &[
            ("enter ssid:", Field::Ssid),
            ("enter password:", Field::Password),
            ("enter syslog ip:", Field::SyslogIp),
            ("enter syslog port:", Field::SyslogPort),
        ] {
            assert_eq!(
                Received::parse(line, Variant::Apply),
                Received::Prompt(*field)
            );
        }
    }

    #[test]
    fn empty_line_is_idle() {
        assert_eq!(Received::parse("", Variant::Apply), Received::Idle);
        assert_eq!(Received::parse("", Variant::Clear), Received::Idle);
    }

    #[test]
    fn matching_is_exact() {
        assert_eq!(
            Received::parse("Enter SSID:", Variant::Apply),
            Received::Chatter("Enter SSID:")
        );
        assert_eq!(
            Received::parse("enter ssid: ", Variant::Apply),
            Received::Chatter("enter ssid: ")
        );
    }

    #[test]
    fn setup_end() {
        assert_eq!(
            Received::parse("setup end", Variant::Apply),
            Received::SetupEnd
        );
        assert_eq!(
            Received::parse("Config saved", Variant::Apply),
            Received::SetupEnd
        );
    }

    #[test]
    fn apply_status_needs_trailing_space() {
        assert_eq!(
            Received::parse("Configured", Variant::Apply),
            Received::Chatter("Configured")
        );
        assert_eq!(
            Received::parse("Configured", Variant::Clear),
            Received::SetupEnd
        );
    }
}
