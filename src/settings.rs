//! Settings of an `espcom` session: the serial link, the values pushed into
//! the device configuration and the device profile.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values. Once finalized, the settings are
//! only ever read.

use std::{fmt, time::Duration};

use crate::error::{Error, Result};

// =============================================================================
// Public Interface
// =============================================================================

/// The device boards `espcom` knows how to flash.
///
/// The profile selects the baud rate used by the flashing tool and the set of
/// firmware images written to the board. It has no effect on the
/// configuration handshake itself.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DeviceProfile {
    /// A generic ESP32 dev board running the sensor firmware.
    Esp32,
    /// An M5StickC Plus2.
    M5StickCPlus2,
}
impl DeviceProfile {
    /// Baud rate for the flashing tool.
    pub fn flash_baud_rate(self) -> u32 {
        match self {
            DeviceProfile::Esp32 => 115_200,
            DeviceProfile::M5StickCPlus2 => 1_500_000,
        }
    }

    /// Size of the flash chip, as understood by `esptool`.
    pub fn flash_size(self) -> &'static str {
        match self {
            DeviceProfile::Esp32 => "4MB",
            DeviceProfile::M5StickCPlus2 => "8MB",
        }
    }

    /// Base name of the firmware image files.
    pub fn image_name(self) -> &'static str {
        match self {
            DeviceProfile::Esp32 => "twESP32Sensor",
            DeviceProfile::M5StickCPlus2 => "twM5StickCP2Sensor",
        }
    }
}
impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceProfile::Esp32 => f.write_str("ESP32"),
            DeviceProfile::M5StickCPlus2 => f.write_str("M5StickC Plus2"),
        }
    }
}

/// Groups all settings of an `espcom` session and acts as a
/// [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// for the settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// The port name, usually the device path.
    pub path: Option<String>,
    /// The baud rate of the device console in symbols-per-second.
    pub baud_rate: u32,
    /// How long a single read may wait for the device before it counts as an
    /// idle window.
    pub read_timeout: Duration,

    /// Name of the Wi-Fi network the device joins.
    pub ssid: Option<String>,
    /// Secret of the Wi-Fi network. An empty secret is valid (open network).
    pub password: String,
    /// Host receiving the device syslog messages.
    pub syslog_ip: Option<String>,
    /// UDP port of the syslog host.
    pub syslog_port: u16,

    /// The board being provisioned.
    pub profile: DeviceProfile,
    /// Explicit path to `esptool`. When not set, `espcom` looks it up.
    pub esptool: Option<String>,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}
impl Settings {
    /// Check that a serial port was selected.
    pub fn check_port(&self) -> Result<&str> {
        self.path.as_deref().ok_or(Error::MissingField("serial port"))
    }

    /// Check everything the configuration handshake needs before the device
    /// is even opened.
    pub fn check_apply(&self) -> Result<()> {
        self.check_port()?;
        self.check_fields()
    }

    /// Check the values pushed into the device configuration, whatever the
    /// port.
    pub fn check_fields(&self) -> Result<()> {
        if self.ssid.as_deref().unwrap_or_default().is_empty() {
            return Err(Error::MissingField("ssid"));
        }
        if self.syslog_ip.as_deref().unwrap_or_default().is_empty() {
            return Err(Error::MissingField("syslog ip"));
        }
        Ok(())
    }
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set.
///
/// **Example**
///
/// ```
/// use espcom::SettingsBuilder;
///
/// let settings = SettingsBuilder::new()
///     .path("/dev/ttyUSB0")
///     .ssid("home")
///     .syslog_ip("192.168.1.10")
///     .finalize();
/// assert_eq!(settings.syslog_port, 514);
/// ```
pub struct SettingsBuilder {
    settings: Settings,
}
impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
impl From<Settings> for SettingsBuilder {
    /// Resume building from finalized settings.
    fn from(settings: Settings) -> Self {
        SettingsBuilder { settings }
    }
}
impl SettingsBuilder {
    /// Start building the settings using default values and no path for the
    /// port.
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings {
                path: None,
                baud_rate: 115_200,
                read_timeout: Duration::from_secs(10),
                ssid: None,
                password: String::new(),
                syslog_ip: None,
                syslog_port: 514,
                profile: DeviceProfile::Esp32,
                esptool: None,
                _private_use_builder: (),
            },
        }
    }

    /// Set the path to the serial port
    pub fn path<'a>(mut self, path: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.path = Some(path.into().into_owned());
        self
    }

    /// Set the baud rate in symbols-per-second
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.baud_rate = baud_rate;
        self
    }

    /// Set the per-line read timeout
    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.settings.read_timeout = read_timeout;
        self
    }

    /// Set the Wi-Fi network name
    pub fn ssid<'a>(mut self, ssid: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.ssid = Some(ssid.into().into_owned());
        self
    }

    /// Set the Wi-Fi network secret
    pub fn password<'a>(mut self, password: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.password = password.into().into_owned();
        self
    }

    /// Set the syslog destination host
    pub fn syslog_ip<'a>(mut self, syslog_ip: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.syslog_ip = Some(syslog_ip.into().into_owned());
        self
    }

    /// Set the syslog destination port
    pub fn syslog_port(mut self, syslog_port: u16) -> Self {
        self.settings.syslog_port = syslog_port;
        self
    }

    /// Set the device profile
    pub fn profile(mut self, profile: DeviceProfile) -> Self {
        self.settings.profile = profile;
        self
    }

    /// Set the path to `esptool`
    pub fn esptool<'a>(mut self, esptool: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.esptool = Some(esptool.into().into_owned());
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        Settings {
            path: None,
            baud_rate: 115_200,
            read_timeout: Duration::from_secs(10),
            ssid: None,
            password: String::new(),
            syslog_ip: None,
            syslog_port: 514,
            profile: DeviceProfile::Esp32,
            esptool: None,
            _private_use_builder: (),
        }
    )
}

#[test]
fn path() {
    let settings = SettingsBuilder::new().path("/dev/ttyUSB0").finalize();
    assert_eq!(settings.path.unwrap(), "/dev/ttyUSB0");
}

#[test]
fn credentials() {
    let settings = SettingsBuilder::new()
        .ssid("home")
        .password("s3cret")
        .finalize();
    assert_eq!(settings.ssid.unwrap(), "home");
    assert_eq!(settings.password, "s3cret");
}

#[test]
fn syslog_destination() {
    let settings = SettingsBuilder::new()
        .syslog_ip("10.0.0.2")
        .syslog_port(5514)
        .finalize();
    assert_eq!(settings.syslog_ip.unwrap(), "10.0.0.2");
    assert_eq!(settings.syslog_port, 5514);
}

#[test]
fn profile() {
    let settings = SettingsBuilder::new()
        .profile(DeviceProfile::M5StickCPlus2)
        .finalize();
    assert_eq!(settings.profile.flash_baud_rate(), 1_500_000);
    assert_eq!(settings.profile.flash_size(), "8MB");
}

#[test]
fn apply_requires_port() {
    let settings = SettingsBuilder::new()
        .ssid("home")
        .syslog_ip("10.0.0.2")
        .finalize();
    assert!(matches!(
        settings.check_apply(),
        Err(Error::MissingField("serial port"))
    ));
}

#[test]
fn apply_requires_ssid() {
    let settings = SettingsBuilder::new()
        .path("/dev/ttyUSB0")
        .ssid("")
        .syslog_ip("10.0.0.2")
        .finalize();
    assert!(matches!(
        settings.check_apply(),
        Err(Error::MissingField("ssid"))
    ));
}

#[test]
fn apply_requires_syslog_ip() {
    let settings = SettingsBuilder::new()
        .path("/dev/ttyUSB0")
        .ssid("home")
        .finalize();
    assert!(matches!(
        settings.check_apply(),
        Err(Error::MissingField("syslog ip"))
    ));
}

#[test]
fn apply_accepts_empty_password() {
    let settings = SettingsBuilder::new()
        .path("/dev/ttyUSB0")
        .ssid("home")
        .syslog_ip("10.0.0.2")
        .finalize();
    assert!(settings.check_apply().is_ok());
}

#[test]
fn fields_checked_without_port() {
    let settings = SettingsBuilder::new().syslog_ip("10.0.0.2").finalize();
    assert!(matches!(
        settings.check_fields(),
        Err(Error::MissingField("ssid"))
    ));

    let settings = SettingsBuilder::new().ssid("home").finalize();
    assert!(matches!(
        settings.check_fields(),
        Err(Error::MissingField("syslog ip"))
    ));

    let settings = SettingsBuilder::new()
        .ssid("home")
        .syslog_ip("10.0.0.2")
        .finalize();
    assert!(settings.check_fields().is_ok());
}

#[test]
fn resume_building() {
    let settings = SettingsBuilder::new().ssid("home").finalize();
    let settings = SettingsBuilder::from(settings)
        .path("/dev/ttyUSB0")
        .finalize();
    assert_eq!(settings.ssid.as_deref(), Some("home"));
    assert_eq!(settings.path.as_deref(), Some("/dev/ttyUSB0"));
}
