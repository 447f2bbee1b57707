//! Serial port device manipulation.

use std::{fmt, thread, time::Duration};

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use serialport::{available_ports, DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};

use crate::{error::Result, Settings};

//==============================================================================
// Public Interface
//==============================================================================

/// A USB serial adapter connected to the system.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PortDescriptor {
    /// The port name, usually the device path.
    pub name: String,
    pub vid: u16,
    pub pid: u16,
    pub serial_number: Option<String>,
}
impl fmt::Display for PortDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:04x}/{:04x}:{})",
            self.name,
            self.vid,
            self.pid,
            self.serial_number.as_deref().unwrap_or_default()
        )
    }
}

/// Enumerates the USB serial adapters on the system.
pub fn list_ports() -> Result<Vec<PortDescriptor>> {
    let ports = available_ports()?
        .into_iter()
        .filter_map(|p| match p.port_type {
            SerialPortType::UsbPort(info) => Some(PortDescriptor {
                name: p.port_name,
                vid: info.vid,
                pid: info.pid,
                serial_number: info.serial_number,
            }),
            _ => None,
        })
        .collect();
    Ok(ports)
}

/// Wait for at least one USB serial adapter to be connected and let the user
/// pick one of them.
///
/// Returns `None` when the user cancelled the selection.
pub fn select_port() -> Option<String> {
    let mut found_ports;
    let mut attempt: usize = 1;
    let waiting_period: usize = 1;

    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(120);
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"])
            .template("[ES] {spinner:.blue} {msg}"),
    );

    // Avoid cursor flicker during the waiting
    let _ = Term::stdout().hide_cursor();
    loop {
        found_ports = match list_ports() {
            Ok(ports) => ports,
            Err(ref e) => {
                info!("error: {}", e);
                vec![]
            }
        };
        if !found_ports.is_empty() {
            pb.finish_with_message("Select a port to be used:");
            break;
        }

        let waited = attempt * waiting_period;
        pb.set_message(format!(
            "[{:03}s] ⌛ Waiting for a USB serial adapter to be connected...",
            style(waited).dim(),
        ));
        attempt += 1;

        thread::sleep(Duration::from_secs(waiting_period as u64));
    }
    let _ = Term::stdout().show_cursor();

    let selection = select_port_interactive(&found_ports);
    match &selection {
        Some(path) => {
            pb.finish_with_message(format!("👍 Serial port {} is ready", style(path).green()));
        }
        None => {
            pb.finish_with_message("❌ Selection canceled");
        }
    }
    selection
}

//==============================================================================
// Crate-Public Interface
//==============================================================================

/// Open the port described by `settings`: 8N1, no flow control, DTR and RTS
/// asserted so the device runs, and reads bounded by the per-line timeout.
pub(crate) fn open_and_setup_port(settings: &Settings) -> Result<Box<dyn SerialPort>> {
    let path = settings.check_port()?;
    let mut port = serialport::new(path, settings.baud_rate)
        .data_bits(DataBits::Eight)
        .stop_bits(StopBits::One)
        .parity(Parity::None)
        .flow_control(FlowControl::None)
        .timeout(settings.read_timeout)
        .open()?;

    port.write_data_terminal_ready(true)?;
    port.write_request_to_send(true)?;

    info!(
        "Connected to {} at {} baud",
        path,
        port.baud_rate()?
    );
    debug!("read timeout : {:?}", port.timeout());

    Ok(port)
}

//==============================================================================
// Private stuff
//==============================================================================

fn select_port_interactive(ports: &[PortDescriptor]) -> Option<String> {
    use dialoguer::{theme::ColorfulTheme, Select};

    let term = Term::buffered_stderr();
    let theme = ColorfulTheme::default();

    let mut select = Select::with_theme(&theme);
    for item in ports {
        select.item(item.to_string());
    }

    match select.default(0).interact_on_opt(&term) {
        Ok(Some(index)) => ports.get(index).map(|p| p.name.clone()),
        Ok(None) => None,
        Err(ref e) => {
            info!("error: {}", e);
            None
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn descriptor_display() {
    let port = PortDescriptor {
        name: "/dev/ttyUSB0".into(),
        vid: 0x1a86,
        pid: 0x55d4,
        serial_number: Some("5434012345".into()),
    };
    assert_eq!(port.to_string(), "/dev/ttyUSB0 (1a86/55d4:5434012345)");
}

#[test]
fn descriptor_display_without_serial_number() {
    let port = PortDescriptor {
        name: "COM3".into(),
        vid: 0x10c4,
        pid: 0xea60,
        serial_number: None,
    };
    assert_eq!(port.to_string(), "COM3 (10c4/ea60:)");
}
