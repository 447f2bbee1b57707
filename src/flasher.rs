//! Firmware flashing through `esptool`.
//!
//! `espcom` does not talk the ROM bootloader protocol itself. It builds the
//! `esptool` command line for the selected [`DeviceProfile`], runs the tool and
//! relays its output to the console.

use std::{
    env,
    ffi::OsString,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    thread,
};

use log::{debug, info, warn};

use crate::{
    error::{Error, Result},
    settings::DeviceProfile,
};

/// Flash addresses and image suffixes, in write order. `None` marks the image
/// shared by all profiles.
const IMAGES: [(&str, Option<&str>); 4] = [
    ("0x1000", Some(".ino.bootloader.bin")),
    ("0x8000", Some(".ino.partitions.bin")),
    ("0xe000", None),
    ("0x10000", Some(".ino.bin")),
];

const BOOT_APP0: &str = "./boot_app0.bin";

// =============================================================================
// Public Interface
// =============================================================================

/// A fully resolved command line for the flashing tool.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}
impl Invocation {
    /// Build the invocation of `tool` with `args`, going through a python
    /// interpreter when the tool is a script.
    pub fn new(tool: &Path, args: Vec<String>) -> Result<Self> {
        Self::with_search_path(tool, args, env::var_os("PATH"))
    }

    fn with_search_path(
        tool: &Path,
        args: Vec<String>,
        search_path: Option<OsString>,
    ) -> Result<Self> {
        let args = args.into_iter().map(OsString::from);
        if tool.extension().map_or(false, |ext| ext == "py") {
            let python = ["python", "python3"]
                .iter()
                .find_map(|name| find_in_path(name, search_path.clone()))
                .ok_or_else(|| Error::InterpreterNotFound(tool.to_path_buf()))?;
            return Ok(Invocation {
                program: python,
                args: std::iter::once(tool.as_os_str().to_owned())
                    .chain(args)
                    .collect(),
            });
        }
        Ok(Invocation {
            program: tool.to_path_buf(),
            args: args.collect(),
        })
    }
}

/// Locate `esptool`: the explicit path when given, otherwise `esptool` on the
/// `PATH`, then `./esptool`.
pub fn find_tool(explicit: Option<&str>) -> Result<PathBuf> {
    find_tool_with(explicit, env::var_os("PATH"))
}

/// Arguments writing the firmware images of `profile` through `port`.
pub fn write_args(profile: DeviceProfile, port: &str) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--chip".into(),
        "esp32".into(),
        "--port".into(),
        port.into(),
        "--baud".into(),
        profile.flash_baud_rate().to_string(),
        "--before".into(),
        "default_reset".into(),
        "--after".into(),
        "hard_reset".into(),
        "write_flash".into(),
        "-z".into(),
        "--flash_mode".into(),
        "dio".into(),
        "--flash_freq".into(),
        "80m".into(),
        "--flash_size".into(),
        profile.flash_size().into(),
    ];
    args.extend(image_args(profile));
    args
}

/// Arguments merging the M5StickC Plus2 images into the single file expected
/// by M5Burner.
pub fn merge_args() -> Vec<String> {
    let profile = DeviceProfile::M5StickCPlus2;
    let mut args: Vec<String> = vec![
        "--chip".into(),
        "esp32".into(),
        "merge_bin".into(),
        "-o".into(),
        format!("{}.bin", profile.image_name()),
        "--flash_mode".into(),
        "dio".into(),
        "--flash_size".into(),
        profile.flash_size().into(),
    ];
    args.extend(image_args(profile));
    args
}

/// Run the tool, relaying its standard output and error to the console.
///
/// Both streams are drained on their own thread while waiting for the tool to
/// exit, so their relative order on the console is not preserved. The exit
/// status is logged and otherwise left to the operator to read from the tool
/// output.
pub fn run(invocation: &Invocation) -> Result<()> {
    info!("{} {:?}", invocation.program.display(), invocation.args);
    let mut child = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(Error::Spawn)?;

    let stdout = child
        .stdout
        .take()
        .map(|pipe| thread::spawn(move || relay(pipe, io::stdout())));
    let stderr = child
        .stderr
        .take()
        .map(|pipe| thread::spawn(move || relay(pipe, io::stderr())));

    let status = child.wait()?;
    for relay_thread in stdout.into_iter().chain(stderr) {
        if relay_thread.join().is_err() {
            warn!("output relay thread panicked");
        }
    }

    if status.success() {
        info!("esptool finished");
    } else {
        warn!("esptool exited with {}", status);
    }
    Ok(())
}

/// Write the images of `profile` to the device on `port`.
pub fn write_firmware(esptool: Option<&str>, profile: DeviceProfile, port: &str) -> Result<()> {
    let tool = find_tool(esptool)?;
    run(&Invocation::new(&tool, write_args(profile, port))?)
}

/// Produce the merged M5StickC Plus2 image.
pub fn merge_firmware(esptool: Option<&str>) -> Result<()> {
    let tool = find_tool(esptool)?;
    run(&Invocation::new(&tool, merge_args())?)
}

// =============================================================================
// Private stuff
// =============================================================================

fn find_tool_with(explicit: Option<&str>, search_path: Option<OsString>) -> Result<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    find_in_path("esptool", search_path)
        .or_else(|| Some(PathBuf::from("./esptool")).filter(|p| p.is_file()))
        .ok_or(Error::ToolNotFound)
}

fn find_in_path(name: &str, search_path: Option<OsString>) -> Option<PathBuf> {
    let search_path = search_path?;
    let found = env::split_paths(&search_path)
        .flat_map(|dir| candidates(&dir, name))
        .find(|candidate| candidate.is_file());
    debug!("looking up {}: {:?}", name, found);
    found
}

fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    if cfg!(windows) {
        vec![dir.join(format!("{}.exe", name)), dir.join(name)]
    } else {
        vec![dir.join(name)]
    }
}

fn image_args(profile: DeviceProfile) -> Vec<String> {
    IMAGES
        .iter()
        .flat_map(|(address, suffix)| {
            let image = match suffix {
                Some(suffix) => format!("./{}{}", profile.image_name(), suffix),
                None => BOOT_APP0.to_string(),
            };
            vec![address.to_string(), image]
        })
        .collect()
}

fn relay<R: Read, W: Write>(mut from: R, mut to: W) {
    let mut buf = [0u8; 1024];
    loop {
        match from.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                let _ = to.write_all(&buf[..n]);
                let _ = to.flush();
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
