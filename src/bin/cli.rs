//! Espcom command line interface.

use std::process;

use clap::{
    crate_authors, crate_description, crate_name, crate_version, App, AppSettings::*,
    Arg, ArgMatches, SubCommand,
};
use console::style;
use log::{debug, trace, LevelFilter};
use simplelog::*;

use espcom::{self as es, flasher, DeviceProfile, Settings};

fn main() {
    ctrlc::set_handler(move || {
        println!("🛑 received Ctrl+C!");
        process::exit(0);
    })
    .expect("Failed to install my Ctrl-C handler!");

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Espcom talks to the sensor firmware over the serial console of \
            the board. To configure the device, it resets the board through \
            the DTR line and answers the prompts printed by the firmware \
            right after boot:\n\
               \t* enter ssid: \n\
               \t* enter password: \n\
               \t* enter syslog ip: \n\
               \t* enter syslog port: \n\
            \n\
            If the device stays silent, it is reset once more before giving \
            up. Firmware images are written with esptool, which must be \
            installed separately.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .setting(SubcommandRequiredElseHelp)
        .setting(VersionlessSubcommands)
        .arg(
            Arg::with_name("PORT")
                .help("the serial port of the device")
                .long_help(
                    "the serial port of the device; when not set, the \
                     connected USB serial adapters are offered for \
                     selection.",
                )
                .short("-p")
                .long("--port")
                .env("ESPCOM_PORT")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("SSID")
                .help("Wi-Fi network name")
                .long("--ssid")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("PASSWORD")
                .help("Wi-Fi network password")
                .long("--password")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("SYSLOG_IP")
                .help("syslog destination host")
                .long("--syslog-ip")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("SYSLOG_PORT")
                .help("syslog destination port [default: 514]")
                .long("--syslog-port")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("M5")
                .help("the device is an M5StickC Plus2")
                .long("--m5")
                .global(true),
        )
        .arg(
            Arg::with_name("ESPTOOL")
                .help("path to esptool")
                .long_help(
                    "path to esptool; when not set, `esptool` is looked up \
                     on the PATH and in the current directory.",
                )
                .long("--esptool")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name("v")
                .short("v")
                .multiple(true)
                .global(true)
                .help(
                    "Sets the logging level of verbosity, repeat several times for \
                     higher verbosity",
                ),
        )
        .subcommand(SubCommand::with_name("list").about("list USB serial ports"))
        .subcommand(SubCommand::with_name("monitor").about("print the device console"))
        .subcommand(SubCommand::with_name("config").about("push Wi-Fi and syslog settings"))
        .subcommand(SubCommand::with_name("clear").about("clear the device configuration"))
        .subcommand(SubCommand::with_name("write").about("write the firmware to the device"))
        .subcommand(SubCommand::with_name("reset").about("reset the device"))
        .subcommand(SubCommand::with_name("merge").about("merge the M5StickC Plus2 firmware"))
        .subcommand(SubCommand::with_name("version").about("show version"))
        .get_matches();

    let (command, sub_matches) = matches.subcommand();
    let args = Args {
        top: &matches,
        sub: sub_matches,
    };

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'espcom -v -v -v' or 'espcom -vvv' vs 'espcom -v'
    let log_level = match args.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .is_err()
    {
        eprintln!("logging is not available");
    }

    trace!("{:#?}", matches);

    if command == "version" {
        println!("{} v{}", crate_name!(), crate_version!());
        return;
    }
    if command == "list" {
        exit_on_error(list());
        return;
    }

    let settings = settings_from(&args);
    exit_on_error(check_before_port(command, &settings));
    let settings = with_port(&args, command, settings);

    let result = match command {
        "monitor" => es::monitor(&settings),
        "config" => es::configure(&settings).map(|report| {
            debug!("{:?}", report);
            println!("{}", style("[ES] ✔ Device configured").green());
        }),
        "clear" => es::clear(&settings).map(|_| {
            println!("{}", style("[ES] ✔ Device configuration cleared").green());
        }),
        "reset" => es::reset(&settings),
        "write" => settings.check_port().and_then(|port| {
            flasher::write_firmware(settings.esptool.as_deref(), settings.profile, port)
        }),
        "merge" => flasher::merge_firmware(settings.esptool.as_deref()),
        _ => unreachable!(),
    };
    exit_on_error(result);
}

fn list() -> es::Result<()> {
    for port in es::list_ports()? {
        println!("{}", port);
    }
    Ok(())
}

/// Options are global: they may come before or after the subcommand.
struct Args<'a> {
    top: &'a ArgMatches<'a>,
    sub: Option<&'a ArgMatches<'a>>,
}
impl<'a> Args<'a> {
    fn value_of(&self, name: &str) -> Option<&'a str> {
        self.sub
            .and_then(|sub| sub.value_of(name))
            .or_else(|| self.top.value_of(name))
    }

    fn is_present(&self, name: &str) -> bool {
        self.sub.map_or(false, |sub| sub.is_present(name)) || self.top.is_present(name)
    }

    fn occurrences_of(&self, name: &str) -> u64 {
        // Globals may be propagated to the subcommand, don't count them twice.
        let sub = self.sub.map_or(0, |sub| sub.occurrences_of(name));
        sub.max(self.top.occurrences_of(name))
    }
}

fn settings_from(args: &Args) -> Settings {
    let mut builder = es::SettingsBuilder::new();

    if let Some(value) = args.value_of("SYSLOG_PORT") {
        let syslog_port = value.parse::<u16>().unwrap_or_else(|_| {
            println!(
                "{}: `{}` needs to be a port number",
                style("error").red(),
                style("syslog-port").cyan()
            );
            println!(
                "   {} `{}` is not a valid value",
                style("-->").cyan(),
                style(value).on_red()
            );
            process::exit(-1);
        });
        builder = builder.syslog_port(syslog_port);
    }

    if args.is_present("M5") {
        builder = builder.profile(DeviceProfile::M5StickCPlus2);
    }

    // START - Arguments with NO default values ================================

    if let Some(ssid) = args.value_of("SSID") {
        builder = builder.ssid(ssid);
    }
    if let Some(password) = args.value_of("PASSWORD") {
        builder = builder.password(password);
    }
    if let Some(syslog_ip) = args.value_of("SYSLOG_IP") {
        builder = builder.syslog_ip(syslog_ip);
    }
    if let Some(esptool) = args.value_of("ESPTOOL") {
        builder = builder.esptool(esptool);
    }

    // END - Arguments =========================================================

    builder.finalize()
}

/// Reject the command line before waiting for a port to be picked.
fn check_before_port(command: &str, settings: &Settings) -> es::Result<()> {
    match command {
        "config" => settings.check_fields(),
        _ => Ok(()),
    }
}

fn with_port(args: &Args, command: &str, settings: Settings) -> Settings {
    // Merging works on local files only, no need for a port.
    let port = match args.value_of("PORT") {
        Some(port) => Some(port.to_string()),
        None if command != "merge" => es::select_port(),
        None => None,
    };
    let builder = es::SettingsBuilder::from(settings);
    match port {
        Some(port) => builder.path(port).finalize(),
        None => builder.finalize(),
    }
}

fn exit_on_error(result: es::Result<()>) {
    if let Err(e) = result {
        println!("{}", style(format!("[ES] 💥 {}", e)).red());
        process::exit(1);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
