use clap::{Args, Subcommand};
use std::path::PathBuf;

use subghz_link::{Im920Interface, LinkConfig};
use subghz_transport::{BaudRate, SerialStream};

use crate::exit::{link_error, transport_error, CliResult};
use crate::output::OutputFormat;

pub mod config;
pub mod exec;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print frames received over the air.
    Listen(ListenArgs),
    /// Transmit a payload as numbered packets.
    Send(SendArgs),
    /// Run a raw module command and print its response.
    Exec(ExecArgs),
    /// Show or change the intermittent receive timing.
    Config(ConfigArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Exec(args) => exec::run(args, format),
        Command::Config(args) => config::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct PortArgs {
    /// Serial device (or socket) the module is attached to.
    pub port: PathBuf,
    /// Line speed.
    #[arg(long, default_value_t = 19200, env = "SUBGHZ_BAUD")]
    pub baud: u32,
    /// Quiet time that ends a multi-line response (e.g. 5ms). Default: one byte time.
    #[arg(long, value_name = "DURATION")]
    pub response_idle: Option<String>,
}

impl PortArgs {
    pub fn open(&self) -> CliResult<Im920Interface<SerialStream>> {
        let baud =
            BaudRate::from_baud(self.baud).map_err(|err| transport_error("invalid --baud", err))?;
        let mut config = LinkConfig::new(baud);
        if let Some(idle) = &self.response_idle {
            config.response_idle = Some(parse_duration(idle)?);
        }
        Im920Interface::open_with_config(&self.port, config).map_err(|err| {
            link_error(&format!("failed opening {}", self.port.display()), err)
        })
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Only print frames from these senders (hex module ids, comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub senders: Option<Vec<String>>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Text payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex-encoded payload.
    #[arg(long, conflicts_with_all = ["data", "file", "notice"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex", "notice"])]
    pub file: Option<PathBuf>,
    /// Send the --data text as a single NOTICE packet instead of DATA.
    #[arg(long, requires = "data")]
    pub notice: bool,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Module command, e.g. RDID or STNN01.
    pub command: String,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// New active time per receive cycle (hex).
    #[arg(long, value_name = "HEX", value_parser = parse_hex_u16)]
    pub active: Option<u16>,
    /// New sleep time per receive cycle (hex).
    #[arg(long, value_name = "HEX", value_parser = parse_hex_u16)]
    pub sleep: Option<u16>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_hex_u16(input: &str) -> Result<u16, String> {
    let digits = input.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|err| format!("invalid hex value {input:?}: {err}"))
}

pub fn parse_duration(input: &str) -> CliResult<std::time::Duration> {
    use crate::exit::{CliError, USAGE};
    use std::time::Duration;

    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "s" => Ok(Duration::from_secs(value)),
        _ => Ok(Duration::from_millis(value)),
    }
}
