use clap::{ArgAction, Parser, ValueEnum};
use omnikflow::{
    device::{Context, ListenerConfig},
    devices::{self, Device},
    output::{OutputFormat, Printer},
    Role,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about=None)]
struct Cli {
    /// Serial device to read from
    device: String,

    /// Kind of device on the serial line
    #[arg(long, value_enum, default_value_t=RoleEnum::Inverter)]
    role: RoleEnum,

    /// Output protocol
    #[arg(long, value_enum, default_value_t=OutEnum::Stringify)]
    output: OutEnum,

    /// Baud rate of the serial line
    #[arg(long, default_value_t=devices::omnik::BAUD_RATE)]
    baud: u32,

    /// Maximum gap between two bytes of a frame, in milliseconds
    #[arg(long, default_value_t = 50)]
    timeout_ms: u64,

    /// Drop partial frames that grow beyond this many bytes
    #[arg(long)]
    max_buffer: Option<usize>,

    /// Poll a blocking port instead of the async stream
    #[arg(long)]
    blocking: bool,

    /// More log output, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Less log output, repeat for less
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "verbose")]
    quiet: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum RoleEnum {
    /// Omnik inverter
    Inverter,
    /// Omnik wifi datalogger
    Logger,
}

impl From<RoleEnum> for Role {
    fn from(role: RoleEnum) -> Self {
        match role {
            RoleEnum::Inverter => Role::Inverter,
            RoleEnum::Logger => Role::Logger,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutEnum {
    /// Stringify
    Stringify,
    /// InfluxDB Line Protocol
    Influxdb,
}

impl From<OutEnum> for OutputFormat {
    fn from(output: OutEnum) -> Self {
        match output {
            OutEnum::Stringify => OutputFormat::Stringify,
            OutEnum::Influxdb => OutputFormat::Influxdb,
        }
    }
}

fn log_level(verbose: u8, quiet: u8) -> &'static str {
    match verbose as i16 - quiet as i16 {
        i16::MIN..=-2 => "error",
        -1 => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(cli.verbose, cli.quiet)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let role = Role::from(cli.role);
    let config = ListenerConfig {
        inter_byte_timeout: Duration::from_millis(cli.timeout_ms),
        max_buffer: cli.max_buffer,
        context: Context::new(format!("omnik_{}", role)),
    };

    let mut reader = make_reader(&cli, role, config)?;
    let mut sink = Printer::new(std::io::stdout(), cli.output.into(), "omnik").with_tag("role", role);

    tracing::info!(device = %cli.device, %role, "listening");
    let res = reader.listen(&mut sink).await;
    tracing::info!(stats = ?reader.stats(), "stopped");
    res
}

fn make_reader(cli: &Cli, role: Role, config: ListenerConfig) -> anyhow::Result<Box<dyn Device + Send>> {
    if cli.blocking {
        Ok(Box::new(devices::Blocking::new(cli.device.as_str(), cli.baud, role, config)?))
    } else {
        Ok(Box::new(devices::Omnik::new(cli.device.as_str(), cli.baud, role, config)?))
    }
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}

#[test]
fn verify_log_level() {
    assert_eq!(log_level(0, 0), "info");
    assert_eq!(log_level(2, 0), "trace");
    assert_eq!(log_level(0, 3), "error");
}
