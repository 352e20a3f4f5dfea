//! Command-line Modbus TCP client

use std::net::SocketAddr;
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use mbtcp::prelude::*;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("{0}")]
    BadInt(#[from] ParseIntError),
    #[error("bad character in bit string: {0}")]
    BadCharInBitString(char),
    #[error("{0}")]
    NotConnected(String),
}

#[derive(Parser)]
#[command(name = "mbtcp-client")]
#[command(about = "A command line program for making Modbus TCP client requests using the mbtcp crate")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "127.0.0.1:502", help = "A socket address")]
    host: SocketAddr,

    #[arg(short = 't', long, default_value = "500", help = "Response timeout in milliseconds")]
    timeout: u64,

    #[arg(short = 'e', long, help = "Read back the affected range after multiple and mask writes")]
    echo: bool,

    #[arg(
        short = 'd',
        long,
        default_value = "values",
        help = "PDU decode level (nothing, function, headers, values)"
    )]
    decode: PduDecodeLevel,

    #[arg(short = 'p', long, help = "Optional polling period in milliseconds")]
    period: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(name = "rc", about = "read coils")]
    ReadCoils(ReadArgs),

    #[command(name = "rdi", about = "read discrete inputs")]
    ReadDiscreteInputs(ReadArgs),

    #[command(name = "rhr", about = "read holding registers")]
    ReadHoldingRegisters(ReadArgs),

    #[command(name = "rir", about = "read input registers")]
    ReadInputRegisters(ReadArgs),

    #[command(name = "wsc", about = "write single coil")]
    WriteSingleCoil(WriteSingleCoilArgs),

    #[command(name = "wsr", about = "write single register")]
    WriteSingleRegister(WriteSingleRegisterArgs),

    #[command(name = "wmc", about = "write multiple coils")]
    WriteMultipleCoils(WriteMultipleCoilsArgs),

    #[command(name = "wmr", about = "write multiple registers")]
    WriteMultipleRegisters(WriteMultipleRegistersArgs),

    #[command(name = "mwr", about = "mask write register")]
    MaskWriteRegister(MaskWriteRegisterArgs),
}

#[derive(Args)]
struct ReadArgs {
    #[arg(short = 's', long, help = "the starting address")]
    start: u16,

    #[arg(short = 'q', long, help = "quantity of values")]
    quantity: u16,
}

#[derive(Args)]
struct WriteSingleCoilArgs {
    #[arg(short = 'i', long, help = "the address of the coil")]
    index: u16,

    #[arg(short = 'v', long, help = "the value of the coil (true or false)")]
    value: bool,
}

#[derive(Args)]
struct WriteSingleRegisterArgs {
    #[arg(short = 'i', long, help = "the address of the register")]
    index: u16,

    #[arg(short = 'v', long, help = "the value of the register")]
    value: u16,
}

#[derive(Args)]
struct WriteMultipleCoilsArgs {
    #[arg(short = 's', long, help = "the starting address of the coils")]
    start: u16,

    #[arg(
        short = 'v',
        long,
        help = "the values of the coils specified as a string of 1 and 0 (e.g. 10100011)"
    )]
    values: String,
}

#[derive(Args)]
struct WriteMultipleRegistersArgs {
    #[arg(short = 's', long, help = "the starting address of the registers")]
    start: u16,

    #[arg(
        short = 'v',
        long,
        help = "the values of the registers specified as a comma delimited list (e.g. 1,4,7)"
    )]
    values: String,
}

#[derive(Args)]
struct MaskWriteRegisterArgs {
    #[arg(short = 'i', long, help = "the address of the register")]
    index: u16,

    #[arg(short = 'a', long, help = "the AND mask")]
    and_mask: u16,

    #[arg(short = 'o', long, help = "the OR mask")]
    or_mask: u16,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    if let Err(ref e) = run().await {
        println!("error: {e}");
    }

    Ok(())
}

async fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    let request = cli.command.to_request()?;

    let config = ClientConfig::new(cli.host)
        .response_timeout(Duration::from_millis(cli.timeout))
        .echo_writes(cli.echo)
        .decode(cli.decode.into());

    let (channel, mut events) = spawn_client_task(config, 1);

    match events.recv().await {
        Some(ClientEvent::Connected(addr)) => tracing::info!("connected to {addr}"),
        Some(ClientEvent::Error(msg)) => return Err(Error::NotConnected(msg)),
        _ => return Err(Error::NotConnected(format!("unable to connect to {}", cli.host))),
    }

    match cli.period {
        None => execute(&channel, &mut events, &request).await,
        Some(period_ms) => {
            let period = Duration::from_millis(period_ms);
            loop {
                execute(&channel, &mut events, &request).await;
                tokio::time::sleep(period).await
            }
        }
    }

    Ok(())
}

async fn execute(channel: &Channel, events: &mut EventReceiver, request: &Request) {
    // the outcome is also delivered as an event, exactly one per request
    channel.execute(request.clone()).await.ok();

    if let Some(event) = events.recv().await {
        println!("{event}");
    }
}

impl Command {
    fn to_request(&self) -> Result<Request, Error> {
        let request = match self {
            Command::ReadCoils(args) => Request::ReadCoils {
                start: args.start,
                quantity: args.quantity,
            },
            Command::ReadDiscreteInputs(args) => Request::ReadDiscreteInputs {
                start: args.start,
                quantity: args.quantity,
            },
            Command::ReadHoldingRegisters(args) => Request::ReadHoldingRegisters {
                start: args.start,
                quantity: args.quantity,
            },
            Command::ReadInputRegisters(args) => Request::ReadInputRegisters {
                start: args.start,
                quantity: args.quantity,
            },
            Command::WriteSingleCoil(args) => Request::WriteSingleCoil {
                address: args.index,
                value: args.value,
            },
            Command::WriteSingleRegister(args) => Request::WriteSingleRegister {
                address: args.index,
                value: args.value,
            },
            Command::WriteMultipleCoils(args) => Request::WriteMultipleCoils {
                start: args.start,
                values: parse_bit_values(&args.values)?,
            },
            Command::WriteMultipleRegisters(args) => Request::WriteMultipleRegisters {
                start: args.start,
                values: parse_register_values(&args.values)?,
            },
            Command::MaskWriteRegister(args) => Request::MaskWriteRegister {
                address: args.index,
                mask: MaskWrite {
                    and_mask: args.and_mask,
                    or_mask: args.or_mask,
                },
            },
        };
        Ok(request)
    }
}

/// the right-most character is the first coil
fn parse_bit_values(values_str: &str) -> Result<Vec<bool>, Error> {
    let mut values: Vec<bool> = Vec::new();
    for c in values_str.chars().rev() {
        match c {
            '0' => values.push(false),
            '1' => values.push(true),
            _ => return Err(Error::BadCharInBitString(c)),
        }
    }
    Ok(values)
}

fn parse_register_values(values_str: &str) -> Result<Vec<u16>, ParseIntError> {
    let mut values: Vec<u16> = Vec::new();
    for value in values_str.split(',') {
        values.push(u16::from_str(value.trim())?);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bit_string_right_to_left() {
        assert_eq!(
            parse_bit_values("0011").unwrap(),
            vec![true, true, false, false]
        );
        assert!(matches!(
            parse_bit_values("01x"),
            Err(Error::BadCharInBitString('x'))
        ));
    }

    #[test]
    fn builds_mask_write_request() {
        let cli = Cli::try_parse_from(["mbtcp-client", "mwr", "-i", "4", "-a", "242", "-o", "37"])
            .unwrap();
        assert_eq!(
            cli.command.to_request().unwrap(),
            Request::MaskWriteRegister {
                address: 4,
                mask: MaskWrite {
                    and_mask: 0x00F2,
                    or_mask: 0x0025
                }
            }
        );
    }

    #[test]
    fn parses_register_list() {
        assert_eq!(parse_register_values("1, 4,7").unwrap(), vec![1, 4, 7]);
        assert!(parse_register_values("1,70000").is_err());
    }

    #[test]
    fn cli_maps_flags() {
        let cli = Cli::try_parse_from([
            "mbtcp-client",
            "--host",
            "10.0.0.1:5020",
            "--timeout",
            "250",
            "--echo",
            "--decode",
            "headers",
            "rhr",
            "-s",
            "100",
            "-q",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.host, "10.0.0.1:5020".parse::<SocketAddr>().unwrap());
        assert_eq!(cli.timeout, 250);
        assert!(cli.echo);
        assert_eq!(cli.decode, PduDecodeLevel::DataHeaders);
        assert_eq!(
            cli.command.to_request().unwrap(),
            Request::ReadHoldingRegisters {
                start: 100,
                quantity: 2
            }
        );
    }
}
