use clap::{Parser, Subcommand};
use embserial::config::{Config, ConfigLoader, LogFormat};
use embserial::port::{self, Port};
use embserial::rs485::HalfDuplex;
use serde_json::json;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Serial line and RS485 half-duplex utility.",
    long_about = "Opens serial devices exclusively, inspects modem lines and sends data, optionally with RS485 driver-enable turnaround. Port names may be aliases from the [serial] section of the configuration file."
)]
struct Args {
    /// Configuration file (overrides the standard search path)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "embserial=trace" (overrides [logging].level)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial devices present on this machine
    List,

    /// Show the CTS, DSR and RING inputs of a port
    Lines {
        port: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Write a message and read it back through a TX-RX jumper
    Loopback {
        port: String,
        #[arg(default_value = "Hari Aum")]
        message: String,
        #[arg(short, long)]
        baud: Option<u32>,
    },

    /// Write a message to a port
    Send {
        port: String,
        message: String,
        #[arg(short, long)]
        baud: Option<u32>,
        /// Drive the RS485 enable line around the write ([rs485] section)
        #[arg(long)]
        rs485: bool,
    },

    /// Hold a break condition on TX
    Break {
        port: String,
        /// Break duration in milliseconds
        #[arg(short, long, default_value_t = 250)]
        ms: u64,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let loader = match args.config {
        Some(ref path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let config = loader.into_config();
    init_logging(&config, args.log_level.as_deref());

    match args.command {
        Command::List => list_ports(),
        Command::Lines { port, json } => show_lines(&config, &port, json),
        Command::Loopback {
            port,
            message,
            baud,
        } => loopback(&config, &port, &message, baud),
        Command::Send {
            port,
            message,
            baud,
            rs485,
        } => send(&config, &port, &message, baud, rs485),
        Command::Break { port, ms } => send_break(&config, &port, Duration::from_millis(ms)),
    }
}

fn init_logging(config: &Config, level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn open(
    config: &Config,
    name: &str,
    baud: Option<u32>,
) -> Result<port::NativePort, Box<dyn Error>> {
    let mut port_config = config.serial.port_config(name);
    if let Some(baud) = baud {
        port_config.baud_rate = baud;
    }
    debug!("Opening {:?}", port_config);
    Ok(port::open(&port_config)?)
}

fn list_ports() -> Result<(), Box<dyn Error>> {
    let ports = serialport::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for p in ports {
        match p.port_type {
            serialport::SerialPortType::UsbPort(usb) => println!(
                "{}\tUSB {:04x}:{:04x} {}",
                p.port_name,
                usb.vid,
                usb.pid,
                usb.product.unwrap_or_default()
            ),
            other => println!("{}\t{:?}", p.port_name, other),
        }
    }
    Ok(())
}

fn show_lines(config: &Config, name: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let port = open(config, name, None)?;
    let (cts, dsr, ring) = (port.cts()?, port.dsr()?, port.ring()?);
    port.close()?;

    if as_json {
        let lines = json!({ "port": port.name(), "cts": cts, "dsr": dsr, "ring": ring });
        println!("{}", serde_json::to_string_pretty(&lines)?);
    } else {
        println!("{}: CTS={} DSR={} RING={}", port.name(), cts, dsr, ring);
    }
    Ok(())
}

fn loopback(
    config: &Config,
    name: &str,
    message: &str,
    baud: Option<u32>,
) -> Result<(), Box<dyn Error>> {
    let port = open(config, name, baud)?;
    let sent = port.write(message.as_bytes())?;

    let mut received = Vec::with_capacity(sent);
    let mut buffer = [0u8; 256];
    while received.len() < sent {
        let n = port.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        received.extend_from_slice(&buffer[..n]);
    }
    port.close()?;

    if received == message.as_bytes() {
        info!("Loopback OK on {} ({} bytes)", name, sent);
        println!("OK: {}", String::from_utf8_lossy(&received));
        Ok(())
    } else {
        Err(format!(
            "loopback mismatch: sent {:?}, received {:?}",
            message,
            String::from_utf8_lossy(&received)
        )
        .into())
    }
}

fn send(
    config: &Config,
    name: &str,
    message: &str,
    baud: Option<u32>,
    rs485: bool,
) -> Result<(), Box<dyn Error>> {
    let port = Arc::new(open(config, name, baud)?);
    let written = if rs485 {
        let mut bus = HalfDuplex::with_line(
            Arc::clone(&port),
            config.rs485.enable_line,
            config.rs485.delay_before(),
            config.rs485.delay_after(),
        )?;
        bus.write(message.as_bytes())?
    } else {
        port.write(message.as_bytes())?
    };
    port.close()?;
    println!("Wrote {} bytes to {}", written, name);
    Ok(())
}

fn send_break(config: &Config, name: &str, hold: Duration) -> Result<(), Box<dyn Error>> {
    let port = open(config, name, None)?;
    port.send_break(true)?;
    thread::sleep(hold);
    let cleared = port.send_break(false);
    port.close()?;
    cleared?;
    println!("Sent {} ms break on {}", hold.as_millis(), name);
    Ok(())
}
