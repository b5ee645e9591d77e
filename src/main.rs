//! # Tokenprint CLI
//!
//! Command-line interface for printing queue-token receipts.
//!
//! ## Usage
//!
//! ```bash
//! # Print a token over the default RFCOMM device
//! tokenprint print --customer 12345 --service "Eye Examination"
//!
//! # Print through a specific device, smaller chunks
//! tokenprint print --customer 12345 --device /dev/rfcomm1 --chunk-size 256
//!
//! # Write the command stream to a file instead of printing
//! tokenprint encode --customer 12345 --out token.bin
//!
//! # Save the QR code as PNG (what the printer will print)
//! tokenprint qr --customer 12345 --png token.png
//! ```
//!
//! Set `RUST_LOG=debug` to see every chunk write.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tokenprint::{
    TokenprintError,
    config::AppConfig,
    qr::render_qr,
    raster::rasterize,
    receipt::{ReceiptFields, token_receipt},
    transport::{LinkProvider, PrinterConnection, RfcommLink, SendOptions, send_with},
};

/// Tokenprint - queue-token receipt printer
#[derive(Parser, Debug)]
#[command(name = "tokenprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct TokenArgs {
    /// Customer id (also the QR payload)
    #[arg(long)]
    customer: String,

    /// Service the token is for
    #[arg(long, default_value = "Eye Examination")]
    service: String,

    /// JSON config file (layout, link, chunk size, ...)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Luma threshold for the QR image (0-255)
    #[arg(long)]
    threshold: Option<u8>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a token receipt
    Print {
        #[command(flatten)]
        token: TokenArgs,

        /// RFCOMM device path
        #[arg(long, conflicts_with_all = ["mac", "ble"])]
        device: Option<String>,

        /// Bluetooth MAC of a printer bound to an RFCOMM device
        #[arg(long, conflicts_with = "ble")]
        mac: Option<String>,

        /// Use Bluetooth LE, picking the first device whose name contains this
        #[arg(long, value_name = "NAME")]
        ble: Option<String>,

        /// Bytes per link write
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Encode a token receipt to a file
    Encode {
        #[command(flatten)]
        token: TokenArgs,

        /// Output file for the raw command stream
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },

    /// Save the token's QR code, as it will print, to a PNG file
    Qr {
        #[command(flatten)]
        token: TokenArgs,

        #[arg(long, value_name = "FILE")]
        png: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), TokenprintError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Print {
            token,
            device,
            mac,
            ble,
            chunk_size,
        } => {
            let mut config = load_config(&token)?;
            if let Some(chunk_size) = chunk_size {
                config.chunk_size = chunk_size;
            }
            if device.is_some() || mac.is_some() || ble.is_some() {
                config.link.device = device;
                config.link.mac = mac;
                config.link.ble_name = ble;
            }

            let fields = ReceiptFields::capture(&token.customer, &token.service);
            let stream = token_receipt(
                &fields,
                &config.layout,
                &config.qr_options(),
                config.threshold,
            )?;

            println!(
                "Printing token {} ({} bytes)...",
                fields.customer_id,
                stream.len()
            );
            deliver_to_configured_link(&config, stream.as_bytes()).await?;
            println!("Printed successfully!");
        }

        Commands::Encode { token, out } => {
            let config = load_config(&token)?;
            let fields = ReceiptFields::capture(&token.customer, &token.service);
            let stream = token_receipt(
                &fields,
                &config.layout,
                &config.qr_options(),
                config.threshold,
            )?;
            std::fs::write(&out, stream.as_bytes())?;
            println!("Wrote {} bytes to {}", stream.len(), out.display());
        }

        Commands::Qr { token, png } => {
            let config = load_config(&token)?;
            let bitmap = render_qr(&token.customer, &config.qr_options())?;
            let packed = rasterize(&bitmap, config.threshold)?;
            packed.to_gray_image().save(&png)?;
            println!("Saved to {}", png.display());
        }
    }

    Ok(())
}

fn load_config(token: &TokenArgs) -> Result<AppConfig, TokenprintError> {
    let mut config = match &token.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(threshold) = token.threshold {
        config.threshold = threshold;
    }
    Ok(config)
}

async fn deliver_to_configured_link(config: &AppConfig, data: &[u8]) -> Result<(), TokenprintError> {
    let link = &config.link;

    if let (None, None, Some(name)) = (&link.device, &link.mac, &link.ble_name) {
        return deliver_ble(name, data, config.send_options()).await;
    }

    let rfcomm = match (&link.device, &link.mac) {
        (Some(device), _) => RfcommLink::device(device),
        (None, Some(mac)) => RfcommLink::mac(mac),
        (None, None) => RfcommLink::default(),
    }
    .with_chunk_delay(Duration::from_millis(link.chunk_delay_ms));

    deliver(&rfcomm, data, config.send_options()).await
}

#[cfg(feature = "ble")]
async fn deliver_ble(name: &str, data: &[u8], options: SendOptions) -> Result<(), TokenprintError> {
    let filter = (!name.is_empty()).then(|| name.to_string());
    deliver(&tokenprint::transport::ble::BleLink::new(filter), data, options).await
}

#[cfg(not(feature = "ble"))]
async fn deliver_ble(_name: &str, _data: &[u8], _options: SendOptions) -> Result<(), TokenprintError> {
    Err(TokenprintError::Io(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "built without BLE support (enable the `ble` feature)",
    )))
}

async fn deliver<P: LinkProvider>(
    link: &P,
    data: &[u8],
    options: SendOptions,
) -> Result<(), TokenprintError> {
    let mut connection = PrinterConnection::new();
    let result = send_with(&mut connection, link, data, options).await;
    connection.disconnect(link).await;
    Ok(result?)
}
