//! aoproto - message inspection tool
//!
//! Lists the known messages, prints the encoding of a default message, and
//! decodes captured hex into a value tree.
//!
//! ```text
//! aoproto [--config <file>] list
//! aoproto [--config <file>] sample <Message>
//! aoproto [--config <file>] decode <Message> <hex>
//! ```

use anyhow::{Context, Result};
use aoproto_codec::hex::from_hex;
use aoproto_codec::CodecResolver;
use aoproto_config::CodecConfig;
use aoproto_messages::{message_by_name, message_names, MessageEntry};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Anarchy Online message inspector
#[derive(Parser, Debug)]
#[command(name = "aoproto")]
#[command(about = "Encode and decode Anarchy Online protocol messages")]
#[command(version)]
struct Args {
    /// Codec options file (key = value)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// List the known message types
    List,

    /// Encode a default message and print it as hex
    Sample {
        /// Message type name
        message: String,
    },

    /// Decode captured hex into a value tree
    Decode {
        /// Message type name
        message: String,

        /// Hex bytes, spaces allowed
        #[arg(required = true, num_args = 1..)]
        hex: Vec<String>,
    },
}

fn lookup(name: &str) -> Result<&'static MessageEntry> {
    message_by_name(name).with_context(|| format!("unknown message '{}' (try `aoproto list`)", name))
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => CodecConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => CodecConfig::default(),
    };
    config.display();
    let resolver = CodecResolver::with_config(config);

    match args.command {
        Commands::List => {
            for name in message_names() {
                println!("{}", name);
            }
        }
        Commands::Sample { message } => {
            let entry = lookup(&message)?;
            let bytes = resolver.encode_value(&entry.type_desc(), &entry.sample())?;
            info!("{} encodes to {} bytes", entry.name, bytes.len());
            println!("{}", hex::encode(&bytes));
        }
        Commands::Decode { message, hex: text } => {
            let entry = lookup(&message)?;
            let data = from_hex(&text.concat())?;
            debug!("Decoding {} bytes as {}", data.len(), entry.name);
            let value = resolver.decode_value(&entry.type_desc(), &data)?;
            println!("{:#?}", value);
        }
    }

    debug!("{} codecs built", resolver.build_count());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    run(Args::parse())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("aoproto").chain(list.iter().copied()))
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(args(&["list"]).unwrap().command, Commands::List);
        assert_eq!(
            args(&["sample", "StatMessage"]).unwrap().command,
            Commands::Sample {
                message: "StatMessage".into()
            }
        );
        assert_eq!(
            args(&["decode", "StatMessage", "00 01", "02"]).unwrap().command,
            Commands::Decode {
                message: "StatMessage".into(),
                hex: vec!["00 01".into(), "02".into()],
            }
        );
    }

    #[test]
    fn test_parse_config_flag() {
        let parsed = args(&["--config", "codec.txt", "list"]).unwrap();
        assert_eq!(parsed.config.as_deref(), Some("codec.txt"));
        assert!(args(&["list", "--config"]).is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(args(&[]).is_err());
        assert!(args(&["decode", "StatMessage"]).is_err());
        assert!(args(&["frobnicate"]).is_err());
    }

    #[test]
    fn test_sample_then_decode() {
        let resolver = CodecResolver::new();
        let entry = lookup("ZoneInfoMessage").unwrap();
        let bytes = resolver.encode_value(&entry.type_desc(), &entry.sample()).unwrap();
        let data = from_hex(&hex::encode(&bytes)).unwrap();
        let value = resolver.decode_value(&entry.type_desc(), &data).unwrap();
        assert_eq!(value, entry.sample());
        assert!(lookup("Nope").is_err());
    }
}
