use anyhow::{bail, Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use std::{ops::Deref, panic, path::PathBuf};

use rectmon_lib::protocol::{self, TelemetryFrame};
use rectmon_lib::telemetry::project;

mod commandline;
mod monitor;

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown>", 0, 0));
        let cause = panic_info
            .payload()
            .downcast_ref::<String>()
            .map(String::deref);
        let cause = cause.unwrap_or_else(|| {
            panic_info
                .payload()
                .downcast_ref::<&str>()
                .copied()
                .unwrap_or("<cause unknown>")
        });

        error!(
            "Thread '{}' panicked at {}:{}:{}: {}",
            std::thread::current().name().unwrap_or("<unknown>"),
            filename,
            line,
            column,
            cause
        );
    }));
    log_handle
}

fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.len() % 2 != 0 {
        bail!("Hex string has odd length ({})", cleaned.len());
    }
    (0..cleaned.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&cleaned[i..i + 2], 16)
                .with_context(|| format!("Invalid hex byte at offset {i}"))
        })
        .collect()
}

fn load_frame(file: Option<&PathBuf>, hex: Option<&str>) -> Result<Vec<u8>> {
    match (file, hex) {
        (Some(path), None) => std::fs::read(path)
            .with_context(|| format!("Cannot read frame from '{}'", path.display())),
        (None, Some(hex)) => parse_hex(hex),
        _ => bail!("Give either a frame file or --hex, not both or neither"),
    }
}

fn decode_frame(raw: &[u8]) -> Result<TelemetryFrame> {
    let frame = TelemetryFrame::decode(raw).with_context(|| "Cannot decode frame")?;
    if !frame.checksum_valid {
        warn!("Frame decoded with invalid checksum; values may be corrupted");
    }
    Ok(frame)
}

fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter());

    match args.command {
        commandline::CliCommands::Decode { file, hex, json } => {
            let raw = load_frame(file.as_ref(), hex.as_deref())?;
            let frame = decode_frame(&raw)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&frame)
                        .with_context(|| "Cannot serialize frame")?
                );
            } else {
                println!("Header: {:?}", frame.header_text());
                println!("Active modules: {}", frame.active_module_bits());
                println!("Checksum valid: {}", frame.checksum_valid);
                println!("{frame:#?}");
            }
        }
        commandline::CliCommands::Summary { file, hex, json } => {
            let raw = load_frame(file.as_ref(), hex.as_deref())?;
            let summary = project(&decode_frame(&raw)?);
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&summary)
                        .with_context(|| "Cannot serialize summary")?
                );
            } else {
                println!("{summary:#?}");
            }
        }
        commandline::CliCommands::Checksum { hex } => {
            let data = parse_hex(&hex)?;
            println!("{:04X}", protocol::crc16(&data));
        }
        commandline::CliCommands::Monitor {
            interval,
            poll,
            cycles,
        } => monitor::run(interval, poll, cycles)?,
    }

    Ok(())
}
