//! Shared plumbing for the command-line entry points.

use crate::bus::SharedBus;
use crate::error::{Error, Result};
use crate::pca9685::Pca9685Config;
use clap::Args;
use linux_embedded_hal::I2cdev;
use std::time::Duration;

/// Bus of the 40-pin header on Raspberry Pi class boards.
pub const DEFAULT_BUS_PATH: &str = "/dev/i2c-1";

/// Options selecting the bus and the controller on it.
#[derive(Debug, Clone, Args)]
pub struct BusArgs {
    /// I2C bus device node
    #[arg(long, default_value = DEFAULT_BUS_PATH)]
    pub bus: String,
    /// 7-bit address of the PCA9685 (decimal or 0x-prefixed hex)
    #[arg(long, default_value = "0x40", value_parser = parse_address)]
    pub address: u8,
    /// Give up waiting for the bus lock after this many milliseconds
    #[arg(long)]
    pub lock_timeout_ms: Option<u64>,
}

impl BusArgs {
    /// Opens the selected bus.
    pub fn open(&self) -> Result<SharedBus<I2cdev>> {
        open_bus(&self.bus)
    }

    /// Controller settings matching these options.
    pub fn pca_config(&self) -> Pca9685Config {
        Pca9685Config::default()
            .with_address(self.address)
            .with_lock_timeout(self.lock_timeout_ms.map(Duration::from_millis))
    }
}

/// Parses `64` or `0x40` style 7-bit addresses.
pub fn parse_address(s: &str) -> std::result::Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    let address = parsed.map_err(|e| format!("invalid address '{}': {}", s, e))?;
    if address > 0x7F {
        return Err(format!("address 0x{:02X} is not a 7-bit address", address));
    }
    Ok(address)
}

/// Opens a Linux `/dev/i2c-N` node as a shareable bus.
pub fn open_bus(path: &str) -> Result<SharedBus<I2cdev>> {
    let i2c = I2cdev::new(path).map_err(|e| Error::BusOpen {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    Ok(SharedBus::new(i2c))
}

/// Initialises `env_logger`, `RUST_LOG` still overrides the default filter.
pub fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x40"), Ok(0x40));
        assert_eq!(parse_address("0X7f"), Ok(0x7F));
        assert_eq!(parse_address("65"), Ok(65));
        assert!(parse_address("0x80").is_err());
        assert!(parse_address("forty").is_err());
        assert!(parse_address("300").is_err());
    }
}
