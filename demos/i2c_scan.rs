use pca9685_servo::cli::{open_bus, DEFAULT_BUS_PATH};
use pca9685_servo::{scan_with_progress, Result};

fn main() -> Result<()> {
    env_logger::init();
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_BUS_PATH.to_string());
    println!("Opening I2C bus {}...", path);
    let bus = match open_bus(&path) {
        Ok(bus) => bus,
        Err(e) => {
            eprintln!("Error opening bus: {}", e);
            eprintln!("Ensure I2C is enabled and the user may access {} (e.g., i2c group).", path);
            return Err(e);
        }
    };

    println!("Scanning I2C bus (7-bit addresses 0x08 to 0x77)...");
    let found_devices = scan_with_progress(&bus, 0x08, 0x77, |addr, found, _, _| {
        if found {
            println!("Device found at 7-bit 0x{:02X}", addr);
        }
    })?;

    if found_devices.is_empty() {
        println!("No I2C devices found.");
    } else {
        println!(
            "Scan complete. Found 7-bit addresses: {:?}",
            found_devices
                .iter()
                .map(|a| format!("0x{:02X}", a))
                .collect::<Vec<_>>()
        );
    }

    Ok(())
}
