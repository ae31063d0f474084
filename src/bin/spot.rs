use clap::Parser;
use log::debug;
use pca9685_servo::cli::init_logging;

/// Spot Micro servo controller
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Enable debug mode
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);
    debug!("Parsed arguments: {:?}", cli);

    if cli.debug {
        println!("Debug mode enabled");
    } else {
        println!("Debug mode disabled");
    }
}
