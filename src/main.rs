use clap::Parser as _;
use tracing_subscriber::filter::{LevelFilter, targets::Targets};
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};
use vfd_modbus_decode::commands;

#[derive(clap::Parser)]
#[clap(version, about, author)]
enum Commands {
    Registers(commands::registers::Args),
    Decode(commands::decode::Args),
    Checksum(commands::checksum::Args),
}

fn end<E: std::error::Error>(r: Result<(), E>) {
    std::process::exit(match r {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            let mut cause = e.source();
            while let Some(e) = cause {
                eprintln!("  because: {e}");
                cause = e.source();
            }
            1
        }
    });
}

fn main() {
    let filter = match std::env::var("VFD_MODBUS_DECODE_LOG") {
        Err(_) => Targets::new().with_default(LevelFilter::WARN),
        Ok(description) => match description.parse::<Targets>() {
            Ok(filter) => filter,
            Err(e) => {
                eprintln!("error: VFD_MODBUS_DECODE_LOG is not a valid log filter");
                eprintln!("  because: {e}");
                std::process::exit(2);
            }
        },
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    match Commands::parse() {
        Commands::Registers(args) => end(commands::registers::run(args)),
        Commands::Decode(args) => end(commands::decode::run(args)),
        Commands::Checksum(args) => end(commands::checksum::run(args)),
    }
}
