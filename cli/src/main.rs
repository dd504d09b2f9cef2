use std::process::exit;
use std::time::Instant;

use clap::error::ErrorKind;
use clap::Parser;

use offload_cli::cli::{run, Args};

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => exit(0),
                _ => exit(-1),
            }
        }
    };

    let subscriber = tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::Uptime::from(Instant::now()))
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    if let Err(e) = run(&args) {
        eprintln!("{e}");
        exit(e.exit_code());
    }
}
