use std::process::ExitCode;
use ticktick_cli::cli::{CliApp, INTERRUPTED_EXIT};

fn main() -> ExitCode {
    if let Err(e) = ctrlc::set_handler(|| std::process::exit(INTERRUPTED_EXIT)) {
        eprintln!("Warning: could not install Ctrl-C handler: {e}");
    }
    CliApp::run()
}
