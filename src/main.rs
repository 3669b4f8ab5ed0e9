//! Herd - livestock lifecycle and location history

use std::process::ExitCode;

fn main() -> ExitCode {
    match herd::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(herd::cli::exit_status(&e))
        }
    }
}
