use std::process::ExitCode;

use jfr_plot::cli;

// Main entry point
fn main() -> ExitCode {
    match cli::handle_calls() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = cli::exit_code_for(&e);
            if code == cli::EXIT_RECOVERABLE {
                eprintln!("{}", e);
            } else {
                eprintln!("Error: {:?}", e);
            }
            ExitCode::from(code)
        }
    }
}
