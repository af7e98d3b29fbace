mod cli;
mod hub;

use std::process::ExitCode;

use owo_colors::OwoColorize;

use crate::cli::error::AnkrError;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("{} {e}", "Error:".red());
    }

    match cli::run(std::env::args_os()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            match report.downcast_ref::<AnkrError>() {
                Some(e) => eprintln!("{} {e}", "Error:".red()),
                None => eprintln!("{} {report:?}", "Error:".red()),
            }
            ExitCode::from(255)
        }
    }
}
