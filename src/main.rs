use std::env;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("menagerie=info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    ExitCode::from(menagerie::cli::run_with_args(&args) as u8)
}
