use std::process::ExitCode;

use clap::Parser;
use ground_rag::RagError;
use ground_rag_cli::{Cli, init_tracing, run};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[error] {e:#}");
            if let Some(hint) = e.downcast_ref::<RagError>().and_then(RagError::remediation) {
                eprintln!("  {hint}");
            }
            ExitCode::FAILURE
        }
    }
}
