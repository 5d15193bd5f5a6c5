use clap::Parser;
use std::process::ExitCode;

use kodegen_keychain::{
    ActionsReporter, JobInputs, KeychainManager, SecurityCli, error, output, run_job, success,
};

// ============================================================================
// ERROR HANDLING STRATEGY
// ============================================================================
//
// Every failure, from input validation to a rejected `security` command,
// ends up here and is printed once as a single error line, exit code 1.
// Cleanup of the keychain and certificate files happens inside `run_job`
// before the error reaches this point.
// ============================================================================

#[derive(Parser)]
#[command(name = "kodegen_keychain")]
#[command(version, about = "Create a temporary keychain and import code-signing certificates")]
struct Cli {
    #[command(flatten)]
    inputs: JobInputs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", failure_line(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.inputs.load().await?;
    output::set_debug(config.debug);

    let manager = KeychainManager::new(
        SecurityCli::new(config.security_program.clone()),
        ActionsReporter::from_env(),
    );

    let outcome = run_job(&manager, &config, std::env::consts::OS).await?;
    success!(
        "Provisioned keychain {} with {} certificate(s)",
        outcome.keychain,
        outcome.imported
    );
    Ok(())
}

/// The single line reported for a failed run.
///
/// `KeychainError` messages already embed their source, so the plain
/// Display is used rather than anyhow's chained form.
fn failure_line(e: &anyhow::Error) -> String {
    e.to_string()
}
