use clap::Parser;
use helm_iac::{
    cli::Cli,
    config::{self, HelmConfig},
    run_command,
};
use std::process;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> helm_iac::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    cli.init_logging();

    // Load configuration
    let config: HelmConfig = match cli.config.as_deref() {
        Some(path) => config::load_config_file(path)?,
        None => {
            let cwd = std::env::current_dir()?;
            config::load_config(Some(&cwd))?
        }
    };

    let output = run_command(cli.command, &config)?;
    if !cli.quiet {
        println!("{}", output);
    }
    Ok(())
}
