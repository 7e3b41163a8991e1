use botctl::adapter::inbound::cli::{self, command::Cli, output};
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    output::configure(output::OutputConfig::new(cli.json, cli.quiet, cli.verbose));

    let code = cli::dispatch(&cli).await;
    std::process::exit(code);
}
