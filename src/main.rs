pub mod cli;
pub mod config;
pub mod document;
pub mod emit;
pub mod error;
pub mod filter;
pub mod names;
pub mod normalize;
pub mod parse;
pub mod pipeline;
pub mod resolve;
pub mod synth;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let command_line_interface = cli::CommandLineInterface::load();
    command_line_interface.run()
}
