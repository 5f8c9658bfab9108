//! Minimal CLI: generate models from a spec document, or dry-check it.
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use crate::config::{GeneratorConfig, SpecSource};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate strongly-typed data-binding models from an OpenAPI-style spec
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run the full pipeline and commit files to the output directory
    Generate(GenerateArgs),
    /// run everything except the commit and report what would be emitted
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone)]
struct SpecSettings {
    /// configuration file (JSON or YAML); individual flags are ignored
    /// when this is set
    #[arg(long)]
    config: Option<PathBuf>,

    /// local spec document (JSON or YAML)
    #[arg(long)]
    spec: Option<PathBuf>,

    /// remote spec source; fetching is done by the build integration, not
    /// by this tool, so a local file is required to actually run
    #[arg(long)]
    spec_url: Option<String>,

    /// suffix appended to every generated type name (e.g. `Model`)
    #[arg(long, default_value = "")]
    suffix: String,

    /// root schema names to keep (plus transitive dependencies);
    /// empty means everything
    #[arg(long, num_args = 1..)]
    include: Vec<String>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    spec_settings: SpecSettings,

    /// output directory for the committed files (overrides the config file)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    spec_settings: SpecSettings,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SpecSettings {
    fn config(&self, out: Option<PathBuf>) -> anyhow::Result<GeneratorConfig> {
        let mut config = match self.config.as_deref() {
            Some(path) => GeneratorConfig::from_file(path)?,
            None => GeneratorConfig {
                output_directory: PathBuf::new(),
                api_spec_file: self.spec.clone(),
                api_spec_download_url: self.spec_url.clone(),
                generator_suffix: self.suffix.clone(),
                includes: self.include.clone(),
            },
        };
        if let Some(out) = out {
            config.output_directory = out;
        }
        Ok(config)
    }

    fn load_bytes(&self, config: &GeneratorConfig) -> anyhow::Result<Vec<u8>> {
        match config.spec_source()? {
            SpecSource::File(path) => std::fs::read(path)
                .with_context(|| format!("failed to read spec file {}", path.display())),
            SpecSource::Download(url) => anyhow::bail!(
                "spec download ({url}) is handled by the build integration; pass --spec with a local file"
            ),
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Generate(target) => {
                let config = target.spec_settings.config(target.out.clone())?;
                config.validate()?;
                let bytes = target.spec_settings.load_bytes(&config)?;
                let written = crate::pipeline::generate(&config, &bytes)?;
                println!(
                    "wrote {} files to {}",
                    written.len(),
                    config.output_directory.display()
                );
                Ok(())
            }
            Command::Check(target) => {
                let config = target.spec_settings.config(None)?;
                config.validate_for_check()?;
                let bytes = target.spec_settings.load_bytes(&config)?;
                let files = crate::pipeline::render(&config, &bytes)?;
                for file in &files {
                    println!("{}  ({})", file.file_name, file.ident);
                }
                println!("{} files would be emitted", files.len());
                Ok(())
            }
        }
    }
}
