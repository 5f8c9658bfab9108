//! Stage sequencing: raw document bytes + configuration → generated files.
//!
//! One synchronous pass per invocation. Every stage is a pure transform
//! over an immutable snapshot of the previous stage's output, so identical
//! inputs always produce byte-identical files. Any error aborts before the
//! commit step touches the output directory.

use std::path::PathBuf;

use crate::config::GeneratorConfig;
use crate::emit::{self, GeneratedFile};
use crate::error::GenError;
use crate::filter;
use crate::names;
use crate::normalize;
use crate::parse;
use crate::resolve;
use crate::synth;

/// Run everything except the commit. This is the whole deterministic core:
/// parse → resolve → normalize → synthesize → name → filter → render.
pub fn render(config: &GeneratorConfig, bytes: &[u8]) -> Result<Vec<GeneratedFile>, GenError> {
    config.validate_for_check()?;

    let mut doc = parse::parse_document(bytes)?;
    resolve::resolve(&mut doc)?;
    normalize::normalize(&mut doc)?;

    let graph = synth::synthesize(&doc)?;
    let resolved = names::assign(&graph, &config.generator_suffix)?;
    let graph = filter::filter(graph, &config.includes)?;

    emit::render(&graph, &resolved)
}

/// Full run: render, then commit into the configured output directory.
pub fn generate(config: &GeneratorConfig, bytes: &[u8]) -> Result<Vec<PathBuf>, GenError> {
    config.validate()?;
    let files = render(config, bytes)?;
    emit::commit(&files, &config.output_directory)
}
