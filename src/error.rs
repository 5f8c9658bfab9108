//! Error taxonomy for the whole pipeline.
//!
//! Every stage returns `Result<_, GenError>`; the first error aborts the run
//! before anything is committed to the output directory. Messages carry the
//! offending schema path or pointer so failures are diagnosable without
//! re-running under a debugger.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenError {
    #[error("invalid configuration: {detail}")]
    Config { detail: String },

    #[error("malformed spec document: {detail}")]
    SpecParse { detail: String },

    #[error("unresolved reference `{pointer}`{}", fmt_chain(.chain))]
    UnresolvedRef { pointer: String, chain: Vec<String> },

    #[error("unsupported schema shape at {path}: {detail}")]
    UnsupportedShape { path: String, detail: String },

    #[error("identifier `{ident}` conflicts: {first} vs {second}")]
    NameCollision {
        ident: String,
        first: String,
        second: String,
    },

    #[error("emission failed: {0}")]
    EmissionIo(#[from] std::io::Error),
}

impl GenError {
    pub fn parse(detail: impl Into<String>) -> Self {
        GenError::SpecParse { detail: detail.into() }
    }

    pub fn shape(path: impl Into<String>, detail: impl Into<String>) -> Self {
        GenError::UnsupportedShape { path: path.into(), detail: detail.into() }
    }
}

fn fmt_chain(chain: &[String]) -> String {
    if chain.is_empty() {
        String::new()
    } else {
        format!(" via {}", chain.join(" -> "))
    }
}
