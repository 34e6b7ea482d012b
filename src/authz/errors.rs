use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::authz::loader::PolicyFormat;

#[derive(Debug, Error, Diagnostic)]
pub enum AuthzError {
    #[error("Failed to read policy file `{path}`")]
    #[diagnostic(
        code(emulator_authz::policy_read),
        help("Check that the file exists and is readable")
    )]
    PolicyRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse policy {format} in `{path}`: {message}")]
    #[diagnostic(
        code(emulator_authz::policy_parse),
        help("Policy files contain `roles`, `groups`, and `projects` maps; unknown extensions are parsed as YAML")
    )]
    Parse {
        path: String,
        format: PolicyFormat,
        message: String,
        /// 1-based line/column reported by the decoder, when it has one
        line: Option<usize>,
        column: Option<usize>,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("Failed to serialize policy as {format}: {message}")]
    #[diagnostic(code(emulator_authz::policy_serialize))]
    Serialize {
        format: PolicyFormat,
        message: String,
    },

    #[error("Failed to write policy file `{path}`")]
    #[diagnostic(
        code(emulator_authz::policy_write),
        help("The target directory must exist and be writable; the previous file is left untouched")
    )]
    PolicyWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid IAM mode `{0}`")]
    #[diagnostic(
        code(emulator_authz::invalid_mode),
        help("Supported modes: off, permissive, strict")
    )]
    InvalidMode(String),
}

impl AuthzError {
    /// Line and column of a parse failure, if the decoder reported one.
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            AuthzError::Parse {
                line: Some(line),
                column: Some(column),
                ..
            } => Some((*line, *column)),
            _ => None,
        }
    }
}
