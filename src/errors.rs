use miette::Diagnostic;
use thiserror::Error;

use crate::authz::{AuthzError, ConnectivityError};

#[derive(Debug, Error, Diagnostic)]
pub enum EmulatorError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(emulator_authz::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(
        code(emulator_authz::config),
        help("Settings come from flags, GCP_EMULATOR__* environment variables, the config file, then defaults")
    )]
    Config(#[from] config::ConfigError),

    #[error("Invalid setting: {0}")]
    #[diagnostic(code(emulator_authz::invalid_setting))]
    InvalidSetting(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Authz(#[from] AuthzError),

    #[error("Authority client error: {0}")]
    #[diagnostic(code(emulator_authz::authority))]
    Authority(#[from] ConnectivityError),

    #[error("Policy file `{path}` has {count} validation error(s)")]
    #[diagnostic(
        code(emulator_authz::policy_invalid),
        help("Fix the errors listed above and run `emulator-authz validate` again")
    )]
    PolicyInvalid { path: String, count: usize },
}
