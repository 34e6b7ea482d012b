use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::authz::IamMode;
use crate::errors::EmulatorError;

/// Fully resolved process configuration. Built once at startup and passed
/// explicitly to whatever needs it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub iam_mode: IamMode,
    /// Verbose (debug) logging
    #[serde(default)]
    pub trace: bool,
    pub policy_file: PathBuf,
    pub authority: Authority,
    pub server: Server,
    pub ports: Ports,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authority {
    /// Base URL of the IAM emulator, e.g. http://localhost:8080
    pub url: String,
    /// Deadline for a single permission check
    pub timeout_ms: u64,
}

/// Bind address of the check sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

/// Port wiring of the emulator stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ports {
    pub iam: u16,
    pub secret_manager: u16,
    pub kms: u16,
}

impl Default for Authority {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            timeout_ms: 5000,
        }
    }
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}

impl Default for Ports {
    fn default() -> Self {
        Self {
            iam: 8080,
            secret_manager: 9090,
            kms: 9091,
        }
    }
}

pub const ENV_PREFIX: &str = "GCP_EMULATOR";
const DEFAULT_POLICY_FILE: &str = "./policy.yaml";

impl Settings {
    /// Resolve settings from defaults, the optional file at `path`, and
    /// `GCP_EMULATOR__*` environment variables (later sources win).
    pub fn load(path: &str) -> Result<Self, EmulatorError> {
        let authority = Authority::default();
        let server = Server::default();
        let ports = Ports::default();

        let mut builder = config::Config::builder()
            .set_default("iam_mode", IamMode::default().to_string())?
            .set_default("trace", false)?
            .set_default("policy_file", DEFAULT_POLICY_FILE)?
            .set_default("authority.url", authority.url)?
            .set_default("authority.timeout_ms", authority.timeout_ms)?
            .set_default("server.host", server.host)?
            .set_default("server.port", server.port)?
            .set_default("ports.iam", ports.iam)?
            .set_default("ports.secret_manager", ports.secret_manager)?
            .set_default("ports.kms", ports.kms)?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: GCP_EMULATOR__IAM_MODE=strict, GCP_EMULATOR__SERVER__PORT=9999
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

        let cfg = builder.build()?;

        // Reject unknown modes with a dedicated error before serde sees them
        cfg.get_string("iam_mode")?.parse::<IamMode>()?;

        let settings: Settings = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), EmulatorError> {
        for (name, port) in [
            ("server.port", self.server.port),
            ("ports.iam", self.ports.iam),
            ("ports.secret_manager", self.ports.secret_manager),
            ("ports.kms", self.ports.kms),
        ] {
            if port == 0 {
                return Err(EmulatorError::InvalidSetting(format!(
                    "{name} must be between 1 and 65535"
                )));
            }
        }
        if self.authority.timeout_ms == 0 {
            return Err(EmulatorError::InvalidSetting(
                "authority.timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn authority_timeout(&self) -> Duration {
        Duration::from_millis(self.authority.timeout_ms)
    }

    /// Human-readable summary for the `config` command.
    pub fn display(&self, config_file: &str) -> String {
        let source = if Path::new(config_file).exists() {
            config_file
        } else {
            "(not found)"
        };
        format!(
            "Configuration:
  iam_mode:           {}
  trace:              {}
  policy_file:        {}

Authority:
  url:                {}
  timeout_ms:         {}

Check server:         {}:{}

Ports:
  IAM:                {}
  Secret Manager:     {}
  KMS:                {}

Sources:
  Config file:        {}
  Environment:        {}__*
  Flags:              --mode, --policy
",
            self.iam_mode,
            self.trace,
            self.policy_file.display(),
            self.authority.url,
            self.authority.timeout_ms,
            self.server.host,
            self.server.port,
            self.ports.iam,
            self.ports.secret_manager,
            self.ports.kms,
            source,
            ENV_PREFIX,
        )
    }
}
