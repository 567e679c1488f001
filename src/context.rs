use std::env;
use std::path::PathBuf;

/// Relaxes device-code acceptance to any well-formed token when set to "1".
pub const ENV_UNKNOWN_DEVCODES: &str = "KT_WITH_UNKNOWN_DEVCODES";
/// Names a sidecar file receiving the description of a converted package.
pub const ENV_METADATA_DUMP: &str = "KT_PKG_METADATA_DUMP";

/// Runtime settings, read once at startup and passed explicitly into the
/// assembly and disassembly pipelines.
#[derive(Debug, Clone)]
pub struct Context {
    pub accept_unknown_devcodes: bool,
    pub metadata_dump: Option<PathBuf>,
    pub tempdir: PathBuf,
}

impl Context {
    pub fn from_env() -> Self {
        Self {
            accept_unknown_devcodes: env::var(ENV_UNKNOWN_DEVCODES).map(|v| v == "1").unwrap_or(false),
            metadata_dump: env::var_os(ENV_METADATA_DUMP).map(PathBuf::from),
            tempdir: env::temp_dir(),
        }
    }
}
