use std::fs;
use std::path::{Path, PathBuf};

use jre_config::DiagnosticsConfig;

use crate::error::{ProvisionError, Result};

/// Directory, relative to the application, holding buildpack diagnostics.
pub const DIAGNOSTICS_DIRECTORY: &str = ".buildpack-diagnostics";

pub const KILLJAVA_FILE_NAME: &str = "killjava.sh";

/// Token in the killjava template replaced by the diagnostics log file name.
pub const LOG_FILE_NAME_PLACEHOLDER: &str = "@@LOG_FILE_NAME@@";

/// The bundled out-of-memory recovery script template.
pub const KILLJAVA_TEMPLATE: &str = include_str!("../resources/killjava.sh");

pub fn diagnostics_directory(app_dir: &Path) -> PathBuf {
    app_dir.join(DIAGNOSTICS_DIRECTORY)
}

/// Path of the recovery script as the JVM sees it from the application directory.
pub fn killjava_relative_path() -> String {
    format!("./{DIAGNOSTICS_DIRECTORY}/{KILLJAVA_FILE_NAME}")
}

/// Writes `killjava.sh` into the diagnostics directory of `app_dir`,
/// replacing any previous copy, and marks it executable.
pub fn install_killjava(app_dir: &Path, config: &DiagnosticsConfig) -> Result<PathBuf> {
    let template = match &config.killjava_template {
        Some(path) => fs::read_to_string(path).map_err(|source| ProvisionError::Template {
            path: path.clone(),
            source,
        })?,
        None => KILLJAVA_TEMPLATE.to_owned(),
    };
    let script = template.replace(LOG_FILE_NAME_PLACEHOLDER, &config.log_file_name);

    let dir = diagnostics_directory(app_dir);
    fs::create_dir_all(&dir).map_err(ProvisionError::filesystem(&dir))?;

    let path = dir.join(KILLJAVA_FILE_NAME);
    fs::write(&path, script).map_err(ProvisionError::filesystem(&path))?;
    set_executable(&path)?;

    tracing::debug!(
        target: "jre.provision",
        path = %path.display(),
        log_file_name = %config.log_file_name,
        "installed killjava script"
    );
    Ok(path)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt as _;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(ProvisionError::filesystem(path))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
