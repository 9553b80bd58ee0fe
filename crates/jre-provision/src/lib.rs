//! IBM JRE provisioning for the platform buildpack.
//!
//! Staging drives one [`IbmJdk`] per application through three phases:
//!
//! 1. [`IbmJdk::detect`] names the selected runtime (`ibmjdk-<version>`),
//! 2. [`IbmJdk::compile`] expands it into `<app>/.java` and installs the
//!    out-of-memory recovery script,
//! 3. [`IbmJdk::release`] appends the launch options, sized from the
//!    platform memory budget by [`memory_opts`].
//!
//! [`provision`] runs all three with the production collaborators.

mod diagnostics;
mod error;
mod heuristics;
mod ibm_jdk;

pub use diagnostics::{
    diagnostics_directory, install_killjava, killjava_relative_path, DIAGNOSTICS_DIRECTORY,
    KILLJAVA_FILE_NAME, KILLJAVA_TEMPLATE, LOG_FILE_NAME_PLACEHOLDER,
};
pub use error::{ProvisionError, Result};
pub use heuristics::{
    memory_opts, COMPRESSED_REFERENCES_THRESHOLD, HEAP_SIZE_RATIO, NO_COMPRESSED_REFERENCES,
    TUNE_VIRTUALIZED,
};
pub use ibm_jdk::{
    oom_dump_option, Collaborators, Compiled, IbmJdk, ProvisionContext, FAMILY, JAVA_HOME,
};

/// Stages an IBM JRE into `context.app_dir`, returning the detected runtime id.
///
/// Does not install a tracing subscriber; the host process does that, usually
/// with [`jre_config::init_tracing`] and `context.configuration.logging`.
pub fn provision(context: &mut ProvisionContext) -> Result<String> {
    let collaborators = Collaborators::from_config(&context.configuration)?;
    let mut jdk = IbmJdk::new(context, collaborators)?;
    let id = jdk.detect();
    tracing::info!(target: "jre.provision", runtime = %id, "staging");

    let compiled = jdk.compile()?;
    jdk.release(compiled)?;
    Ok(id)
}
