pub mod args;
pub mod commands;
pub mod logging;
pub mod runner;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use vm::{core_env, default_libraries, Environment, VmConfig, VM};

use runner::DeferredRunner;

/// Read a VM configuration file, or the defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<VmConfig> {
    let Some(path) = path else {
        return Ok(VmConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    VmConfig::from_toml_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

/// Build a VM and its root environment with the default libraries.
pub fn boot(config: VmConfig) -> Result<(VM, Environment)> {
    let mut vm = VM::with_config(config);
    let env = core_env(&mut vm, &default_libraries(), &mut DeferredRunner::default())
        .context("Failed to build the root environment")?;
    Ok((vm, env))
}
