use tracing::warn;
use vm::{Environment, RuntimeError, SourceRunner, VM};

/// Stand-in for the compiler. The boot program is skipped, so only the
/// native and assembled primitives end up bound.
#[derive(Debug, Default)]
pub struct DeferredRunner {
    pub skipped: Vec<String>,
}

impl SourceRunner for DeferredRunner {
    fn run(
        &mut self,
        _vm: &mut VM,
        _env: &Environment,
        source: &[u8],
        name: &str,
    ) -> Result<(), RuntimeError> {
        warn!(program = name, bytes = source.len(), "no compiler linked, skipping");
        self.skipped.push(name.to_string());
        Ok(())
    }
}
