use serde::Deserialize;

/// Tunables for a [`VM`](crate::VM) instance.
///
/// Every field has a default, so a TOML document only needs the keys it
/// overrides:
///
/// ```toml
/// gc_interval = 1048576
/// stress_gc = false
/// max_call_depth = 1024
/// max_fiber_depth = 64
/// max_sequence_len = 16777216
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VmConfig {
    /// Bytes allocated between two automatic collections.
    pub gc_interval: usize,
    /// Collect at every instruction boundary.
    pub stress_gc: bool,
    /// Maximum call frames on one fiber.
    pub max_call_depth: usize,
    /// Maximum nesting of `resume`.
    pub max_fiber_depth: usize,
    /// Largest length `put` may grow an array or buffer to.
    pub max_sequence_len: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            gc_interval: memory::heap::DEFAULT_GC_INTERVAL,
            stress_gc: false,
            max_call_depth: 1024,
            max_fiber_depth: 64,
            max_sequence_len: 0x0100_0000,
        }
    }
}

impl VmConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}
