use memory::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("stack overflow")]
    StackOverflow,
    #[error("invalid opcode {0}")]
    InvalidOpcode(u8),
    #[error("invalid operand: {0}")]
    InvalidOperand(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("type error: {0}")]
    TypeMismatch(String),
    #[error("arity mismatch: {0}")]
    ArityMismatch(String),
    #[error("out of range: {0}")]
    OutOfRange(String),
    #[error("index out of bounds: {0}")]
    OutOfBounds(String),
    #[error(transparent)]
    Load(#[from] LoadError),
    /// Value passed to `error`, carried unchanged to whoever catches it.
    #[error("error raised")]
    Raised(Value),
    #[error("signal escaped to the host")]
    UnhandledSignal,
    #[error("fiber error: {0}")]
    Fiber(String),
    #[error("{0}")]
    Unknown(String),
}

/// Failures of the `native` primitive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("could not open native module {path}: {reason}")]
    NotFound { path: String, reason: String },
    #[error("native module {path} has no entry point {symbol}")]
    MissingEntry { path: String, symbol: String },
    #[error("native modules are not supported on this platform")]
    Unsupported,
}

/// Fatal failures while building the root environment.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("auxiliary library `{name}` failed to load: {source}")]
    Library {
        name: &'static str,
        #[source]
        source: RuntimeError,
    },
    #[error("bootstrap program `{name}` failed: {source}")]
    Bootstrap {
        name: String,
        #[source]
        source: RuntimeError,
    },
}
