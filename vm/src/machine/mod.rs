//! Machine module - VM implementation
//!
//! The register executor is split into one trait per concern, each
//! implemented on [`VM`]: arithmetic, data access, calls, fibers, the
//! collector hooks and native registration.

mod arithmetic;
mod control;
mod data;
mod fiber;
mod format;
mod gc;
mod native;
mod promotion;
mod stack;
mod vm;

// Public API
pub use arithmetic::ArithmeticOps;
pub use control::ControlFlowOps;
pub use data::DataOps;
pub use fiber::{FiberOps, SIGNAL_DEBUG, SIGNAL_ERROR, SIGNAL_YIELD};
pub use gc::GarbageCollector;
pub use memory::Frame as CallFrame;
pub use native::NativeRegistry;
pub use stack::StackOps;
pub use vm::{Signal, VM};
