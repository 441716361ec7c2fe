pub mod assembler;
pub mod boot;
pub mod config;
pub mod env;
pub mod error;
pub mod loader;
pub mod machine;
pub mod native;
pub mod opcode;
pub mod scan;
pub mod specs;
pub mod stdlib;
pub mod templates;

pub use assembler::quick_asm;
pub use boot::{core_env, SourceRunner, BOOT_NAME, BOOT_SOURCE, VERSION};
pub use config::VmConfig;
pub use env::{Binding, Environment};
pub use error::{BootstrapError, LoadError, RuntimeError};
pub use loader::{DynamicLoader, NoDynamicLoader, PlatformLoader};
pub use machine::{CallFrame, Signal, VM};
pub use native::{NativeFn, NativeObj, NATIVE_ENTRY};
pub use opcode::OpCode;
pub use stdlib::{default_libraries, Library};
