//! Native module loading.
//!
//! The platform layer is a small trait so the `native` primitive does not
//! care whether it runs over `dlopen`, `LoadLibrary`, or nothing at all.
//! Opened libraries are kept for the life of the loader; function pointers
//! handed out from them stay valid for as long as the VM that owns it.

use crate::error::LoadError;
use crate::native::{NativeFn, NATIVE_ENTRY};
use tracing::{debug, warn};

/// Index of an opened library inside its loader.
pub type LibraryId = usize;

pub trait DynamicLoader {
    /// Open the library at `path`. On failure the reason is available from
    /// [`DynamicLoader::last_error`].
    fn open(&mut self, path: &str) -> Option<LibraryId>;

    /// Resolve `name` in an opened library as a native function.
    fn symbol(&mut self, lib: LibraryId, name: &str) -> Option<NativeFn>;

    /// Description of the most recent failure.
    fn last_error(&self) -> String;

    fn supported(&self) -> bool {
        true
    }
}

/// Open `path` and resolve its entry point.
pub fn load_native(loader: &mut dyn DynamicLoader, path: &str) -> Result<NativeFn, LoadError> {
    if !loader.supported() {
        return Err(LoadError::Unsupported);
    }
    let Some(lib) = loader.open(path) else {
        let reason = loader.last_error();
        warn!(path, %reason, "native module not found");
        return Err(LoadError::NotFound {
            path: path.to_string(),
            reason,
        });
    };
    match loader.symbol(lib, NATIVE_ENTRY) {
        Some(init) => {
            debug!(path, "native module loaded");
            Ok(init)
        }
        None => {
            warn!(path, symbol = NATIVE_ENTRY, "native module has no entry point");
            Err(LoadError::MissingEntry {
                path: path.to_string(),
                symbol: NATIVE_ENTRY.to_string(),
            })
        }
    }
}

#[cfg(any(unix, windows))]
pub use system::SystemLoader;

#[cfg(any(unix, windows))]
pub type PlatformLoader = SystemLoader;

#[cfg(not(any(unix, windows)))]
pub type PlatformLoader = NoDynamicLoader;

#[cfg(any(unix, windows))]
mod system {
    use super::{DynamicLoader, LibraryId};
    use crate::native::NativeFn;
    use libloading::Library;

    /// `libloading`-backed loader. Libraries are never closed.
    #[derive(Default)]
    pub struct SystemLoader {
        libraries: Vec<Library>,
        last_error: Option<String>,
    }

    impl SystemLoader {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DynamicLoader for SystemLoader {
        fn open(&mut self, path: &str) -> Option<LibraryId> {
            // SAFETY: loading a library runs its initialisers. Native modules
            // are trusted code by contract, the same as the host binary.
            match unsafe { Library::new(path) } {
                Ok(lib) => {
                    self.libraries.push(lib);
                    Some(self.libraries.len() - 1)
                }
                Err(e) => {
                    self.last_error = Some(e.to_string());
                    None
                }
            }
        }

        fn symbol(&mut self, lib: LibraryId, name: &str) -> Option<NativeFn> {
            let library = self.libraries.get(lib)?;
            let mut cname = name.as_bytes().to_vec();
            cname.push(0);
            // SAFETY: the entry point must have the NativeFn signature and be
            // built against this crate. The library is kept in `libraries`
            // forever, so the copied function pointer never dangles.
            match unsafe { library.get::<NativeFn>(&cname) } {
                Ok(sym) => Some(*sym),
                Err(e) => {
                    self.last_error = Some(e.to_string());
                    None
                }
            }
        }

        fn last_error(&self) -> String {
            self.last_error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string())
        }
    }
}

/// Loader for targets without dynamic libraries; every load fails.
#[derive(Debug, Default)]
pub struct NoDynamicLoader;

impl DynamicLoader for NoDynamicLoader {
    fn open(&mut self, _path: &str) -> Option<LibraryId> {
        None
    }

    fn symbol(&mut self, _lib: LibraryId, _name: &str) -> Option<NativeFn> {
        None
    }

    fn last_error(&self) -> String {
        "dynamic libraries are not supported on this platform".to_string()
    }

    fn supported(&self) -> bool {
        false
    }
}
