//! The `Bridge` handle
//!
//! A `Bridge` is a cheap, cloneable handle to one native engine. Execution
//! lives in `execute`, the round-trip codec in `codec`.

use crate::error::{BridgeError, BridgeResult};
use crate::ffi::library::NativeLibrary;
use crate::ffi::loader::LibraryLoader;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// State shared by every clone of a bridge and by its pending calls
pub(crate) struct BridgeShared {
    pub(crate) library: NativeLibrary,
    pub(crate) in_flight: AtomicUsize,
}

impl BridgeShared {
    pub(crate) fn new(library: NativeLibrary) -> Self {
        Self {
            library,
            in_flight: AtomicUsize::new(0),
        }
    }
}

/// Handle to a native engine
#[derive(Clone)]
pub struct Bridge {
    pub(crate) shared: Arc<BridgeShared>,
}

static GLOBAL: OnceLock<Bridge> = OnceLock::new();

impl Bridge {
    pub fn new(library: NativeLibrary) -> Self {
        Self {
            shared: Arc::new(BridgeShared::new(library)),
        }
    }

    /// Load an engine library by name or path with the default search paths
    pub fn load(name: &str, config: Option<&str>) -> BridgeResult<Self> {
        Self::load_with(&LibraryLoader::new(), name, config)
    }

    pub fn load_with(
        loader: &LibraryLoader,
        name: &str,
        config: Option<&str>,
    ) -> BridgeResult<Self> {
        let library = loader.load(name, config)?;
        Ok(Self::new(library))
    }

    pub fn library(&self) -> &NativeLibrary {
        &self.shared.library
    }

    /// Install this bridge as the process-wide bridge
    ///
    /// Used by `DomainObject::from_bytes` and `to_bytes`. Only the first
    /// install succeeds; later ones hand the bridge back.
    pub fn install(self) -> Result<(), Bridge> {
        GLOBAL.set(self)?;
        tracing::debug!("bridge installed");
        Ok(())
    }

    /// The process-wide bridge
    pub fn global() -> BridgeResult<&'static Bridge> {
        GLOBAL.get().ok_or(BridgeError::NotInstalled)
    }

    /// Calls issued through this bridge still waiting for their completion
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("library", &self.shared.library)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
