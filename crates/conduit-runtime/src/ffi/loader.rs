//! Dynamic engine loading
//!
//! Resolves an engine library using platform naming conventions and search
//! paths, then binds the `conduit_*` entry points with `libloading`.

use crate::ffi::library::NativeLibrary;
use crate::ffi::marshal::to_c_text;
use crate::ffi::types::{
    symbols, DecodeFn, EncodeFn, EngineFreeFn, EngineNewFn, ExecuteFn, NativeApi, ReleaseFn,
    TakeLastErrorFn,
};
use libloading::Library;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Library loading errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Library file not found in search paths
    #[error("Library not found: {0}")]
    LibraryNotFound(String),
    /// Symbol not found in library
    #[error("Symbol '{symbol}' not found in library '{library}'")]
    SymbolNotFound { library: String, symbol: String },
    /// Failed to load library
    #[error("Failed to load library {path}: {reason}")]
    LoadFailed { path: PathBuf, reason: String },
    /// `conduit_engine_new` returned no engine
    #[error("Engine in '{library}' failed to initialize")]
    EngineInit { library: String },
    /// Engine configuration could not be passed to the library
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Engine library loader with platform-specific path resolution
///
/// # Safety
///
/// Loading a dynamic library runs its initialization code in this process.
/// Only load engines you trust.
pub struct LibraryLoader {
    search_paths: Vec<PathBuf>,
}

impl LibraryLoader {
    /// Create a new loader with default search paths
    pub fn new() -> Self {
        Self {
            search_paths: Self::default_search_paths(),
        }
    }

    /// Platform-specific default search paths
    ///
    /// - Linux: /usr/lib, /usr/local/lib, /lib (+ lib64 variants)
    /// - macOS: /usr/lib, /usr/local/lib, /opt/homebrew/lib
    /// - Windows: C:\Windows\System32
    /// - All platforms: current working directory (highest priority)
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(target_os = "linux")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/lib"));

            if cfg!(target_pointer_width = "64") {
                paths.push(PathBuf::from("/usr/lib64"));
                paths.push(PathBuf::from("/lib64"));
            }
        }

        #[cfg(target_os = "macos")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/opt/homebrew/lib"));
        }

        #[cfg(target_os = "windows")]
        {
            paths.push(PathBuf::from("C:\\Windows\\System32"));
            if let Ok(system_root) = std::env::var("SystemRoot") {
                paths.push(PathBuf::from(format!("{}\\System32", system_root)));
            }
        }

        if let Ok(cwd) = std::env::current_dir() {
            paths.insert(0, cwd);
        }

        paths
    }

    /// Resolve a library name to a path
    ///
    /// - Linux: lib{name}.so
    /// - macOS: lib{name}.dylib or lib{name}.so
    /// - Windows: {name}.dll
    ///
    /// Paths (absolute, or relative with a separator) are used as given.
    pub fn resolve_library_path(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if (path.is_absolute() || path.components().count() > 1) && path.exists() {
            return Some(path.to_path_buf());
        }

        let extensions: &[&str] = if cfg!(target_os = "windows") {
            &["dll"]
        } else if cfg!(target_os = "macos") {
            &["dylib", "so"]
        } else {
            &["so"]
        };

        let prefixes: &[&str] = if cfg!(target_os = "windows") {
            &["", "lib"]
        } else {
            &["lib", ""]
        };

        for search_path in &self.search_paths {
            for prefix in prefixes {
                for ext in extensions {
                    let full_path = search_path.join(format!("{prefix}{name}.{ext}"));
                    if full_path.exists() {
                        return Some(full_path);
                    }
                }
            }
        }

        None
    }

    /// Load an engine library and bind its entry points
    ///
    /// If the library exports `conduit_engine_new`, it is called with
    /// `config` (JSON text, `{}` when absent) and the resulting engine is
    /// freed through `conduit_engine_free` when the `NativeLibrary` drops.
    pub fn load(&self, name: &str, config: Option<&str>) -> Result<NativeLibrary, LoadError> {
        let path = self
            .resolve_library_path(name)
            .ok_or_else(|| LoadError::LibraryNotFound(name.to_string()))?;

        // Safety: loading runs the library's initializers; the caller chose
        // to trust this engine.
        let library = unsafe { Library::new(&path) }.map_err(|e| LoadError::LoadFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        // Safety: the symbol types below are the documented conduit ABI.
        let native = unsafe { bind(library, name, config)? };
        tracing::info!(path = %path.display(), "native engine loaded");
        Ok(native)
    }

    /// Add a custom search path (prepended to search list)
    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.insert(0, path);
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Look up a required symbol and copy the function pointer out
unsafe fn symbol<T: Copy>(library: &Library, library_name: &str, name: &str) -> Result<T, LoadError> {
    library
        .get::<T>(name.as_bytes())
        .map(|sym| *sym)
        .map_err(|_| LoadError::SymbolNotFound {
            library: library_name.to_string(),
            symbol: name.to_string(),
        })
}

unsafe fn optional_symbol<T: Copy>(library: &Library, name: &str) -> Option<T> {
    library.get::<T>(name.as_bytes()).ok().map(|sym| *sym)
}

unsafe fn bind(
    library: Library,
    library_name: &str,
    config: Option<&str>,
) -> Result<NativeLibrary, LoadError> {
    let execute: ExecuteFn = symbol(&library, library_name, symbols::EXECUTE)?;
    let decode: DecodeFn = symbol(&library, library_name, symbols::DECODE)?;
    let encode: EncodeFn = symbol(&library, library_name, symbols::ENCODE)?;
    let release_buffer: ReleaseFn = symbol(&library, library_name, symbols::RELEASE_BUFFER)?;
    let take_last_error: TakeLastErrorFn =
        symbol(&library, library_name, symbols::TAKE_LAST_ERROR)?;

    let engine_new: Option<EngineNewFn> = optional_symbol(&library, symbols::ENGINE_NEW);
    let engine_free: Option<EngineFreeFn> = optional_symbol(&library, symbols::ENGINE_FREE);

    let engine = match engine_new {
        Some(engine_new) => {
            let config = to_c_text(config.unwrap_or("{}"))
                .map_err(|e| LoadError::InvalidConfig(e.to_string()))?;
            let engine = engine_new(config.as_ptr());
            if engine.is_null() {
                return Err(LoadError::EngineInit {
                    library: library_name.to_string(),
                });
            }
            engine
        }
        None => std::ptr::null(),
    };

    let api = NativeApi {
        engine,
        execute,
        decode,
        encode,
        release_buffer,
        take_last_error,
    };

    Ok(NativeLibrary::from_loaded(api, engine_free, library))
}
