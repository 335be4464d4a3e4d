//! Dynamic symbol lookup with cached capability state.
//!
//! Optional platform entry points (APIs absent on older OS versions) are
//! probed once per library and remembered as an explicit
//! [`Capability`]: available with an address, or missing. Call sites branch
//! on the capability and degrade to a default result instead of re-probing
//! or crashing; "operation unavailable" is a state, not a side effect of a
//! failed call.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::ffi::CString;
use std::fmt;
use std::os::raw::c_void;

// =============================================================================
// Errors and Capabilities
// =============================================================================

/// Library-level lookup failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// The shared library itself could not be loaded.
    LibraryNotFound { name: String },
    /// The library name contained an interior NUL byte.
    InvalidName { name: String },
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolError::LibraryNotFound { name } => {
                write!(f, "native library '{name}' could not be loaded")
            }
            SymbolError::InvalidName { name } => {
                write!(f, "invalid native name '{name}'")
            }
        }
    }
}

impl std::error::Error for SymbolError {}

/// Resolution state of one optional native entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Entry point present; address usable as a dispatch target.
    Available(usize),
    /// Entry point absent on this platform/version. Permanent for the
    /// process lifetime; callers degrade to their documented default.
    Missing,
}

impl Capability {
    /// Target address, if the entry point exists.
    #[inline]
    pub fn address(self) -> Option<usize> {
        match self {
            Capability::Available(addr) => Some(addr),
            Capability::Missing => None,
        }
    }

    /// Address or the null sentinel; pairs with the dispatcher's
    /// null-target behavior for call sites that want zero-result fallback.
    #[inline]
    pub fn address_or_null(self) -> usize {
        self.address().unwrap_or(0)
    }

    #[inline]
    pub fn is_available(self) -> bool {
        matches!(self, Capability::Available(_))
    }
}

// =============================================================================
// Platform Loaders
// =============================================================================

#[cfg(unix)]
mod platform {
    use super::SymbolError;
    use std::ffi::CString;
    use std::os::raw::c_void;

    pub(super) fn open(name: &CString) -> Result<*mut c_void, SymbolError> {
        // Safety: name is a valid NUL-terminated string.
        let handle = unsafe { libc::dlopen(name.as_ptr(), libc::RTLD_LAZY | libc::RTLD_LOCAL) };
        if handle.is_null() {
            Err(SymbolError::LibraryNotFound {
                name: name.to_string_lossy().into_owned(),
            })
        } else {
            Ok(handle)
        }
    }

    pub(super) fn open_current() -> *mut c_void {
        // Safety: dlopen(NULL) returns a handle to the main program image.
        unsafe { libc::dlopen(std::ptr::null(), libc::RTLD_LAZY | libc::RTLD_LOCAL) }
    }

    pub(super) fn lookup(handle: *mut c_void, symbol: &CString) -> usize {
        // Safety: handle came from dlopen and symbol is NUL-terminated.
        unsafe { libc::dlsym(handle, symbol.as_ptr()) as usize }
    }

    pub(super) fn close(handle: *mut c_void) {
        if !handle.is_null() {
            // Safety: handle came from dlopen and is closed exactly once.
            unsafe {
                libc::dlclose(handle);
            }
        }
    }
}

#[cfg(windows)]
mod platform {
    use super::SymbolError;
    use std::ffi::CString;
    use std::os::raw::c_void;
    use windows_sys::Win32::System::LibraryLoader::{
        FreeLibrary, GetModuleHandleA, GetProcAddress, LoadLibraryA,
    };

    pub(super) fn open(name: &CString) -> Result<*mut c_void, SymbolError> {
        // Safety: name is a valid NUL-terminated string.
        let handle = unsafe { LoadLibraryA(name.as_ptr().cast()) };
        if handle.is_null() {
            Err(SymbolError::LibraryNotFound {
                name: name.to_string_lossy().into_owned(),
            })
        } else {
            Ok(handle.cast())
        }
    }

    pub(super) fn open_current() -> *mut c_void {
        // Safety: a null module name names the calling process's image.
        unsafe { GetModuleHandleA(std::ptr::null()).cast() }
    }

    pub(super) fn lookup(handle: *mut c_void, symbol: &CString) -> usize {
        // Safety: handle is a live module handle, symbol is NUL-terminated.
        match unsafe { GetProcAddress(handle.cast(), symbol.as_ptr().cast()) } {
            Some(addr) => addr as usize,
            None => 0,
        }
    }

    pub(super) fn close(handle: *mut c_void) {
        if !handle.is_null() {
            // Safety: handle came from LoadLibraryA.
            unsafe {
                FreeLibrary(handle.cast());
            }
        }
    }
}

// =============================================================================
// Native Library
// =============================================================================

/// A loaded native library with a per-symbol capability cache.
pub struct NativeLibrary {
    handle: *mut c_void,
    name: String,
    /// Whether Drop should release the handle (module handles for the
    /// current process image are borrowed, not owned).
    owned: bool,
    capabilities: RwLock<FxHashMap<String, Capability>>,
}

// Safety: the handle is an opaque loader token; the platform loaders are
// documented thread-safe, and the capability cache is internally locked.
unsafe impl Send for NativeLibrary {}
unsafe impl Sync for NativeLibrary {}

impl NativeLibrary {
    /// Load a shared library by name or path.
    pub fn open(name: &str) -> Result<Self, SymbolError> {
        let c_name = CString::new(name).map_err(|_| SymbolError::InvalidName {
            name: name.to_string(),
        })?;
        let handle = platform::open(&c_name)?;
        Ok(Self {
            handle,
            name: name.to_string(),
            owned: true,
            capabilities: RwLock::new(FxHashMap::default()),
        })
    }

    /// Handle over the current process image (symbols linked into the
    /// embedding runtime itself).
    pub fn current() -> Self {
        Self {
            handle: platform::open_current(),
            name: "<current>".to_string(),
            owned: cfg!(unix),
            capabilities: RwLock::new(FxHashMap::default()),
        }
    }

    /// Library name as passed to [`NativeLibrary::open`].
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capability of one entry point, probed once and cached.
    ///
    /// A symbol that fails to resolve stays [`Capability::Missing`] for the
    /// process lifetime: native loaders do not grow symbols, so there is
    /// nothing to re-probe.
    pub fn capability(&self, symbol: &str) -> Capability {
        if let Some(&cap) = self.capabilities.read().get(symbol) {
            return cap;
        }

        let cap = match CString::new(symbol) {
            Ok(c_symbol) => {
                let addr = platform::lookup(self.handle, &c_symbol);
                if addr == 0 {
                    Capability::Missing
                } else {
                    Capability::Available(addr)
                }
            }
            Err(_) => Capability::Missing,
        };

        self.capabilities
            .write()
            .entry(symbol.to_string())
            .or_insert(cap);
        cap
    }

    /// Number of probed symbols (profiling visibility).
    pub fn probed_count(&self) -> usize {
        self.capabilities.read().len()
    }
}

impl Drop for NativeLibrary {
    fn drop(&mut self) {
        if self.owned {
            platform::close(self.handle);
        }
    }
}

impl fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("name", &self.name)
            .field("probed", &self.probed_count())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
