//! Dispatch registry
//!
//! Binds each native symbol name to its descriptor list, return descriptor,
//! call path and (for `Direct` entries) the managed operation. The builtin
//! table is built once per process and never mutated afterwards.
//!
//! A native extension's import table is linked against the registry at load
//! time into `LinkedSymbols`; after linking, dispatch is a direct index into
//! the entry table, no name lookup on the call path.

use once_cell::sync::Lazy;
use pycapi_sdk::PyResult;
use rustc_hash::FxHashMap;

use crate::call::CApiCall;
use crate::descriptor::{ArgDescriptor, Param, WireKind};
use crate::error::{CApiError, CApiResult};
use crate::marshal::ManagedResult;

/// Operation implementation of a `Direct` entry
pub type BuiltinFn = fn(&CApiCall<'_>) -> PyResult<ManagedResult>;

/// How a native call reaches its implementation.
///
/// Open enumeration: new paths may be added without touching `Direct` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CallPath {
    /// Routed straight to a managed operation
    Direct,
    /// Implemented natively on top of other entries; never routed here
    CImpl,
    /// Declared for the symbol table, provided elsewhere
    Ignored,
    /// Declared; calling it raises a system error
    NotImplemented,
}

/// Index of an entry in a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuiltinId(u32);

impl BuiltinId {
    /// Numeric id
    pub fn index(self) -> u32 {
        self.0
    }
}

// ============================================================================
// CApiBuiltin
// ============================================================================

/// One native symbol entry
#[derive(Clone, Copy)]
pub struct CApiBuiltin {
    /// Symbol name, unique in a registry
    pub name: &'static str,
    /// Return descriptor
    pub ret: ArgDescriptor,
    /// Argument slots, in native order
    pub args: &'static [Param],
    /// Call path
    pub call: CallPath,
    implementation: Option<BuiltinFn>,
}

impl CApiBuiltin {
    /// Entry routed to a managed operation
    pub const fn direct(
        name: &'static str,
        ret: ArgDescriptor,
        args: &'static [Param],
        implementation: BuiltinFn,
    ) -> Self {
        Self {
            name,
            ret,
            args,
            call: CallPath::Direct,
            implementation: Some(implementation),
        }
    }

    /// Entry declared for the symbol table only
    pub const fn declared(
        name: &'static str,
        ret: ArgDescriptor,
        args: &'static [Param],
        call: CallPath,
    ) -> Self {
        Self {
            name,
            ret,
            args,
            call,
            implementation: None,
        }
    }

    /// Declared arity
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Managed operation, if routed
    pub fn implementation(&self) -> Option<BuiltinFn> {
        self.implementation
    }

    /// C prototype, e.g. `int PyFile_WriteObject(PyObject*, PyObject*, int);`
    pub fn c_prototype(&self) -> String {
        let args = if self.args.is_empty() {
            "void".to_string()
        } else {
            self.args
                .iter()
                .map(|p| p.descriptor.c_type())
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!("{} {}({});", self.ret.c_type(), self.name, args)
    }

    fn validate(&self) -> CApiResult<()> {
        let invalid = |reason: &str| CApiError::InvalidEntry {
            symbol: self.name.to_string(),
            reason: reason.to_string(),
        };
        match (self.call, self.implementation) {
            (CallPath::Direct, None) => return Err(invalid("Direct entry without an implementation")),
            (CallPath::Direct, Some(_)) => {}
            (_, Some(_)) => return Err(invalid("only Direct entries carry an implementation")),
            (_, None) => {}
        }
        if self.args.iter().any(|p| p.descriptor.wire() == WireKind::Void) {
            return Err(invalid("void is not a valid argument descriptor"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for CApiBuiltin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CApiBuiltin")
            .field("name", &self.name)
            .field("ret", &self.ret)
            .field("args", &self.args)
            .field("call", &self.call)
            .finish()
    }
}

// ============================================================================
// CApiRegistry
// ============================================================================

/// Symbol table of native entry points
pub struct CApiRegistry {
    entries: Vec<CApiBuiltin>,
    by_name: FxHashMap<&'static str, BuiltinId>,
}

static BUILTINS: Lazy<CApiResult<CApiRegistry>> = Lazy::new(|| {
    let mut registry = CApiRegistry::new();
    crate::builtins::register_all(&mut registry)?;
    log::debug!("C API registry built with {} entries", registry.len());
    Ok(registry)
});

impl CApiRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            by_name: FxHashMap::default(),
        }
    }

    /// The process-wide registry of builtin entry points
    pub fn builtins() -> CApiResult<&'static CApiRegistry> {
        match &*BUILTINS {
            Ok(registry) => Ok(registry),
            Err(e) => Err(e.clone()),
        }
    }

    /// Register an entry. Names are unique; entries are validated.
    pub fn register(&mut self, builtin: CApiBuiltin) -> CApiResult<BuiltinId> {
        builtin.validate()?;
        if self.by_name.contains_key(builtin.name) {
            return Err(CApiError::InvalidEntry {
                symbol: builtin.name.to_string(),
                reason: "symbol already registered".to_string(),
            });
        }
        let id = BuiltinId(self.entries.len() as u32);
        self.by_name.insert(builtin.name, id);
        self.entries.push(builtin);
        Ok(id)
    }

    /// Resolve a symbol name to its id
    pub fn resolve(&self, name: &str) -> Option<BuiltinId> {
        self.by_name.get(name).copied()
    }

    /// Entry by id
    pub fn get(&self, id: BuiltinId) -> Option<&CApiBuiltin> {
        self.entries.get(id.0 as usize)
    }

    /// Entry by name
    pub fn lookup(&self, name: &str) -> Option<&CApiBuiltin> {
        self.resolve(name).and_then(|id| self.get(id))
    }

    /// Check if a symbol is registered
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = &CApiBuiltin> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry as a C prototype line, in registration order
    pub fn c_prototypes(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.c_prototype());
            out.push('\n');
        }
        out
    }
}

impl Default for CApiRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// LinkedSymbols
// ============================================================================

/// A native extension's import table resolved to registry ids
#[derive(Debug, Clone)]
pub struct LinkedSymbols {
    ids: Vec<BuiltinId>,
}

impl LinkedSymbols {
    /// Link symbol names against a registry. Fails on the first unknown name.
    pub fn link<S: AsRef<str>>(names: &[S], registry: &CApiRegistry) -> CApiResult<Self> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            match registry.resolve(name) {
                Some(id) => ids.push(id),
                None => return Err(CApiError::UnknownSymbol(name.to_string())),
            }
        }
        log::debug!("linked {} C API symbols", ids.len());
        Ok(Self { ids })
    }

    /// Registry id of an import slot
    pub fn get(&self, local: usize) -> Option<BuiltinId> {
        self.ids.get(local).copied()
    }

    /// Number of linked symbols
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if nothing was linked
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
