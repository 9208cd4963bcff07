//! CApiContext - routes native calls onto the managed runtime
//!
//! One call goes through the same fixed pipeline regardless of the entry:
//!
//! ```text
//! resolve entry -> arity -> call path -> marshal_in -> null guard
//!               -> operation -> marshal_out
//! ```
//!
//! The context holds no state of its own besides borrowed references; it is
//! a pass-through, so it needs no locks and may be shared freely.

use pycapi_sdk::{ManagedRuntime, NativeValue, PyException};

use crate::call::CApiCall;
use crate::config::BridgeConfig;
use crate::error::{CApiError, CApiResult};
use crate::guard;
use crate::marshal::{self, NativeResult};
use crate::registry::{BuiltinFn, BuiltinId, CApiBuiltin, CApiRegistry, CallPath, LinkedSymbols};
use crate::thread_state::ThreadState;

/// Dispatcher binding a registry to a managed runtime
pub struct CApiContext<'rt> {
    runtime: &'rt dyn ManagedRuntime,
    registry: &'rt CApiRegistry,
    config: BridgeConfig,
}

impl<'rt> CApiContext<'rt> {
    /// Create a dispatcher over an explicit registry
    pub fn new(runtime: &'rt dyn ManagedRuntime, registry: &'rt CApiRegistry, config: BridgeConfig) -> Self {
        Self {
            runtime,
            registry,
            config,
        }
    }

    /// Create a dispatcher over the builtin registry
    pub fn with_builtins(runtime: &'rt dyn ManagedRuntime, config: BridgeConfig) -> CApiResult<Self> {
        Ok(Self::new(runtime, CApiRegistry::builtins()?, config))
    }

    /// The managed runtime
    pub fn runtime(&self) -> &'rt dyn ManagedRuntime {
        self.runtime
    }

    /// The registry calls are resolved against
    pub fn registry(&self) -> &'rt CApiRegistry {
        self.registry
    }

    /// Active configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    // ========================================================================
    // Rust-facing calls
    // ========================================================================

    /// Call an entry by symbol name
    pub fn call(&self, symbol: &str, args: &[NativeValue]) -> CApiResult<NativeResult> {
        let id = self
            .registry
            .resolve(symbol)
            .ok_or_else(|| CApiError::UnknownSymbol(symbol.to_string()))?;
        self.call_id(id, args)
    }

    /// Call an entry by registry id
    pub fn call_id(&self, id: BuiltinId, args: &[NativeValue]) -> CApiResult<NativeResult> {
        let entry = self
            .registry
            .get(id)
            .ok_or(CApiError::UnknownId(id.index()))?;

        if args.len() != entry.arity() {
            return Err(CApiError::ArityMismatch {
                symbol: entry.name.to_string(),
                expected: entry.arity(),
                got: args.len(),
            });
        }

        let implementation = self.route(entry)?;
        if self.config.trace_calls {
            log::trace!("{}{:?}", entry.name, args);
        }

        let rt = self.runtime;
        let values = marshal::marshal_in(rt, entry.name, entry.args, args)?;
        guard::check_required(rt, entry.name, entry.args, &values)?;

        let call = CApiCall::new(rt, entry.name, values);
        let result = implementation(&call)?;

        let native = marshal::marshal_out(rt, entry.name, entry.ret, result, self.config.check_return_types)?;
        if self.config.trace_calls {
            log::trace!("{} -> {:?}", entry.name, native);
        }
        Ok(native)
    }

    fn route(&self, entry: &CApiBuiltin) -> CApiResult<BuiltinFn> {
        match (entry.call, entry.implementation()) {
            (CallPath::Direct, Some(implementation)) => Ok(implementation),
            (CallPath::NotImplemented, _) => {
                log::warn!("call to unimplemented C API function {}", entry.name);
                Err(CApiError::Raised(self.runtime.system_error(&format!(
                    "unimplemented C API function {}",
                    entry.name
                ))))
            }
            (path, _) => {
                log::warn!("{} has call path {:?} and is not routed here", entry.name, path);
                Err(CApiError::NotRouted {
                    symbol: entry.name.to_string(),
                    path,
                })
            }
        }
    }

    // ========================================================================
    // Native calling convention
    // ========================================================================

    /// Call an entry the way a native caller sees it.
    ///
    /// On success returns the converted word and leaves the indicator alone.
    /// On failure stores the exception in `ts` and returns the return
    /// descriptor's error sentinel (`-1` or NULL).
    pub fn invoke(&self, ts: &mut ThreadState, id: BuiltinId, args: &[NativeValue]) -> NativeValue {
        match self.call_id(id, args) {
            Ok(result) => result.value,
            Err(err) => {
                ts.set_error(self.into_exception(err));
                self.registry
                    .get(id)
                    .map(|entry| entry.ret.error_value())
                    .unwrap_or(NativeValue::NULL)
            }
        }
    }

    /// `invoke` through a linked import table slot
    pub fn invoke_linked(
        &self,
        ts: &mut ThreadState,
        linked: &LinkedSymbols,
        local: usize,
        args: &[NativeValue],
    ) -> NativeValue {
        match linked.get(local) {
            Some(id) => self.invoke(ts, id, args),
            None => {
                ts.set_error(self.runtime.system_error(&format!(
                    "invalid C API import slot: {}",
                    local
                )));
                NativeValue::NULL
            }
        }
    }

    fn into_exception(&self, err: CApiError) -> PyException {
        match err {
            CApiError::Raised(e) => e,
            other => self.runtime.system_error(&other.to_string()),
        }
    }
}
