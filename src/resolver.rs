use sym::SymbolicBitVec;
use tracing::debug;

use crate::config::ResolverPolicy;
use crate::error::{Error, Result};
use crate::image::ordinal_name;
use crate::mem::EmulatedMemory;
use crate::module::Handle;
use crate::state::ExecutionState;

/// What `GetProcAddress` was asked to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Ordinal(u32),
    Name(String),
}

impl Query {
    /// The symbol table key for this query.
    pub fn key(&self) -> String {
        match self {
            Query::Ordinal(ordinal) => ordinal_name(*ordinal),
            Query::Name(name) => name.clone(),
        }
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

/// Resolves exported procedures of the modules loaded into an execution state.
#[derive(Debug, Clone, Default)]
pub struct ProcAddressResolver {
    policy: ResolverPolicy,
}

impl ProcAddressResolver {
    pub fn new(policy: ResolverPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ResolverPolicy {
        &self.policy
    }

    /// Convert a module handle argument into a [Handle]. Symbolic handles are rejected with
    /// [Error::SymbolicHandle].
    pub fn concrete_handle(&self, handle: &SymbolicBitVec) -> Result<Handle> {
        u64::try_from(handle)
            .map(Handle::new)
            .map_err(Error::SymbolicHandle)
    }

    /// Decode a name-or-ordinal argument. Values below the ordinal threshold are ordinals, any
    /// other value is the address of a NUL-terminated name.
    pub fn query(&self, memory: &impl EmulatedMemory, value: &SymbolicBitVec) -> Result<Query> {
        let value = u64::try_from(value).map_err(|source| Error::SymbolicArgument {
            procedure: "GetProcAddress",
            index: 1,
            source,
        })?;

        if value < self.policy.ordinal_threshold {
            if let Ok(ordinal) = u32::try_from(value) {
                return Ok(Query::Ordinal(ordinal));
            }
        }

        Ok(Query::Name(memory.read_c_string(value)?))
    }

    /// Resolve symbolic `GetProcAddress` arguments. The handle is validated before the query is
    /// read from memory.
    pub fn resolve_arguments<M: EmulatedMemory>(
        &self,
        state: &mut ExecutionState<M>,
        handle: &SymbolicBitVec,
        query: &SymbolicBitVec,
    ) -> Result<u64> {
        let handle = self.concrete_handle(handle)?;
        if state.modules().find_by_handle(handle).is_none() {
            return Err(Error::InvalidHandle { handle });
        }

        let query = self.query(state.memory(), query)?;
        self.resolve(state, handle, &query)
    }

    /// Resolve the query against the module with the given handle, returning the run-time
    /// address of the symbol. The fully qualified name of the resolved symbol is added to the
    /// resolved procedures of the state.
    pub fn resolve<M: EmulatedMemory>(
        &self,
        state: &mut ExecutionState<M>,
        handle: Handle,
        query: &Query,
    ) -> Result<u64> {
        let module = state
            .modules_mut()
            .find_by_handle_mut(handle)
            .ok_or(Error::InvalidHandle { handle })?;

        let key = query.key();
        let provenance = module.provenance().to_string();
        let (address, full_name) = match module.symbols_mut().resolve(&key, &self.policy) {
            Some(symbol) => (
                symbol.address(),
                format!("{provenance}.{name}", name = symbol.canonical_name()),
            ),
            None => {
                return Err(Error::SymbolNotFound {
                    module: provenance,
                    symbol: key,
                })
            }
        };

        debug!(
            procedure = %full_name,
            address = %format_args!("{address:#x}"),
            "resolved procedure"
        );
        state.resolved_procedures().insert(full_name);
        Ok(address)
    }
}
