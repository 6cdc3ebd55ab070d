use sym::SymbolicBitVec;
use tracing::warn;

use crate::error::{Error, Result};
use crate::image::BinaryLoader;
use crate::loader::{DynamicLoader, InstrumentationHook, PassThrough};
use crate::mem::{self, EmulatedMemory};
use crate::module::Module;
use crate::resolver::ProcAddressResolver;
use crate::state::ExecutionState;

/// The emulated dynamic linking procedures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedure {
    /// `HMODULE LoadLibraryA(LPCSTR lpLibFileName)`
    LoadLibraryA,

    /// `HMODULE LoadLibraryExW(LPCWSTR lpLibFileName, HANDLE hFile, DWORD dwFlags)`
    LoadLibraryExW,

    /// `FARPROC GetProcAddress(HMODULE hModule, LPCSTR lpProcName)`
    GetProcAddress,
}

impl Procedure {
    pub const ALL: [Procedure; 3] = [
        Procedure::LoadLibraryA,
        Procedure::LoadLibraryExW,
        Procedure::GetProcAddress,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|procedure| procedure.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Procedure::LoadLibraryA => "LoadLibraryA",
            Procedure::LoadLibraryExW => "LoadLibraryExW",
            Procedure::GetProcAddress => "GetProcAddress",
        }
    }

    pub fn num_args(&self) -> usize {
        match self {
            Procedure::LoadLibraryA => 1,
            Procedure::LoadLibraryExW => 3,
            Procedure::GetProcAddress => 2,
        }
    }
}

/// Entry points for emulated calls to the dynamic linking procedures. Arguments are passed in
/// declaration order as extracted by the host from the calling convention in use.
///
/// Failures a real process observes as a null return value are logged and returned as `0`. Other
/// errors are returned to the host.
#[derive(Debug, Clone)]
pub struct DynamicLinkingApi<L: BinaryLoader, H: InstrumentationHook = PassThrough> {
    loader: DynamicLoader<L, H>,
    resolver: ProcAddressResolver,
}

impl<L: BinaryLoader, H: InstrumentationHook> DynamicLinkingApi<L, H> {
    pub fn new(loader: DynamicLoader<L, H>, resolver: ProcAddressResolver) -> Self {
        Self { loader, resolver }
    }

    pub fn loader(&self) -> &DynamicLoader<L, H> {
        &self.loader
    }

    pub fn resolver(&self) -> &ProcAddressResolver {
        &self.resolver
    }

    /// Emulate a call to the named procedure.
    pub fn call<M: EmulatedMemory>(
        &mut self,
        name: &str,
        state: &mut ExecutionState<M>,
        args: &[SymbolicBitVec],
    ) -> Result<u64> {
        let procedure = Procedure::from_name(name).ok_or_else(|| Error::UnhandledProcedure {
            name: name.to_string(),
        })?;

        if args.len() != procedure.num_args() {
            return Err(Error::ArgumentCount {
                procedure: procedure.name(),
                expected: procedure.num_args(),
                actual: args.len(),
            });
        }

        match procedure {
            Procedure::LoadLibraryA => self.load_library_a(state, &args[0]),
            Procedure::LoadLibraryExW => {
                self.load_library_ex_w(state, &args[0], &args[1], &args[2])
            }
            Procedure::GetProcAddress => self.get_proc_address(state, &args[0], &args[1]),
        }
    }

    pub fn load_library_a<M: EmulatedMemory>(
        &mut self,
        state: &mut ExecutionState<M>,
        lib_name: &SymbolicBitVec,
    ) -> Result<u64> {
        let procedure = Procedure::LoadLibraryA;
        let result = self.load_library(procedure, state, lib_name, M::read_c_string);
        null_on_failure(procedure, result)
    }

    /// The file handle and flags are accepted but have no effect.
    pub fn load_library_ex_w<M: EmulatedMemory>(
        &mut self,
        state: &mut ExecutionState<M>,
        lib_name: &SymbolicBitVec,
        _file: &SymbolicBitVec,
        _flags: &SymbolicBitVec,
    ) -> Result<u64> {
        let procedure = Procedure::LoadLibraryExW;
        let result = self.load_library(procedure, state, lib_name, M::read_wide_string);
        null_on_failure(procedure, result)
    }

    pub fn get_proc_address<M: EmulatedMemory>(
        &self,
        state: &mut ExecutionState<M>,
        module: &SymbolicBitVec,
        proc_name: &SymbolicBitVec,
    ) -> Result<u64> {
        let result = self.resolver.resolve_arguments(state, module, proc_name);
        null_on_failure(Procedure::GetProcAddress, result)
    }

    fn load_library<M: EmulatedMemory>(
        &mut self,
        procedure: Procedure,
        state: &mut ExecutionState<M>,
        lib_name: &SymbolicBitVec,
        read_name: impl Fn(&M, u64) -> mem::Result<String>,
    ) -> Result<u64> {
        let lib_name = pointer_arg(procedure, 0, lib_name)?;
        let lib_name = read_name(state.memory(), lib_name)?;
        self.loader.load(state, &lib_name).map(Module::base)
    }
}

fn pointer_arg(procedure: Procedure, index: usize, value: &SymbolicBitVec) -> Result<u64> {
    u64::try_from(value).map_err(|source| Error::SymbolicArgument {
        procedure: procedure.name(),
        index,
        source,
    })
}

fn null_on_failure(procedure: Procedure, result: Result<u64>) -> Result<u64> {
    match result {
        Err(err) if err.is_recoverable() => {
            warn!(procedure = procedure.name(), error = %err, "returning null");
            Ok(0)
        }
        result => result,
    }
}
