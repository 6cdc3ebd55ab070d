use thiserror;

use sym::ConcretizationError;

use crate::mem;
use crate::module::Handle;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The loader could not load the named module.
    #[error("module {name} could not be loaded")]
    ModuleNotFound { name: String },

    /// The module exports nothing under the requested name or ordinal.
    #[error("module {module} does not export {symbol}")]
    SymbolNotFound { module: String, symbol: String },

    /// The handle does not refer to a loaded module.
    #[error("invalid module handle {handle}")]
    InvalidHandle { handle: Handle },

    /// The module handle has no single concrete value.
    #[error("symbolic module handle: {0}")]
    SymbolicHandle(#[source] ConcretizationError),

    /// An argument that must be concrete has no single concrete value.
    #[error("argument {index} of {procedure} is symbolic: {source}")]
    SymbolicArgument {
        procedure: &'static str,
        index: usize,
        source: ConcretizationError,
    },

    #[error(transparent)]
    Memory(#[from] mem::Error),

    #[error("procedure {name} is not handled")]
    UnhandledProcedure { name: String },

    #[error("{procedure} expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        procedure: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl Error {
    /// Recoverable errors are reported to emulated code as a null return value. Any other error
    /// must be handled by the host.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ModuleNotFound { .. }
                | Error::SymbolNotFound { .. }
                | Error::InvalidHandle { .. }
        )
    }
}
