use std::collections::BTreeSet;

use crate::mem::EmulatedMemory;
use crate::module::ModuleStore;

/// Fully qualified (`module.symbol`) names of the procedures resolved along an execution path.
pub type ResolvedProcedureSet = BTreeSet<String>;

/// The loader view of one execution path. Forking a path clones the state so that each path has
/// its own modules and resolved procedures.
#[derive(Debug, Clone, Default)]
pub struct ExecutionState<M: EmulatedMemory> {
    memory: M,
    modules: ModuleStore,
    resolved_procedures: Option<ResolvedProcedureSet>,
}

impl<M: EmulatedMemory> ExecutionState<M> {
    pub fn new(memory: M) -> Self {
        Self {
            memory,
            modules: ModuleStore::new(),
            resolved_procedures: None,
        }
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn modules(&self) -> &ModuleStore {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut ModuleStore {
        &mut self.modules
    }

    /// The resolved procedures of this path. The set is created on first access.
    pub fn resolved_procedures(&mut self) -> &mut ResolvedProcedureSet {
        self.resolved_procedures.get_or_insert_with(Default::default)
    }

    /// The resolved procedures of this path, or `None` if nothing has used the set yet.
    pub fn existing_resolved_procedures(&self) -> Option<&ResolvedProcedureSet> {
        self.resolved_procedures.as_ref()
    }
}
