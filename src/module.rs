use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::config::NameRules;
use crate::image::Image;
use crate::symbols::SymbolTable;

/// Opaque module reference handed to emulated code. It is the mapped base address of the module.
/// The null handle signals failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Handle(u64);

impl Handle {
    pub const NULL: Handle = Handle(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<Handle> for u64 {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A binary image loaded into an execution state.
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    provenance: String,
    base: u64,
    symbols: SymbolTable,
}

impl Module {
    pub fn from_image(image: &Image, rules: &NameRules) -> Self {
        Self {
            name: rules.normalize(&image.provides),
            provenance: rules.provenance(&image.provides),
            base: image.mapped_base,
            symbols: SymbolTable::from_image(image),
        }
    }

    /// The normalized module name which identifies this module.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prefix of the fully qualified names of procedures resolved from this module.
    pub fn provenance(&self) -> &str {
        &self.provenance
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn handle(&self) -> Handle {
        Handle(self.base)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }
}

/// The modules loaded into an execution state, indexed by normalized name and by base address.
#[derive(Debug, Clone, Default)]
pub struct ModuleStore {
    modules: Vec<Module>,
    by_name: HashMap<String, usize>,
    by_base: BTreeMap<u64, usize>,
}

impl ModuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. If a module of the same name is already registered it is returned
    /// unchanged and `module` is discarded.
    ///
    /// # Panics
    ///
    /// Panics if the module base is zero or collides with the base of a different module.
    pub fn register(&mut self, module: Module) -> &mut Module {
        if let Some(&index) = self.by_name.get(module.name()) {
            return &mut self.modules[index];
        }

        assert_ne!(module.base, 0, "module {} mapped at null base", module.name);
        if let Some(&index) = self.by_base.get(&module.base) {
            panic!(
                "module {new} base {base:#x} collides with module {existing}",
                new = module.name,
                base = module.base,
                existing = self.modules[index].name
            );
        }

        debug!(
            module = %module.name,
            base = %format_args!("{:#x}", module.base),
            symbols = module.symbols.len(),
            "registered module"
        );

        let index = self.modules.len();
        self.by_name.insert(module.name.clone(), index);
        self.by_base.insert(module.base, index);
        self.modules.push(module);
        &mut self.modules[index]
    }

    /// Find a module by the exact base address.
    pub fn find_by_handle(&self, handle: Handle) -> Option<&Module> {
        self.by_base
            .get(&handle.value())
            .map(|&index| &self.modules[index])
    }

    pub fn find_by_handle_mut(&mut self, handle: Handle) -> Option<&mut Module> {
        self.by_base
            .get(&handle.value())
            .map(|&index| &mut self.modules[index])
    }

    /// Find a module by name. The name is normalized with the given rules.
    pub fn find_by_name(&self, name: &str, rules: &NameRules) -> Option<&Module> {
        self.by_name
            .get(&rules.normalize(name))
            .map(|&index| &self.modules[index])
    }

    /// Make `name` refer to the module with the given handle, so that a name the binary loader
    /// redirected is found without loading again. Returns `false` if the name is already taken
    /// or no module has the handle.
    pub fn add_alias(&mut self, name: &str, rules: &NameRules, handle: Handle) -> bool {
        let Some(&index) = self.by_base.get(&handle.value()) else {
            return false;
        };

        match self.by_name.entry(rules.normalize(name)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(index);
                true
            }
        }
    }

    pub fn contains(&self, name: &str, rules: &NameRules) -> bool {
        self.find_by_name(name, rules).is_some()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }
}
