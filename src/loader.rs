use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::config::NameRules;
use crate::error::{Error, Result};
use crate::image::{BinaryLoader, Image};
use crate::mem::EmulatedMemory;
use crate::module::{Handle, Module};
use crate::state::ExecutionState;

/// Notified once for every image the binary loader maps, before the image is used. Hosts use
/// this to install simulated implementations of the routines of the image.
pub trait InstrumentationHook {
    fn image_loaded(&mut self, image: &Image);
}

/// Hook that only performs the module bookkeeping.
#[derive(Copy, Clone, Default, Debug)]
pub struct PassThrough {}

impl InstrumentationHook for PassThrough {
    fn image_loaded(&mut self, _image: &Image) {}
}

impl<F: FnMut(&Image)> InstrumentationHook for F {
    fn image_loaded(&mut self, image: &Image) {
        self(image)
    }
}

/// Loads modules into execution states on demand.
#[derive(Debug, Clone)]
pub struct DynamicLoader<L: BinaryLoader, H: InstrumentationHook = PassThrough> {
    loader: L,
    hook: H,
    rules: NameRules,
}

impl<L: BinaryLoader> DynamicLoader<L> {
    pub fn new(loader: L) -> Self {
        Self::with_hook(loader, PassThrough {})
    }
}

impl<L: BinaryLoader, H: InstrumentationHook> DynamicLoader<L, H> {
    pub fn with_hook(loader: L, hook: H) -> Self {
        Self {
            loader,
            hook,
            rules: NameRules::default(),
        }
    }

    pub fn with_rules(mut self, rules: NameRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &NameRules {
        &self.rules
    }

    pub fn binary_loader(&self) -> &L {
        &self.loader
    }

    pub fn hook(&self) -> &H {
        &self.hook
    }

    /// Load the named module into the state, returning the loaded module. A module already
    /// loaded into the state is returned without consulting the binary loader.
    pub fn load<'s, M: EmulatedMemory>(
        &mut self,
        state: &'s mut ExecutionState<M>,
        name: &str,
    ) -> Result<&'s Module> {
        let handle = match state.modules().find_by_name(name, &self.rules) {
            Some(module) => {
                trace!(module = %module.name(), "module already loaded");
                module.handle()
            }
            None => self.load_images(state, name)?,
        };

        state
            .modules()
            .find_by_handle(handle)
            .ok_or_else(|| Error::ModuleNotFound {
                name: name.to_string(),
            })
    }

    fn load_images<M: EmulatedMemory>(
        &mut self,
        state: &mut ExecutionState<M>,
        name: &str,
    ) -> Result<Handle> {
        let not_found = || Error::ModuleNotFound {
            name: name.to_string(),
        };

        let images = self.loader.dynamic_load(name).ok_or_else(not_found)?;
        debug!(name, images = images.len(), "binary loader mapped images");

        for image in &images {
            self.hook.image_loaded(image);
            state
                .modules_mut()
                .register(Module::from_image(image, &self.rules));
        }

        let key = self.rules.normalize(name);
        let requested = match images
            .iter()
            .find(|image| self.rules.normalize(&image.provides) == key)
        {
            Some(image) => image.clone(),
            // Already mapped by the binary loader on behalf of another execution state
            None => self.loader.find_object(name).ok_or_else(not_found)?,
        };

        let handle = state
            .modules_mut()
            .register(Module::from_image(&requested, &self.rules))
            .handle();
        self.register_dependencies(state, &requested);

        if state.modules_mut().add_alias(name, &self.rules, handle) {
            trace!(name = %key, module = %requested.provides, "added module alias");
        }

        Ok(handle)
    }

    /// Register the transitive dependencies of `image` that the binary loader mapped earlier but
    /// the state does not know about yet. The hook is not notified for these.
    fn register_dependencies<M: EmulatedMemory>(
        &self,
        state: &mut ExecutionState<M>,
        image: &Image,
    ) {
        let mut visited = BTreeSet::new();
        let mut pending = image.dependencies.clone();
        while let Some(name) = pending.pop() {
            if !visited.insert(self.rules.normalize(&name))
                || state.modules().contains(&name, &self.rules)
            {
                continue;
            }

            match self.loader.find_object(&name) {
                Some(dependency) => {
                    pending.extend(dependency.dependencies.iter().cloned());
                    state
                        .modules_mut()
                        .register(Module::from_image(&dependency, &self.rules));
                }
                None => debug!(dependency = %name, "dependency is not mapped"),
            }
        }
    }
}
