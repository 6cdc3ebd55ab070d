use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::config::NameRules;

/// An exported entry of a binary image. The address is relative to the image base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: Option<String>,
    pub ordinal: Option<u32>,
    pub rva: u64,
}

impl Export {
    pub fn named(name: impl Into<String>, ordinal: u32, rva: u64) -> Self {
        Self {
            name: Some(name.into()),
            ordinal: Some(ordinal),
            rva,
        }
    }

    /// An export that can only be referenced by its ordinal.
    pub fn ordinal_only(ordinal: u32, rva: u64) -> Self {
        Self {
            name: None,
            ordinal: Some(ordinal),
            rva,
        }
    }
}

/// A binary image mapped into the emulated process by the [BinaryLoader].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Canonical name of the module this image provides, e.g. `kernel32.dll`.
    pub provides: String,
    pub mapped_base: u64,
    pub exports: Vec<Export>,

    /// Names of the modules this image imports from.
    pub dependencies: Vec<String>,
}

impl Image {
    /// Find an export by name. Ordinal-only exports are named `ordinal.<N>`.
    pub fn get_symbol(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|export| match &export.name {
            Some(export_name) => export_name == name,
            None => export
                .ordinal
                .is_some_and(|ordinal| name == ordinal_name(ordinal)),
        })
    }
}

/// The name used to look up an export by ordinal.
pub fn ordinal_name(ordinal: u32) -> String {
    format!("ordinal.{ordinal}")
}

/// The binary loader that maps images into the emulated process.
pub trait BinaryLoader {
    /// Load the named module. Returns the images newly mapped by this request, which includes
    /// any dependencies that were not yet mapped. Returns `None` if the module cannot be loaded.
    fn dynamic_load(&mut self, name: &str) -> Option<Vec<Image>>;

    /// Find an already mapped image by name.
    fn find_object(&self, name: &str) -> Option<Image>;
}

/// Description of a library that an [ImageCatalog] can map on request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDescription {
    pub name: String,
    pub size: u64,
    pub exports: Vec<Export>,
    pub dependencies: Vec<String>,
}

impl LibraryDescription {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            exports: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_export(mut self, export: Export) -> Self {
        self.exports.push(export);
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }
}

/// Where an [ImageCatalog] places images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogLayout {
    pub first_base: u64,
    pub alignment: u64,
}

impl Default for CatalogLayout {
    fn default() -> Self {
        // Windows maps images on 64K boundaries
        Self {
            first_base: 0x1000_0000,
            alignment: 0x1_0000,
        }
    }
}

/// A [BinaryLoader] over a fixed set of library descriptions. Images are mapped on first request
/// at increasing, aligned base addresses.
#[derive(Debug, Clone)]
pub struct ImageCatalog {
    rules: NameRules,
    available: BTreeMap<String, LibraryDescription>,
    mapped: BTreeMap<String, Image>,
    next_base: u64,
    alignment: u64,
}

impl Default for ImageCatalog {
    fn default() -> Self {
        Self::new(NameRules::default(), CatalogLayout::default())
    }
}

impl ImageCatalog {
    pub fn new(rules: NameRules, layout: CatalogLayout) -> Self {
        Self {
            rules,
            available: Default::default(),
            mapped: Default::default(),
            next_base: layout.first_base,
            alignment: layout.alignment.max(1),
        }
    }

    pub fn add_library(&mut self, library: LibraryDescription) {
        self.available
            .insert(self.rules.normalize(&library.name), library);
    }

    pub fn with_library(mut self, library: LibraryDescription) -> Self {
        self.add_library(library);
        self
    }

    pub fn mapped_images(&self) -> impl Iterator<Item = &Image> {
        self.mapped.values()
    }

    /// Collect the unmapped libraries required to load `key` with dependencies ordered first.
    /// Returns `None` if any of them is unavailable.
    fn plan(
        &self,
        key: &str,
        plan: &mut Vec<String>,
        visited: &mut BTreeSet<String>,
    ) -> Option<()> {
        // Cyclic dependencies are mapped together
        if self.mapped.contains_key(key) || !visited.insert(key.to_string()) {
            return Some(());
        }

        let library = self.available.get(key)?;
        for dependency in &library.dependencies {
            self.plan(&self.rules.normalize(dependency), plan, visited)?;
        }

        plan.push(key.to_string());
        Some(())
    }

    /// Assign bases to the planned libraries in order. Returns the images together with the
    /// next free base, or `None` if the address space is exhausted.
    fn place(&self, plan: &[String]) -> Option<(Vec<(String, Image)>, u64)> {
        let mut next_base = self.next_base;
        let mut placed = Vec::with_capacity(plan.len());
        for key in plan {
            let library = self.available.get(key)?;
            let mapped_base = next_base;
            let end = mapped_base.checked_add(library.size.max(1))?;
            next_base = end.checked_next_multiple_of(self.alignment)?;

            let image = Image {
                provides: library.name.clone(),
                mapped_base,
                exports: library.exports.clone(),
                dependencies: library.dependencies.clone(),
            };
            placed.push((key.clone(), image));
        }

        Some((placed, next_base))
    }
}

impl BinaryLoader for ImageCatalog {
    fn dynamic_load(&mut self, name: &str) -> Option<Vec<Image>> {
        let mut plan = Vec::new();
        self.plan(&self.rules.normalize(name), &mut plan, &mut BTreeSet::new())?;

        // Nothing is mapped unless every image fits
        let (placed, next_base) = self.place(&plan)?;
        self.next_base = next_base;

        let mut images = Vec::with_capacity(placed.len());
        for (key, image) in placed {
            debug!(
                name = %image.provides,
                base = %format_args!("{:#x}", image.mapped_base),
                "mapped image"
            );
            self.mapped.insert(key, image.clone());
            images.push(image);
        }

        Some(images)
    }

    fn find_object(&self, name: &str) -> Option<Image> {
        self.mapped.get(&self.rules.normalize(name)).cloned()
    }
}
