use sym::SymbolicBitVec;

use crate::image::{Export, Image, ImageCatalog, LibraryDescription};
use crate::loader::InstrumentationHook;
use crate::mem::Memory;
use crate::state::ExecutionState;

/// Base of the first image mapped by [catalog] with the default layout.
pub const FIRST_BASE: u64 = 0x1000_0000;

/// Address where tests place strings passed to the procedures.
pub const STRING_ADDR: u64 = 0x40_0000;

pub fn kernel32() -> LibraryDescription {
    LibraryDescription::new("kernel32.dll", 0x2_0000)
        .with_export(Export::named("CreateFileA", 1, 0x1000))
        .with_export(Export::named("ExitProcess", 2, 0x1100))
        .with_export(Export::ordinal_only(3, 0x1200))
        .with_export(Export::named("Foo@Z", 4, 0x1300))
        .with_export(Export::named("Bar@XZ", 6, 0x1400))
        .with_export(Export::named("Baz@Z", 7, 0x1500))
        .with_export(Export::named("Baz@XZ", 8, 0x1600))
}

pub fn user32() -> LibraryDescription {
    LibraryDescription::new("user32.dll", 0x3_0000)
        .with_export(Export::named("MessageBoxA", 1, 0x2000))
        .with_dependency("kernel32.dll")
}

pub fn catalog() -> ImageCatalog {
    ImageCatalog::default()
        .with_library(kernel32())
        .with_library(user32())
}

pub fn state() -> ExecutionState<Memory> {
    ExecutionState::new(Memory::new())
}

/// Write a narrow string at [STRING_ADDR] and return a pointer to it.
pub fn c_string(state: &mut ExecutionState<Memory>, value: &str) -> SymbolicBitVec {
    state
        .memory_mut()
        .write_c_string(STRING_ADDR, value)
        .expect("failed to write string");
    SymbolicBitVec::from(STRING_ADDR)
}

/// Write a wide string at [STRING_ADDR] and return a pointer to it.
pub fn wide_string(state: &mut ExecutionState<Memory>, value: &str) -> SymbolicBitVec {
    state
        .memory_mut()
        .write_wide_string(STRING_ADDR, value)
        .expect("failed to write string");
    SymbolicBitVec::from(STRING_ADDR)
}

/// Records the names of the images it is notified about.
#[derive(Debug, Clone, Default)]
pub struct RecordingHook {
    pub loaded: Vec<String>,
}

impl InstrumentationHook for RecordingHook {
    fn image_loaded(&mut self, image: &Image) {
        self.loaded.push(image.provides.clone());
    }
}
