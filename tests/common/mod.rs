use sym::SymbolicBitVec;
use symbolic_winload::image::{Export, ImageCatalog, LibraryDescription};
use symbolic_winload::mem::Memory;
use symbolic_winload::state::ExecutionState;

/// Install a subscriber that writes through the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn windows_catalog() -> ImageCatalog {
    let ntdll = LibraryDescription::new("ntdll.dll", 0x1_8000)
        .with_export(Export::named("NtCreateFile", 1, 0x1000))
        .with_export(Export::named("RtlAllocateHeap", 2, 0x1100));

    let kernel32 = LibraryDescription::new("kernel32.dll", 0x2_0000)
        .with_export(Export::named("CreateFileA", 1, 0x2000))
        .with_export(Export::named("GetProcAddress", 2, 0x2100))
        .with_export(Export::named("LoadLibraryA", 3, 0x2200))
        .with_export(Export::ordinal_only(4, 0x2300))
        .with_dependency("ntdll.dll");

    let msvcp = LibraryDescription::new("msvcp140.dll", 0x4_0000)
        .with_export(Export::named("?init@locale@std@@XZ", 1, 0x3000))
        .with_dependency("kernel32.dll");

    ImageCatalog::default()
        .with_library(ntdll)
        .with_library(kernel32)
        .with_library(msvcp)
}

/// Emulated process memory with a scratch area for strings handed to procedures.
pub struct Scratch {
    next: u64,
}

impl Scratch {
    pub fn new() -> Self {
        Self { next: 0x7ff0_0000 }
    }

    pub fn c_string(&mut self, state: &mut ExecutionState<Memory>, value: &str) -> SymbolicBitVec {
        let address = self.next;
        state
            .memory_mut()
            .write_c_string(address, value)
            .expect("failed to write string");
        self.next += 0x100;
        SymbolicBitVec::from(address)
    }

    pub fn wide_string(
        &mut self,
        state: &mut ExecutionState<Memory>,
        value: &str,
    ) -> SymbolicBitVec {
        let address = self.next;
        state
            .memory_mut()
            .write_wide_string(address, value)
            .expect("failed to write string");
        self.next += 0x100;
        SymbolicBitVec::from(address)
    }
}
