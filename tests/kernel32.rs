mod common;

use common::{init_tracing, windows_catalog, Scratch};
use sym::SymbolicBitVec;
use symbolic_winload::error::Error;
use symbolic_winload::image::{Image, ImageCatalog};
use symbolic_winload::loader::DynamicLoader;
use symbolic_winload::mem::Memory;
use symbolic_winload::resolver::ProcAddressResolver;
use symbolic_winload::state::ExecutionState;
use symbolic_winload::win32::DynamicLinkingApi;

fn api() -> DynamicLinkingApi<ImageCatalog> {
    DynamicLinkingApi::new(
        DynamicLoader::new(windows_catalog()),
        ProcAddressResolver::default(),
    )
}

#[test]
fn kernel32_scenario() -> symbolic_winload::Result<()> {
    init_tracing();
    let mut api = api();
    let mut state = ExecutionState::new(Memory::new());
    let mut scratch = Scratch::new();

    let name = scratch.c_string(&mut state, "kernel32.dll");
    let handle = api.call("LoadLibraryA", &mut state, &[name])?;
    assert_ne!(handle, 0);

    // Ordinal 5 is not exported
    let address = api.call(
        "GetProcAddress",
        &mut state,
        &[SymbolicBitVec::from(handle), SymbolicBitVec::from(5u64)],
    )?;
    assert_eq!(address, 0);

    let name = scratch.c_string(&mut state, "CreateFileA");
    let address = api.call(
        "GetProcAddress",
        &mut state,
        &[SymbolicBitVec::from(handle), name],
    )?;
    assert_eq!(address, handle + 0x2000);
    assert!(state
        .resolved_procedures()
        .contains("kernel32.CreateFileA"));

    // ntdll was pulled in as a dependency
    let ntdll = state
        .modules()
        .iter()
        .find(|module| module.provenance() == "ntdll")
        .map(|module| module.base());
    assert!(ntdll.is_some_and(|base| base != handle));
    Ok(())
}

#[test]
fn wide_load_and_mangled_lookup() -> symbolic_winload::Result<()> {
    init_tracing();
    let mut api = api();
    let mut state = ExecutionState::new(Memory::new());
    let mut scratch = Scratch::new();

    let name = scratch.wide_string(&mut state, r"C:\Windows\System32\MSVCP140.DLL");
    let handle = api.call(
        "LoadLibraryExW",
        &mut state,
        &[name, SymbolicBitVec::from(0u64), SymbolicBitVec::from(0u32)],
    )?;
    assert_ne!(handle, 0);
    assert_eq!(state.modules().len(), 3);

    let name = scratch.c_string(&mut state, "?init@locale@std@@");
    let address = api.call(
        "GetProcAddress",
        &mut state,
        &[SymbolicBitVec::from(handle), name],
    )?;
    assert_eq!(address, handle + 0x3000);
    assert!(state
        .resolved_procedures()
        .contains("msvcp140.?init@locale@std@@XZ"));
    Ok(())
}

#[test]
fn paths_resolve_independently() -> symbolic_winload::Result<()> {
    init_tracing();
    let mut loaded = Vec::new();
    let mut api = DynamicLinkingApi::new(
        DynamicLoader::with_hook(windows_catalog(), |image: &Image| {
            loaded.push(image.provides.clone())
        }),
        ProcAddressResolver::default(),
    );

    let mut state = ExecutionState::new(Memory::new());
    let mut scratch = Scratch::new();
    let name = scratch.c_string(&mut state, "kernel32.dll");

    // Fork before the library is loaded
    let mut fork = state.clone();

    let handle = api.call("LoadLibraryA", &mut state, &[name.clone()])?;
    let name = scratch.c_string(&mut state, "LoadLibraryA");
    api.call(
        "GetProcAddress",
        &mut state,
        &[SymbolicBitVec::from(handle), name],
    )?;

    // The fork has not loaded kernel32, so the handle is invalid there
    let ordinal = SymbolicBitVec::from(4u64);
    let address = api.call(
        "GetProcAddress",
        &mut fork,
        &[SymbolicBitVec::from(handle), ordinal.clone()],
    )?;
    assert_eq!(address, 0);
    assert!(fork.existing_resolved_procedures().is_none());

    // Loading on the fork yields the same image
    let fork_name = SymbolicBitVec::from(0x7ff0_0000u64);
    assert_eq!(api.call("LoadLibraryA", &mut fork, &[fork_name])?, handle);
    let address = api.call(
        "GetProcAddress",
        &mut fork,
        &[SymbolicBitVec::from(handle), ordinal],
    )?;
    assert_eq!(address, handle + 0x2300);

    assert_eq!(
        fork.resolved_procedures().iter().collect::<Vec<_>>(),
        ["kernel32.ordinal.4"]
    );
    assert_eq!(
        state.resolved_procedures().iter().collect::<Vec<_>>(),
        ["kernel32.LoadLibraryA"]
    );

    drop(api);
    assert_eq!(loaded, ["ntdll.dll", "kernel32.dll"]);
    Ok(())
}

#[test]
fn symbolic_handle_is_not_coerced() {
    init_tracing();
    let mut api = api();
    let mut state = ExecutionState::new(Memory::new());

    let result = api.call(
        "GetProcAddress",
        &mut state,
        &[
            SymbolicBitVec::with_variables(0, 64),
            SymbolicBitVec::from(1u64),
        ],
    );
    match result {
        Err(err @ Error::SymbolicHandle(_)) => assert!(!err.is_recoverable()),
        result => panic!("expected symbolic handle error, got {result:?}"),
    }
}

#[test]
fn forked_path_sees_dependencies() -> symbolic_winload::Result<()> {
    init_tracing();
    let mut api = api();
    let mut state = ExecutionState::new(Memory::new());
    let mut scratch = Scratch::new();
    let name = scratch.c_string(&mut state, "msvcp140.dll");
    let mut fork = state.clone();

    let handle = api.call("LoadLibraryA", &mut state, &[name.clone()])?;
    assert_eq!(api.call("LoadLibraryA", &mut fork, &[name])?, handle);
    assert_eq!(fork.modules().len(), 3);

    // kernel32 came in with msvcp140 and is usable on the fork
    let kernel32 = scratch.c_string(&mut fork, "kernel32");
    let kernel32 = api.call("LoadLibraryA", &mut fork, &[kernel32])?;
    let name = scratch.c_string(&mut fork, "CreateFileA");
    let address = api.call(
        "GetProcAddress",
        &mut fork,
        &[SymbolicBitVec::from(kernel32), name],
    )?;
    assert_eq!(address, kernel32 + 0x2000);
    Ok(())
}
