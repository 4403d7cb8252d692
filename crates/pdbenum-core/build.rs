//! Build script for pdbenum-core
//!
//! This script checks build requirements before compilation:
//! - Minimum Rust version (let-else and C-string handling need Rust 1.65.0+)
//! - Target platform (the native symbol backend only exists on Windows)

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::new(1, 65, 0);

        if rustc_version < min_rust_version {
            panic!(
                "pdbenum-core requires Rust {} or newer, found {}",
                min_rust_version, rustc_version
            );
        }
    } else {
        // Some build environments don't expose rustc; don't fail for that
        println!("cargo:warning=could not verify Rust version");
    }

    check_target();
}

fn check_target()
{
    // Build scripts run on the host, so look at the target through cargo's env
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os != "windows" {
        println!(
            "cargo:warning=building pdbenum-core for '{target_os}': the dbghelp backend is Windows-only, only the \
             portable engine will be available"
        );
    }

    let pointer_width = std::env::var("CARGO_CFG_TARGET_POINTER_WIDTH").unwrap_or_default();
    if target_os == "windows" && pointer_width != "64" && pointer_width != "32" {
        panic!("pdbenum-core supports 32-bit and 64-bit Windows targets only, found {pointer_width}-bit");
    }
}
