use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

// Builds tcpgate-ebpf for bpfel-unknown-none and drops the object in OUT_DIR,
// where bpf.rs embeds it.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let root = manifest_dir.parent().ok_or("tcpgate has no parent directory")?;
    let kernel_crate = root.join("tcpgate-ebpf");

    for watched in [
        kernel_crate.join("src"),
        kernel_crate.join("Cargo.toml"),
        root.join("tcpgate-common").join("src"),
    ] {
        println!("cargo:rerun-if-changed={}", watched.display());
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let target_dir = out_dir.join("tcpgate-ebpf-target");

    // The outer build exports its own toolchain; the inner one must pick up
    // the nightly pin from tcpgate-ebpf/rust-toolchain.toml instead.
    let status = Command::new("cargo")
        .args(["build", "--release"])
        .current_dir(&kernel_crate)
        .env("CARGO_TARGET_DIR", &target_dir)
        .env_remove("RUSTUP_TOOLCHAIN")
        .env_remove("RUSTC")
        .env_remove("RUSTDOC")
        .env_remove("RUSTC_WRAPPER")
        .env_remove("RUSTC_WORKSPACE_WRAPPER")
        .status()
        .map_err(|e| format!("cannot spawn cargo for tcpgate-ebpf: {e}"))?;

    if !status.success() {
        return Err(format!(
            "tcpgate-ebpf did not build ({status}); it needs a nightly toolchain with rust-src and bpf-linker"
        )
        .into());
    }

    let object = target_dir.join("bpfel-unknown-none/release/tcpgate-ebpf");
    fs::copy(&object, out_dir.join("tcpgate.bpf.o"))
        .map_err(|e| format!("missing {}: {e}", object.display()))?;

    Ok(())
}
