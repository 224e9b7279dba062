// Build script that tries to generate a C header with `cbindgen`.
// If `cbindgen` is not available, it falls back to copying the
// checked-in `include/synthgraph.h` to $OUT_DIR.

use std::{env, fs, path::PathBuf, process::Command};

fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=include/synthgraph.h");

    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));
    let header_repo = crate_dir.join("include").join("synthgraph.h");
    let header_out = out_dir.join("synthgraph.h");

    let cbindgen_ok = Command::new("cbindgen")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    if cbindgen_ok {
        let status = Command::new("cbindgen")
            .args(["--crate", "synthgraph-ffi", "--lang", "C", "--output"])
            .arg(&header_out)
            .current_dir(&crate_dir)
            .status();
        if matches!(status, Ok(s) if s.success()) {
            println!("cargo:warning=synthgraph-ffi: generated header with cbindgen -> {}", header_out.display());
            return;
        }
        println!("cargo:warning=synthgraph-ffi: cbindgen failed; falling back to checked-in header");
    }

    if header_repo.exists() {
        fs::copy(&header_repo, &header_out).expect("failed to copy include/synthgraph.h to OUT_DIR");
    } else {
        let placeholder = b"/* synthgraph.h placeholder: install cbindgen or keep include/synthgraph.h checked in */\n";
        fs::write(&header_out, placeholder).expect("failed to write placeholder header");
    }
}
