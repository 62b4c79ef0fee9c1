//! Build script for nftctx
//!
//! Embeds build-time information (git commit, dirty status, build timestamp)
//! and, with the `native` feature, generates bindings for `libnftables.h`.

fn main() {
    // Re-run build if these environment variables change
    println!("cargo:rerun-if-env-changed=NFTCTX_LIBNFTABLES_INCLUDE");

    #[cfg(feature = "native")]
    generate_bindings();

    // Embed git commit, build time, and dirty status
    shadow_rs::ShadowBuilder::builder()
        .build()
        .expect("Failed to generate build info");
}

/// Generates `libnftables.rs` in `OUT_DIR` from the installed header.
///
/// The output flag constants are taken from the header so that they always
/// match the library the binary links against.
#[cfg(feature = "native")]
fn generate_bindings() {
    println!("cargo:rustc-link-lib=nftables");

    let mut builder = bindgen::Builder::default()
        .header_contents("wrapper.h", "#include <nftables/libnftables.h>\n")
        .allowlist_function("nft_.*")
        .allowlist_type("nft_.*")
        .allowlist_var("NFT_.*")
        .parse_callbacks(Box::new(bindgen::CargoCallbacks::new()));

    // Distro packagers with a non-standard prefix can point at the header dir
    if let Ok(dir) = std::env::var("NFTCTX_LIBNFTABLES_INCLUDE") {
        builder = builder.clang_arg(format!("-I{dir}"));
    }

    let bindings = builder
        .generate()
        .expect("Failed to generate libnftables bindings");

    let out = std::path::PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR not set"));
    bindings
        .write_to_file(out.join("libnftables.rs"))
        .expect("Failed to write libnftables bindings");
}
