use std::env;

const HINT_VARS: &[&str] = &[
    "VCPKG_ROOT",
    "VCPKGRS_TRIPLET",
    "VCPKG_DEFAULT_TRIPLET",
    "OPENBLAS_DIR",
    "LAPACK_LIB_DIR",
    "LAPACK_LIBS",
    "BLAS_LIB_DIR",
    "BLAS_LIBS",
];

fn split_list(value: &str) -> Vec<String> {
    value
        .split([';', ':', ',', ' '])
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
        .collect()
}

fn link_search(dir: &str) {
    println!("cargo:rustc-link-search=native={dir}");
}

fn link_libs_from(var: &str) -> bool {
    match env::var(var) {
        Ok(libs) => {
            for lib in split_list(&libs) {
                println!("cargo:rustc-link-lib={lib}");
            }
            true
        }
        Err(_) => false,
    }
}

fn main() {
    for var in HINT_VARS {
        println!("cargo:rerun-if-env-changed={var}");
    }

    // The reference kernel needs no native libraries.
    if env::var("CARGO_FEATURE_BLAS_LAPACK").is_err() {
        return;
    }

    // macOS links Accelerate via #[link] in lib.rs
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "macos" {
        return;
    }

    if let Ok(vcpkg_root) = env::var("VCPKG_ROOT") {
        let triplet = env::var("VCPKGRS_TRIPLET")
            .or_else(|_| env::var("VCPKG_DEFAULT_TRIPLET"))
            .unwrap_or_else(|_| "x64-windows".to_string());
        link_search(&format!("{vcpkg_root}/installed/{triplet}/lib"));
    }
    if let Ok(openblas_dir) = env::var("OPENBLAS_DIR") {
        link_search(&format!("{openblas_dir}/lib"));
    }
    if let Ok(dir) = env::var("LAPACK_LIB_DIR") {
        link_search(&dir);
    }
    if let Ok(dir) = env::var("BLAS_LIB_DIR") {
        link_search(&dir);
    }

    if !link_libs_from("LAPACK_LIBS") && target_os == "windows" {
        println!("cargo:rustc-link-lib=lapack");
    }
    if !link_libs_from("BLAS_LIBS") {
        println!("cargo:rustc-link-lib=openblas");
    }
}
