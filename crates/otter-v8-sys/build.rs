use std::env;
use std::fs;
use std::path::{Path, PathBuf};

// Prebuilt V8 (headers + static monolith) published with v8go tags.
// Update this together with the compile definitions below.
const V8_ARCHIVE_VERSION: &str = "0.9.0";

const BRIDGE_SOURCES: &[&str] = &[
    "src/bridge/otter_v8.cc",
    "src/bridge/values.cc",
    "src/bridge/templates.cc",
    "src/bridge/profiler.cc",
    "src/bridge/snapshot.cc",
];

fn main() {
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap();
    let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap();

    println!("cargo:rerun-if-env-changed=OTTER_V8_DIR");
    println!("cargo:rerun-if-env-changed=OTTER_V8_ARCHIVE_URL");
    println!("cargo:rerun-if-env-changed=OTTER_V8_VERSION");
    println!("cargo:rerun-if-changed=src/bridge/otter_v8.h");
    println!("cargo:rerun-if-changed=src/bridge/internal.h");
    for source in BRIDGE_SOURCES {
        println!("cargo:rerun-if-changed={}", source);
    }

    let platform = match (target_os.as_str(), target_arch.as_str()) {
        ("linux", "x86_64") => "linux_x86_64",
        ("linux", "aarch64") => "linux_arm64",
        ("macos", "x86_64") => "darwin_x86_64",
        ("macos", "aarch64") => "darwin_arm64",
        _ => panic!("Unsupported target for V8: {}-{}", target_os, target_arch),
    };

    let v8 = match env::var("OTTER_V8_DIR") {
        Ok(dir) => V8Layout::from_dir(PathBuf::from(dir)),
        Err(_) => V8Layout::from_archive(&download_v8(), platform),
    };

    compile_bridge(&v8.include_dir);
    link_v8(&v8.lib_dir, &target_os);
}

struct V8Layout {
    include_dir: PathBuf,
    lib_dir: PathBuf,
}

impl V8Layout {
    /// A user-provided build: `<dir>/include` plus a static library in
    /// `<dir>/lib` or `<dir>` itself.
    fn from_dir(dir: PathBuf) -> Self {
        let include_dir = dir.join("include");
        if !include_dir.join("v8.h").exists() {
            panic!("OTTER_V8_DIR has no include/v8.h: {}", dir.display());
        }
        let lib_dir = if dir.join("lib").exists() {
            dir.join("lib")
        } else {
            dir.clone()
        };
        Self {
            include_dir,
            lib_dir,
        }
    }

    /// The v8go source archive keeps headers in `deps/include` and one static
    /// library per platform in `deps/<platform>`.
    fn from_archive(root: &Path, platform: &str) -> Self {
        let deps = find_deps_dir(root);
        Self {
            include_dir: deps.join("include"),
            lib_dir: deps.join(platform),
        }
    }
}

fn download_v8() -> PathBuf {
    let version =
        env::var("OTTER_V8_VERSION").unwrap_or_else(|_| V8_ARCHIVE_VERSION.to_string());

    let cache_dir = get_cache_dir();
    let v8_dir = cache_dir.join(&version);

    let marker = v8_dir.join(".downloaded");
    if marker.exists() {
        println!("cargo:warning=Using cached V8 from {}", v8_dir.display());
        return v8_dir;
    }

    let url = env::var("OTTER_V8_ARCHIVE_URL").unwrap_or_else(|_| {
        format!(
            "https://github.com/rogchap/v8go/archive/refs/tags/v{}.tar.gz",
            version
        )
    });

    println!("cargo:warning=Downloading V8 from {}", url);

    fs::create_dir_all(&v8_dir).expect("Failed to create cache directory");

    let response = ureq::get(&url)
        .call()
        .unwrap_or_else(|e| panic!("Failed to download V8: {}. URL: {}", e, url));

    // Stream into the tar decoder; the static library is several hundred MB
    let reader = response.into_body().into_reader();
    let tar_gz = flate2::read::GzDecoder::new(reader);
    let mut archive = tar::Archive::new(tar_gz);

    archive
        .unpack(&v8_dir)
        .expect("Failed to extract V8 archive");

    fs::write(&marker, "").expect("Failed to create marker file");

    println!("cargo:warning=V8 extracted to {}", v8_dir.display());

    v8_dir
}

fn compile_bridge(include_dir: &Path) {
    let mut build = cc::Build::new();
    build
        .cpp(true)
        .std("c++17")
        .include(include_dir)
        .include("src/bridge")
        .flag_if_supported("-fno-rtti")
        .flag_if_supported("-fPIC")
        .flag_if_supported("-Wno-unused-parameter")
        // Must match the configuration the static library was built with
        .define("V8_COMPRESS_POINTERS", None)
        .define("V8_31BIT_SMIS_ON_64BIT_ARCH", None)
        .define("V8_ENABLE_SANDBOX", None);

    for source in BRIDGE_SOURCES {
        build.file(source);
    }

    build.compile("otter_v8_bridge");
}

fn link_v8(lib_dir: &Path, target_os: &str) {
    println!("cargo:rustc-link-search=native={}", lib_dir.display());

    if lib_exists(lib_dir, "v8_monolith") {
        println!("cargo:rustc-link-lib=static=v8_monolith");
    } else if lib_exists(lib_dir, "v8") {
        println!("cargo:rustc-link-lib=static=v8");
    } else {
        panic!("No static V8 library found in {}", lib_dir.display());
    }

    match target_os {
        "linux" => {
            println!("cargo:rustc-link-lib=stdc++");
            println!("cargo:rustc-link-lib=dl");
            println!("cargo:rustc-link-lib=pthread");
            println!("cargo:rustc-link-lib=m");
        }
        "macos" => {
            println!("cargo:rustc-link-lib=c++");
        }
        _ => {}
    }
}

fn find_deps_dir(root: &Path) -> PathBuf {
    let direct = root.join("deps");
    if direct.join("include").exists() {
        return direct;
    }

    // GitHub tag archives extract to `<repo>-<version>/`
    if let Ok(entries) = fs::read_dir(root) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() && path.join("deps").join("include").exists() {
                return path.join("deps");
            }
        }
    }

    panic!("V8 archive has no deps/include directory: {}", root.display());
}

fn lib_exists(lib_dir: &Path, lib_name: &str) -> bool {
    let file_name = format!("lib{}.a", lib_name);
    lib_dir.join(file_name).exists()
}

fn get_cache_dir() -> PathBuf {
    if let Ok(cargo_home) = env::var("CARGO_HOME") {
        return PathBuf::from(cargo_home).join("cache").join("otter-v8");
    }

    if let Ok(home) = env::var("HOME") {
        return PathBuf::from(home)
            .join(".cargo")
            .join("cache")
            .join("otter-v8");
    }

    PathBuf::from(env::var("OUT_DIR").unwrap()).join("otter-v8-cache")
}
