//! Build script: embeds the git short hash for the version string.

use std::process::Command;

fn main() {
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
    {
        if output.status.success() {
            let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
            println!("cargo:rustc-env=GIT_HASH={}", hash);
        }
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");

    if cfg!(feature = "cuda") {
        check_tool("nvcc", &["--version"], "CUDA toolkit", "cuda");
    }
    if cfg!(feature = "vulkan") {
        check_tool("vulkaninfo", &["--summary"], "Vulkan SDK", "vulkan");
    }
}

/// Fail early with a readable message when a GPU toolkit is missing,
/// before whisper-rs-sys starts its cmake build.
fn check_tool(tool: &str, args: &[&str], name: &str, feature: &str) {
    match Command::new(tool).args(args).output() {
        Ok(out) if out.status.success() => {
            println!("cargo::warning={name} detected");
        }
        _ => panic!(
            "\n\n`{tool}` not found ({name} is not installed).\n\
             Build without it: cargo build --release (drop --features {feature})\n"
        ),
    }
}
