use std::process::Command;

fn main() {
    if let Ok(target) = std::env::var("TARGET") {
        println!("cargo:rustc-env=FRAMELINK_BUILD_TARGET={target}");
    }

    let git_hash = std::env::var("FRAMELINK_GIT_HASH").ok().or_else(|| {
        Command::new("git")
            .args(["rev-parse", "--short", "HEAD"])
            .output()
            .ok()
            .filter(|output| output.status.success())
            .and_then(|output| String::from_utf8(output.stdout).ok())
            .map(|hash| hash.trim().to_string())
    });
    if let Some(hash) = git_hash.filter(|hash| !hash.is_empty()) {
        println!("cargo:rustc-env=FRAMELINK_GIT_HASH={hash}");
    }

    println!("cargo:rerun-if-env-changed=TARGET");
    println!("cargo:rerun-if-env-changed=FRAMELINK_GIT_HASH");
}
