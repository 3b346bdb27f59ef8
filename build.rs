use std::process::Command;

fn main() {
    let commit = std::env::var("GIT_COMMIT_SHA").ok().or_else(|| {
        Command::new("git")
            .args(["rev-parse", "--short", "HEAD"])
            .output()
            .ok()
            .and_then(|output| String::from_utf8(output.stdout).ok())
    });
    println!(
        "cargo:rustc-env=COMMIT_HASH={}",
        commit.unwrap_or_default().trim()
    );
}
