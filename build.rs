use std::process::Command;

fn main() {
    let commit = git(&["rev-parse", "--short", "HEAD"]);
    let build_time = run("date", &["-u", "+%Y-%m-%dT%H:%M:%SZ"]);
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=AIDIARY_GIT_COMMIT={commit}");
    println!("cargo:rustc-env=AIDIARY_BUILD_TIME={build_time}");
    println!("cargo:rustc-env=AIDIARY_BUILD_TARGET={target}");
    println!("cargo:rustc-env=AIDIARY_BUILD_PROFILE={profile}");

    // 仅在 git HEAD 变化时重新运行
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
}

fn git(args: &[&str]) -> String {
    run("git", args)
}

/// 执行外部命令取 stdout，失败时返回 "unknown"
fn run(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
