use chrono::Utc;

fn main() {
    // Build timestamp shown by `datasweep --version` / 构建时间
    let build_time = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    println!("cargo:rustc-env=DATASWEEP_BUILD_TIME={}", build_time);

    println!("cargo:rerun-if-changed=build.rs");
}
