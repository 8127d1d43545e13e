// Build provenance for `ethlink version --extended`.
fn main() {
    for (source, exported) in [
        ("TARGET", "ETHLINK_BUILD_TARGET"),
        ("PROFILE", "ETHLINK_BUILD_PROFILE"),
    ] {
        if let Ok(value) = std::env::var(source) {
            println!("cargo:rustc-env={exported}={value}");
        }
        println!("cargo:rerun-if-env-changed={source}");
    }
}
