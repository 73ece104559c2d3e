fn main() {
    // ESP-IDF build configuration, only meaningful when cross-compiling for the device
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    println!("cargo:rerun-if-changed=build.rs");
}
