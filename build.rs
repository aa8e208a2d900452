fn main() {
    println!("cargo:rerun-if-changed=assets/index.html");

    // ESP-IDF build environment is only needed when targeting the device.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
