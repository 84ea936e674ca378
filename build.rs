fn main() {
    println!("cargo:rerun-if-env-changed=DUDE_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=DUDE_WIFI_PASSWORD");

    // Host builds (tests, fuzzing) have no ESP-IDF toolchain to describe.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
