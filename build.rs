fn main() {
    // Propagate ESP-IDF sysenv to dependent build steps. No-op on host
    // builds where the espidf feature is disabled.
    if std::env::var("CARGO_FEATURE_ESPIDF").is_ok() {
        embuild::espidf::sysenv::output();
    }
}
