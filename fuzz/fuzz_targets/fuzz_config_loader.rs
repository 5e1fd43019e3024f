#![no_main]
use libfuzzer_sys::fuzz_target;

// Parsing and validation must reject bad input without panicking.
fuzz_target!(|data: &str| {
    if let Ok(cfg) = nutri_config::load_toml(data) {
        let _ = cfg.validate();
    }
});
