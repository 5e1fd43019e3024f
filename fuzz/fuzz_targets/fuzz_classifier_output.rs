#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let labels: Vec<String> = ["background", "banana"].into_iter().map(String::from).collect();
    let _ = nutri_hardware::inference::parse_predictions(data, Some(&labels));
    let _ = nutri_hardware::parse_weight_frame(data);
});
