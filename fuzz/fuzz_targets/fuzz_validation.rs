//! Fuzz target for registration body handling.
//!
//! Arbitrary bytes go through the same path as a `POST /students` body,
//! then through the worker's payload parsing. Neither may panic, and
//! whatever the API accepts the worker must be able to persist.
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use student_relay::models::NewStudent;
use student_relay::validation::{parse_json_body, validate_submission};

fuzz_target!(|data: &[u8]| {
    let accepted = parse_json_body(data)
        .ok()
        .and_then(|body| validate_submission(&body).ok());

    let consumed = NewStudent::from_payload(data);

    if let Some(student) = accepted {
        assert_eq!(consumed.ok(), Some(student));
    }
});
