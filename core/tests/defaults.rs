//! The free-standing `invoke`/`export`/`dispatch` surface, which builds a
//! client from the process-wide defaults. Kept in its own test binary so
//! the global state is not shared with other tests.

use std::time::Duration;

use chimp_core::{ApiMode, ChimpError, Client};
use serde_json::json;

#[test]
fn free_functions_use_process_defaults() {
    chimp_core::set_default_api_key(Some("not a key".to_string()));
    let err = chimp_core::invoke("helper_ping", None).unwrap_err();
    assert!(matches!(err, ChimpError::InvalidCredential { ref raw } if raw == "not a key"));
    assert!(chimp_core::export().is_err());

    chimp_core::set_default_api_key(Some("abc123-us6".to_string()));
    chimp_core::set_default_timeout(Duration::from_secs(2));

    let client = Client::from_defaults().unwrap();
    assert_eq!(client.credential().region(), "us6");
    assert_eq!(client.base_url(), "https://us6.api.mailchimp.com");
    assert_eq!(client.timeout(), Duration::from_secs(2));

    assert_eq!(chimp_core::export().unwrap().mode(), ApiMode::Export);

    // The reserved name is still handled by the forwarded client.
    let err = chimp_core::dispatch("export", vec![json!(1)]).unwrap_err();
    assert!(matches!(err, ChimpError::ArgumentCount { given: 1, expected: 0 }));
    let pending = chimp_core::dispatch("export", Vec::new()).unwrap().into_call().unwrap();
    assert_eq!(pending.mode(), ApiMode::Export);
}
