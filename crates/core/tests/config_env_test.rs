//! Environment loading seen from outside the crate.

use examiner_core::config::{ConfigError, ModelConfig};
use serial_test::serial;
use std::env;

#[test]
#[serial]
fn test_from_env_ignores_dotenv_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".env"), "GROQ_API_KEY=from-dotenv\n").unwrap();

    let previous = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();
    unsafe {
        env::remove_var("GROQ_API_KEY");
        env::remove_var("LLM_PROVIDER");
    }

    let result = ModelConfig::from_env();
    env::set_current_dir(previous).unwrap();

    match result {
        Err(ConfigError::MissingVar(msg)) => assert!(msg.contains("GROQ_API_KEY")),
        other => panic!("expected missing key error, got {:?}", other.map(|_| ())),
    }
    assert!(env::var("GROQ_API_KEY").is_err());
}
