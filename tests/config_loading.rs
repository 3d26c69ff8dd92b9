mod common;

use beechat::chat::{ContextPolicy, ModelId, Tone};
use beechat::config::{Config, TurnOverrides};
use common::temp_config_file;
use serial_test::serial;

#[test]
#[serial]
fn test_load_file_then_cli_overrides() {
    let (_dir, path) = temp_config_file(
        r#"
chat:
  model: gpt-4
  tone: Professional
  persona: Pirate
  context:
    policy: recent
    recent_messages: 4
personas:
  Pirate: "Answer like a pirate."
"#,
    );

    let mut config = Config::load(path.to_str().unwrap()).unwrap();
    assert_eq!(config.chat.turn.model, ModelId::Gpt4);
    assert_eq!(config.chat.context.policy(), ContextPolicy::Recent(4));
    config.validate().unwrap();

    let personas = config.persona_table().unwrap();
    assert_eq!(personas.get("Pirate"), Some("Answer like a pirate."));
    assert!(personas.contains("Default"));

    config
        .apply_overrides(&TurnOverrides {
            tone: Some("empathetic".to_string()),
            max_tokens: Some(256),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(config.chat.turn.tone, Tone::Empathetic);
    assert_eq!(config.chat.turn.max_tokens, 256);
    assert_eq!(config.chat.turn.model, ModelId::Gpt4);
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let (_dir, path) = temp_config_file("chat:\n  model: gpt-4\n");
    std::env::set_var("BEECHAT_MODEL", "gpt-3.5-turbo");
    std::env::set_var("BEECHAT_TEMPERATURE", "0.25");

    let config = Config::load(path.to_str().unwrap());

    std::env::remove_var("BEECHAT_MODEL");
    std::env::remove_var("BEECHAT_TEMPERATURE");

    let config = config.unwrap();
    assert_eq!(config.chat.turn.model, ModelId::Gpt35Turbo);
    assert!((config.chat.turn.temperature - 0.25).abs() < f32::EPSILON);
}

#[test]
#[serial]
fn test_invalid_file_values_fail_validation() {
    let (_dir, path) = temp_config_file("chat:\n  top_p: 3.0\n");
    let config = Config::load(path.to_str().unwrap()).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("top_p"));
}
