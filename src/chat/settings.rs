//! Per-turn settings: model, tone, persona and sampling parameters

use crate::error::BeeChatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default persona key; every persona table contains it
pub const DEFAULT_PERSONA: &str = "Default";

/// Upper bound accepted for `temperature`
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Upper bound accepted for `top_p`
pub const MAX_TOP_P: f32 = 1.0;

/// Completion models this client knows how to address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelId {
    /// `gpt-4o-mini`
    #[default]
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    /// `gpt-4o`
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    /// `gpt-4`
    #[serde(rename = "gpt-4")]
    Gpt4,
    /// `gpt-3.5-turbo`
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
}

impl ModelId {
    /// All supported models, default first
    pub const ALL: [ModelId; 4] = [
        ModelId::Gpt4oMini,
        ModelId::Gpt4o,
        ModelId::Gpt4,
        ModelId::Gpt35Turbo,
    ];

    /// Identifier sent to the completion endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpt4oMini => "gpt-4o-mini",
            Self::Gpt4o => "gpt-4o",
            Self::Gpt4 => "gpt-4",
            Self::Gpt35Turbo => "gpt-3.5-turbo",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = BeeChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| {
                BeeChatError::InvalidInput(format!(
                    "Unsupported model: {}. Must be one of: {}",
                    s,
                    Self::ALL.map(|m| m.as_str()).join(", ")
                ))
            })
    }
}

/// Style directive placed in the system message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tone {
    /// Warm and approachable
    #[default]
    Friendly,
    /// Businesslike
    Professional,
    /// Relaxed
    Casual,
    /// Formal register
    Formal,
    /// Light-hearted
    Humorous,
    /// Compassionate
    Empathetic,
}

impl Tone {
    /// All tone labels, default first
    pub const ALL: [Tone; 6] = [
        Tone::Friendly,
        Tone::Professional,
        Tone::Casual,
        Tone::Formal,
        Tone::Humorous,
        Tone::Empathetic,
    ];

    /// Display label, as embedded in the system message
    pub fn label(&self) -> &'static str {
        match self {
            Self::Friendly => "Friendly",
            Self::Professional => "Professional",
            Self::Casual => "Casual",
            Self::Formal => "Formal",
            Self::Humorous => "Humorous",
            Self::Empathetic => "Empathetic",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Tone {
    type Err = BeeChatError;

    /// Parses a tone label case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                BeeChatError::InvalidInput(format!(
                    "Unknown tone: {}. Must be one of: {}",
                    s,
                    Self::ALL.map(|t| t.label()).join(", ")
                ))
            })
    }
}

/// Settings for a single turn
///
/// Rebuilt by the UI before every submission. The conversation core reads it
/// and never keeps a copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Model to address
    #[serde(default)]
    pub model: ModelId,
    /// Persona key looked up in the persona table
    #[serde(default = "default_persona")]
    pub persona: String,
    /// Tone directive
    #[serde(default)]
    pub tone: Tone,
    /// Maximum tokens in the reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature in `[0, 2]`
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Nucleus sampling mass in `[0, 1]`
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_persona() -> String {
    DEFAULT_PERSONA.to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    1.0
}

fn default_top_p() -> f32 {
    1.0
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            persona: default_persona(),
            tone: Tone::default(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

impl TurnConfig {
    /// Checks the numeric parameters against their documented ranges
    ///
    /// Persona membership is checked against the persona table at submission
    /// time, not here.
    ///
    /// # Examples
    ///
    /// ```
    /// use beechat::chat::TurnConfig;
    ///
    /// let mut config = TurnConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.top_p = 1.5;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), BeeChatError> {
        if self.max_tokens == 0 {
            return Err(BeeChatError::InvalidInput(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        if !self.temperature.is_finite()
            || self.temperature < 0.0
            || self.temperature > MAX_TEMPERATURE
        {
            return Err(BeeChatError::InvalidInput(format!(
                "temperature must be between 0.0 and {:.1}, got {}",
                MAX_TEMPERATURE, self.temperature
            )));
        }

        if !self.top_p.is_finite() || self.top_p < 0.0 || self.top_p > MAX_TOP_P {
            return Err(BeeChatError::InvalidInput(format!(
                "top_p must be between 0.0 and {:.1}, got {}",
                MAX_TOP_P, self.top_p
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_parse_known_ids() {
        assert_eq!("gpt-4o-mini".parse::<ModelId>().unwrap(), ModelId::Gpt4oMini);
        assert_eq!("GPT-4".parse::<ModelId>().unwrap(), ModelId::Gpt4);
        assert_eq!(
            " gpt-3.5-turbo ".parse::<ModelId>().unwrap(),
            ModelId::Gpt35Turbo
        );
    }

    #[test]
    fn test_model_parse_unknown_is_invalid_input() {
        let err = "claude-9".parse::<ModelId>().unwrap_err();
        assert!(matches!(err, BeeChatError::InvalidInput(_)));
        assert!(err.to_string().contains("gpt-4o-mini"));
    }

    #[test]
    fn test_model_serde_uses_wire_names() {
        let yaml = serde_yaml::to_string(&ModelId::Gpt4o).unwrap();
        assert_eq!(yaml.trim(), "gpt-4o");
        let parsed: ModelId = serde_yaml::from_str("gpt-3.5-turbo").unwrap();
        assert_eq!(parsed, ModelId::Gpt35Turbo);
    }

    #[test]
    fn test_tone_parse_case_insensitive() {
        assert_eq!("friendly".parse::<Tone>().unwrap(), Tone::Friendly);
        assert_eq!("HUMOROUS".parse::<Tone>().unwrap(), Tone::Humorous);
        assert!("grumpy".parse::<Tone>().is_err());
    }

    #[test]
    fn test_turn_config_defaults() {
        let config = TurnConfig::default();
        assert_eq!(config.model, ModelId::Gpt4oMini);
        assert_eq!(config.persona, "Default");
        assert_eq!(config.tone, Tone::Friendly);
        assert_eq!(config.max_tokens, 1024);
        assert!((config.temperature - 1.0).abs() < f32::EPSILON);
        assert!((config.top_p - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_validate_rejects_zero_max_tokens() {
        let config = TurnConfig {
            max_tokens: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BeeChatError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_temperature_bounds() {
        let mut config = TurnConfig::default();
        config.temperature = 0.0;
        assert!(config.validate().is_ok());
        config.temperature = 2.0;
        assert!(config.validate().is_ok());
        config.temperature = 2.1;
        assert!(config.validate().is_err());
        config.temperature = -0.1;
        assert!(config.validate().is_err());
        config.temperature = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_top_p_bounds() {
        let mut config = TurnConfig::default();
        config.top_p = 0.0;
        assert!(config.validate().is_ok());
        config.top_p = 1.01;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_turn_config_partial_yaml_uses_defaults() {
        let config: TurnConfig = serde_yaml::from_str("tone: Casual\nmax_tokens: 200\n").unwrap();
        assert_eq!(config.tone, Tone::Casual);
        assert_eq!(config.max_tokens, 200);
        assert_eq!(config.persona, "Default");
    }
}
