//! Persona table
//!
//! A persona is a named instruction that shapes the assistant's behavior. The
//! table always contains a `Default` entry; configuration may add personas or
//! replace the text of existing ones.

use crate::chat::settings::DEFAULT_PERSONA;
use crate::error::BeeChatError;
use std::collections::BTreeMap;

const BUILTIN_PERSONAS: &[(&str, &str)] = &[
    ("Analytical", "Provide detailed, logical analyses."),
    (
        "Business_Consultant",
        "Offer strategic business advice and insights.",
    ),
    ("Chef", "Share cooking tips, recipes, and culinary advice."),
    (
        "Code_Reviewer",
        "Analyze code snippets for best practices and potential bugs.",
    ),
    ("Concise", "Give brief, to-the-point responses."),
    ("Creative", "Offer imaginative and original responses."),
    (DEFAULT_PERSONA, "Act as a helpful assistant."),
];

/// Read-only mapping from persona key to instruction text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaTable {
    entries: BTreeMap<String, String>,
}

impl PersonaTable {
    /// Built-in personas only
    ///
    /// # Examples
    ///
    /// ```
    /// use beechat::persona::PersonaTable;
    ///
    /// let personas = PersonaTable::builtin();
    /// assert_eq!(personas.get("Default"), Some("Act as a helpful assistant."));
    /// ```
    pub fn builtin() -> Self {
        let entries = BUILTIN_PERSONAS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { entries }
    }

    /// Built-in personas extended (or overridden) by custom entries
    ///
    /// # Errors
    ///
    /// Returns `Config` if a custom key or instruction is blank.
    pub fn with_overrides<'a, I>(custom: I) -> Result<Self, BeeChatError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut table = Self::builtin();
        for (key, instruction) in custom {
            let key = key.trim();
            if key.is_empty() {
                return Err(BeeChatError::Config(
                    "persona names cannot be empty".to_string(),
                ));
            }
            if instruction.trim().is_empty() {
                return Err(BeeChatError::Config(format!(
                    "persona '{}' has an empty instruction",
                    key
                )));
            }
            tracing::debug!(persona = %key, "Registering custom persona");
            table.entries.insert(key.to_string(), instruction.clone());
        }
        Ok(table)
    }

    /// Instruction text for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Instruction text for `key`, or `InvalidInput` if unknown
    pub fn require(&self, key: &str) -> Result<&str, BeeChatError> {
        self.get(key).ok_or_else(|| {
            BeeChatError::InvalidInput(format!(
                "Unknown persona: {}. Available: {}",
                key,
                self.keys().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Whether `key` is present
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Persona keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(key, instruction)` pairs in sorted key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of personas
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; the table holds at least `Default`
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PersonaTable {
    fn default() -> Self {
        Self::builtin()
    }
}
