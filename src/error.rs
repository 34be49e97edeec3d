use thiserror::Error;

/// Main error type for the retro-skin engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Theme error: {0}")]
    Theme(#[from] ThemeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Failures raised by the host document handle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Node {id} is no longer part of the document")]
    NodeGone { id: u64 },

    #[error("Document has no root element")]
    MissingRoot,

    #[error("Host policy refused {action}: {reason}")]
    PolicyRestricted { action: String, reason: String },

    #[error("Invalid operation: {details}")]
    InvalidOperation { details: String },
}

/// Asset resolution and loading errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Asset not found: {url}")]
    NotFound { url: String },

    #[error("Asset could not be decoded: {url} - {reason}")]
    Undecodable { url: String, reason: String },

    #[error("Asset fetch blocked by policy: {url}")]
    Blocked { url: String },

    #[error("Procedural render failed: {reason}")]
    RenderFailed { reason: String },
}

/// Audio output errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("Audio output disallowed by host: {reason}")]
    Disallowed { reason: String },

    #[error("Audio device unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Theme catalog errors
#[derive(Error, Debug)]
pub enum ThemeError {
    #[error("Theme not found: {id}")]
    NotFound { id: String },

    #[error("Failed to parse theme catalog: {path} - {reason}")]
    ParseFailed { path: String, reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Settings store errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {path} - {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Failed to write settings: {path} - {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Malformed settings payload: {reason}")]
    Malformed { reason: String },
}

/// Convenience type alias for Results using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Result alias for document handle operations
pub type DomResult<T> = std::result::Result<T, DomError>;

/// Coarse classification used when logging failures at an entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    PolicyRestriction,
    Generic,
}

impl EngineError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Whether the host environment refused the operation.
    ///
    /// Policy restrictions downgrade a single feature; everything else keeps running.
    pub fn is_policy_restriction(&self) -> bool {
        matches!(
            self,
            Self::Dom(DomError::PolicyRestricted { .. })
                | Self::Asset(AssetError::Blocked { .. })
                | Self::Audio(AudioError::Disallowed { .. })
        )
    }

    pub fn class(&self) -> FailureClass {
        if self.is_policy_restriction() {
            FailureClass::PolicyRestriction
        } else {
            FailureClass::Generic
        }
    }

    /// Whether the failing node simply vanished between query and mutation
    pub fn is_node_gone(&self) -> bool {
        matches!(self, Self::Dom(DomError::NodeGone { .. }))
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Dom(DomError::MissingRoot) => {
                "This page has no document root, so the theme cannot be applied.".to_string()
            }
            Self::Dom(DomError::PolicyRestricted { action, .. }) => {
                format!("The page's security policy blocked '{}'; that effect was skipped.", action)
            }
            Self::Audio(AudioError::Disallowed { .. }) => {
                "Sound effects are blocked on this page.".to_string()
            }
            Self::Theme(ThemeError::NotFound { id }) => {
                format!("Theme '{}' not found. Available themes: geocities, windows95, vaporwave, terminal", id)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_classification() {
        let err: EngineError = DomError::PolicyRestricted {
            action: "set style".to_string(),
            reason: "CSP".to_string(),
        }
        .into();
        assert!(err.is_policy_restriction());
        assert_eq!(err.class(), FailureClass::PolicyRestriction);

        let err: EngineError = AudioError::Disallowed { reason: "no gesture".to_string() }.into();
        assert!(err.is_policy_restriction());

        let err: EngineError = DomError::NodeGone { id: 7 }.into();
        assert!(!err.is_policy_restriction());
        assert!(err.is_node_gone());
        assert_eq!(err.class(), FailureClass::Generic);
    }

    #[test]
    fn test_error_display() {
        let err = EngineError::generic("boom");
        assert_eq!(err.to_string(), "Generic error: boom");

        let err: EngineError = DomError::MissingRoot.into();
        assert_eq!(err.to_string(), "Document error: Document has no root element");
        assert!(err.user_message().contains("no document root"));
    }
}
