//! Error types for graph loading with actionable messages.
//!
//! Every error carries:
//! - An error code for programmatic handling
//! - Context about the operation, entity type and navigation involved
//! - Suggestions for fixing the issue
//!
//! # Error Codes
//!
//! Error codes follow a pattern: W{category}{number}
//! - 1xxx: Path and lookup errors (invalid include path, unknown type)
//! - 2xxx: Schema errors (duplicate navigation, bad foreign key)
//! - 3xxx: Fetch errors reported by a batch fetcher
//! - 4xxx: Cancellation
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use weft_core::{ErrorCode, LoadError};
//!
//! let err = LoadError::invalid_path("Blog", "Comments", ["Posts", "Owner"]);
//! assert_eq!(err.code, ErrorCode::InvalidPath);
//! assert!(err.to_string().contains("Comments"));
//! ```
//!
//! Identity conflicts (two fetches disagreeing on the scalars of one entity)
//! are deliberately not represented here: they resolve last-write-wins and
//! are only logged.

use std::fmt;
use thiserror::Error;

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Path errors (1xxx)
    /// Navigation does not exist on the entity type (W1001).
    InvalidPath = 1001,
    /// Entity type is not registered in the schema (W1002).
    UnknownEntityType = 1002,
    /// Include path exceeds the configured depth (W1003).
    IncludeTooDeep = 1003,
    /// Navigation used with the wrong cardinality (W1004).
    CardinalityMismatch = 1004,
    /// Root entity type does not match the inclusion tree (W1005).
    RootTypeMismatch = 1005,
    /// Entity handle does not belong to the session (W1006).
    UnknownEntity = 1006,

    // Schema errors (2xxx)
    /// Navigation registered twice on one type (W2001).
    DuplicateNavigation = 2001,
    /// Foreign key mapping is not valid for the navigation (W2002).
    InvalidForeignKey = 2002,

    // Fetch errors (3xxx)
    /// The batch fetcher failed (W3001).
    FetchFailed = 3001,
    /// The batch fetcher timed out (W3002).
    FetchTimeout = 3002,
    /// The underlying store is unavailable (W3003).
    StoreUnavailable = 3003,

    // Cancellation (4xxx)
    /// The load was cancelled between levels (W4001).
    Cancelled = 4001,

    // Configuration errors (7xxx)
    /// Invalid configuration value (W7001).
    InvalidConfiguration = 7001,
    /// Configuration could not be read or parsed (W7002).
    ConfigParse = 7002,

    // Internal errors (9xxx)
    /// Internal error (W9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "W1001").
    pub fn code(&self) -> String {
        format!("W{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidPath => "Invalid include path",
            Self::UnknownEntityType => "Unknown entity type",
            Self::IncludeTooDeep => "Include path too deep",
            Self::CardinalityMismatch => "Cardinality mismatch",
            Self::RootTypeMismatch => "Root type mismatch",
            Self::UnknownEntity => "Unknown entity",
            Self::DuplicateNavigation => "Duplicate navigation",
            Self::InvalidForeignKey => "Invalid foreign key mapping",
            Self::FetchFailed => "Fetch failed",
            Self::FetchTimeout => "Fetch timed out",
            Self::StoreUnavailable => "Store unavailable",
            Self::Cancelled => "Load cancelled",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::ConfigParse => "Configuration parse error",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The entity type involved.
    pub entity_type: Option<String>,
    /// The navigation involved.
    pub navigation: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur while building inclusion trees or loading graphs.
#[derive(Error, Debug)]
pub struct LoadError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl LoadError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(mut self, text: impl Into<String>, code: impl Into<String>) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the entity type.
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.context.entity_type = Some(entity_type.into());
        self
    }

    /// Set the navigation.
    pub fn with_navigation(mut self, navigation: impl Into<String>) -> Self {
        self.context.navigation = Some(navigation.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create an invalid include path error.
    ///
    /// `available` lists the navigations that do exist on `entity_type`.
    pub fn invalid_path<I, S>(entity_type: impl Into<String>, navigation: impl Into<String>, available: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entity_type = entity_type.into();
        let navigation = navigation.into();
        let available: Vec<String> = available.into_iter().map(|s| s.as_ref().to_string()).collect();

        let err = Self::new(
            ErrorCode::InvalidPath,
            format!("{} has no navigation named '{}'", entity_type, navigation),
        )
        .with_entity_type(&entity_type)
        .with_navigation(&navigation);

        if available.is_empty() {
            err.with_help(format!("{} declares no navigations", entity_type))
        } else {
            err.with_suggestion(format!("Available navigations: {}", available.join(", ")))
        }
    }

    /// Create an unknown entity type error.
    pub fn unknown_entity_type(entity_type: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        Self::new(
            ErrorCode::UnknownEntityType,
            format!("Entity type '{}' is not registered", entity_type),
        )
        .with_entity_type(&entity_type)
        .with_code_suggestion(
            "Register the entity type before building includes",
            format!("schema.register_entity(\"{}\")", entity_type),
        )
    }

    /// Create an include-too-deep error.
    pub fn include_too_deep(path: impl Into<String>, max_depth: usize) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::IncludeTooDeep,
            format!("Include path '{}' exceeds the maximum depth of {}", path, max_depth),
        )
        .with_navigation(&path)
        .with_suggestion("Split the load into an eager include and explicit loads")
        .with_help("Raise max_include_depth in weft.toml if the depth is intended")
    }

    /// Create a cardinality mismatch error.
    pub fn cardinality_mismatch(
        entity_type: impl Into<String>,
        navigation: impl Into<String>,
        expected: &str,
    ) -> Self {
        let entity_type = entity_type.into();
        let navigation = navigation.into();
        Self::new(
            ErrorCode::CardinalityMismatch,
            format!("{}.{} is not a {} navigation", entity_type, navigation, expected),
        )
        .with_entity_type(&entity_type)
        .with_navigation(&navigation)
        .with_suggestion("Use collection() for many-valued and reference() for single-valued navigations")
    }

    /// Create a root type mismatch error.
    pub fn root_type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        let expected = expected.into();
        let found = found.into();
        Self::new(
            ErrorCode::RootTypeMismatch,
            format!("Inclusion tree is rooted at {} but a {} entity was passed as root", expected, found),
        )
        .with_entity_type(&found)
        .with_suggestion(format!("Build the inclusion tree from {}", found))
    }

    /// Create an unknown entity error.
    pub fn unknown_entity(id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::UnknownEntity,
            format!("Entity {} does not belong to this session", id),
        )
        .with_help("Entity handles are only valid inside the session that created them")
    }

    /// Create a duplicate navigation error.
    pub fn duplicate_navigation(entity_type: impl Into<String>, navigation: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        let navigation = navigation.into();
        Self::new(
            ErrorCode::DuplicateNavigation,
            format!("{}.{} is already registered", entity_type, navigation),
        )
        .with_entity_type(&entity_type)
        .with_navigation(&navigation)
    }

    /// Create an invalid foreign key error.
    pub fn invalid_foreign_key(
        entity_type: impl Into<String>,
        navigation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let entity_type = entity_type.into();
        let navigation = navigation.into();
        let message = message.into();
        Self::new(
            ErrorCode::InvalidForeignKey,
            format!("Invalid foreign key for {}.{}: {}", entity_type, navigation, message),
        )
        .with_entity_type(&entity_type)
        .with_navigation(&navigation)
    }

    /// Create a fetch failure error.
    pub fn fetch_failed(navigation: impl Into<String>, message: impl Into<String>) -> Self {
        let navigation = navigation.into();
        let message = message.into();
        Self::new(
            ErrorCode::FetchFailed,
            format!("Fetching {} failed: {}", navigation, message),
        )
        .with_navigation(&navigation)
        .with_help("Levels loaded before the failure remain wired and usable")
    }

    /// Create a fetch timeout error.
    pub fn fetch_timeout(navigation: impl Into<String>, duration_ms: u64) -> Self {
        let navigation = navigation.into();
        Self::new(
            ErrorCode::FetchTimeout,
            format!("Fetching {} timed out after {}ms", navigation, duration_ms),
        )
        .with_navigation(&navigation)
        .with_suggestion("Retry the load; the resolver never retries on its own")
    }

    /// Create a store unavailable error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::StoreUnavailable, format!("Store unavailable: {}", message))
            .with_suggestion("Check that the backing store is reachable")
    }

    /// Create a cancellation error.
    pub fn cancelled(levels_completed: usize) -> Self {
        Self::new(
            ErrorCode::Cancelled,
            format!("Load cancelled after {} completed level(s)", levels_completed),
        )
        .with_help("Navigations wired before cancellation remain valid")
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }

    /// Create a configuration parse error.
    pub fn config_parse(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::ConfigParse, format!("Failed to read configuration: {}", message))
            .with_suggestion("Check weft.toml for typos; unknown keys are rejected")
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
    }

    // ============== Error Checks ==============

    /// Check if this is an include path error raised while building a tree.
    pub fn is_path_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidPath | ErrorCode::UnknownEntityType | ErrorCode::IncludeTooDeep
        )
    }

    /// Check if this error was reported by a batch fetcher.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::FetchFailed | ErrorCode::FetchTimeout | ErrorCode::StoreUnavailable
        )
    }

    /// Check if this is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.code == ErrorCode::Cancelled
    }

    /// Check if retrying the same load may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.code, ErrorCode::FetchTimeout | ErrorCode::StoreUnavailable)
    }

    // ============== Display Functions ==============

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref entity_type) = self.context.entity_type {
            output.push_str(&format!("  → Entity: {}\n", entity_type));
        }
        if let Some(ref navigation) = self.context.navigation {
            output.push_str(&format!("  → Navigation: {}\n", navigation));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!("     ```\n     {}\n     ```\n", code.replace('\n', "\n     ")));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}
