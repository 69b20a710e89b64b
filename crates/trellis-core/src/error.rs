use std::fmt;

use crate::model::NodeId;

/// Machine-readable error codes for callers that branch on failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    MissingContext,
    ContextRootNotFound,
    StoreNotFound,
    NoParent,
    ParentVanished,
    TemplateCycle,
    ParentCycle,
    InvalidDate,
    InvalidIdentifier,
    StoreFailure,
    PublishFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::MissingContext => "E1002",
            Self::ContextRootNotFound => "E1003",
            Self::StoreNotFound => "E1004",
            Self::NoParent => "E2001",
            Self::ParentVanished => "E2002",
            Self::TemplateCycle => "E3001",
            Self::ParentCycle => "E3002",
            Self::InvalidDate => "E3003",
            Self::InvalidIdentifier => "E3004",
            Self::StoreFailure => "E5001",
            Self::PublishFailure => "E5002",
        }
    }

    /// Short human-facing summary for logs.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::MissingContext => "Site context is not configured",
            Self::ContextRootNotFound => "Site root node not found",
            Self::StoreNotFound => "Named store not found",
            Self::NoParent => "Node has no parent",
            Self::ParentVanished => "Parent node no longer resolvable",
            Self::TemplateCycle => "Template derivation cycle",
            Self::ParentCycle => "Parent chain cycle",
            Self::InvalidDate => "Malformed date field",
            Self::InvalidIdentifier => "Invalid identifier",
            Self::StoreFailure => "Content store failure",
            Self::PublishFailure => "Publish engine failure",
        }
    }

    /// Optional remediation hint.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .trellis/config.toml and retry."),
            Self::MissingContext => {
                Some("Set [context] root_path and store, or pass an explicit SiteContext.")
            }
            Self::ContextRootNotFound => {
                Some("Check that the configured root path exists in the context store.")
            }
            Self::StoreNotFound => Some("Register the store or fix [publish] target_store."),
            Self::NoParent => Some("Root nodes cannot be deleted and republished; guard the call."),
            Self::ParentVanished => {
                Some("The tree changed concurrently; reload the node and retry.")
            }
            Self::TemplateCycle | Self::ParentCycle => {
                Some("The content store is malformed; repair the offending references.")
            }
            Self::InvalidDate => Some("Use the yyyyMMddTHHmmss encoding or clear the field."),
            Self::InvalidIdentifier | Self::StoreFailure | Self::PublishFailure => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by template, tree, validity, and publication operations.
#[derive(Debug, thiserror::Error)]
pub enum TrellisError {
    /// The project config could not be read, parsed, or overridden.
    #[error("config error: {0:#}")]
    Config(#[source] anyhow::Error),

    /// A configuration-dependent operation ran without its context.
    #[error("site context is missing its {what}")]
    MissingContext { what: &'static str },

    /// The configured site root path does not resolve in the context store.
    #[error("unable to retrieve the node at path '{path}' using the store '{store}'")]
    ContextRootNotFound { path: String, store: String },

    /// A store named by a node or by configuration is not registered.
    #[error("store not found: '{0}'")]
    StoreNotFound(String),

    /// The node is a root and has no parent to republish.
    #[error("node '{0}' has no parent")]
    NoParent(NodeId),

    /// The captured parent could not be resolved when it was needed.
    #[error("parent '{parent}' of node '{node}' is no longer resolvable")]
    ParentVanished { node: NodeId, parent: NodeId },

    /// The template base chain revisits a template.
    #[error("template derivation cycle at '{template_id}' (chain: {})", join_ids(.chain))]
    TemplateCycle {
        template_id: NodeId,
        chain: Vec<NodeId>,
    },

    /// The parent chain revisits a node.
    #[error("parent chain of '{node}' revisits '{repeated}'")]
    ParentCycle { node: NodeId, repeated: NodeId },

    /// A date field is present but not in the store's encoding.
    #[error("field '{field}' holds malformed date '{value}'")]
    InvalidDate { field: String, value: String },

    /// An identifier or language name failed validation.
    #[error("invalid {kind}: '{value}'")]
    InvalidIdentifier { kind: &'static str, value: String },

    /// A content store, registry, or link index call failed.
    #[error("store error: {0:#}")]
    Store(#[source] anyhow::Error),

    /// The publish engine rejected or failed a request.
    #[error("publish error: {0:#}")]
    Publish(#[source] anyhow::Error),
}

impl TrellisError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Config(_) => ErrorCode::ConfigParseError,
            Self::MissingContext { .. } => ErrorCode::MissingContext,
            Self::ContextRootNotFound { .. } => ErrorCode::ContextRootNotFound,
            Self::StoreNotFound(_) => ErrorCode::StoreNotFound,
            Self::NoParent(_) => ErrorCode::NoParent,
            Self::ParentVanished { .. } => ErrorCode::ParentVanished,
            Self::TemplateCycle { .. } => ErrorCode::TemplateCycle,
            Self::ParentCycle { .. } => ErrorCode::ParentCycle,
            Self::InvalidDate { .. } => ErrorCode::InvalidDate,
            Self::InvalidIdentifier { .. } => ErrorCode::InvalidIdentifier,
            Self::Store(_) => ErrorCode::StoreFailure,
            Self::Publish(_) => ErrorCode::PublishFailure,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

impl From<anyhow::Error> for TrellisError {
    fn from(e: anyhow::Error) -> Self {
        Self::Store(e)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = TrellisError> = std::result::Result<T, E>;

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter()
        .map(NodeId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
