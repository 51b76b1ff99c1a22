//! Error types for the automoc pass.

use kiln_common::InternalError;
use kiln_graph::ProductId;
use kiln_scan::ScanError;

/// Errors a [`RulesApplicator`](crate::RulesApplicator) may report.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A rule could not be instantiated for an input.
    #[error("rule for tag '{tag}' failed on {input}: {reason}")]
    Failed {
        /// The tag whose rule failed.
        tag: String,
        /// Path of the input artifact.
        input: String,
        /// What went wrong.
        reason: String,
    },

    /// The graph rejected a mutation.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Errors that abort an automoc pass.
#[derive(Debug, thiserror::Error)]
pub enum AutomocError {
    /// Scanner configuration is unusable.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Rule application failed.
    #[error("applying moc rules for '{product}' failed: {source}")]
    Rules {
        /// Name of the product being processed.
        product: String,
        /// The underlying failure.
        #[source]
        source: RuleError,
    },

    /// The product is not in the graph.
    #[error("product {0} does not exist")]
    UnknownProduct(ProductId),

    /// The graph rejected a mutation.
    #[error(transparent)]
    Internal(#[from] InternalError),
}
