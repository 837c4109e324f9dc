use thiserror::Error;

/// Errors surfaced by the Graph client helpers.
///
/// Every transport failure is folded into the single [`GraphError::Api`]
/// kind, tagged with the workflow-node name the client was built for.
#[derive(Debug, Error)]
pub enum GraphError {
    // `anyhow::Error` is not a std Error, so the cause is folded into the
    // message rather than exposed through source().
    #[error("Microsoft Graph request failed in node \"{node}\": {cause}")]
    Api { node: String, cause: anyhow::Error },

    /// A paged response had no item list under the expected property.
    #[error("paged response carries no \"{property}\" item list")]
    MalformedPage { property: String },

    #[error("failed to decode Graph response")]
    Decode(#[from] serde_json::Error),
}
