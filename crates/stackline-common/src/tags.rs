//! Resource tag constants for stackline
//!
//! Every resource stackline creates carries these tags so deployments can be
//! found again from the provider console or CLI.
//!
//! ## Tag Schema
//!
//! | Tag Key | Description |
//! |---------|-------------|
//! | `stackline:tool` | Static identifier ("stackline") |
//! | `stackline:deployment` | Deployment identifier (UUIDv7) |
//! | `stackline:created-at` | RFC 3339 creation timestamp |

/// Tag key for tool identification
pub const TAG_TOOL: &str = "stackline:tool";

/// Tag value for tool identification
pub const TAG_TOOL_VALUE: &str = "stackline";

/// Tag key for the deployment identifier
pub const TAG_DEPLOYMENT: &str = "stackline:deployment";

/// Tag key for creation timestamp (RFC 3339 format)
pub const TAG_CREATED_AT: &str = "stackline:created-at";

/// Helper to format creation timestamp for tags
pub fn format_created_at(time: chrono::DateTime<chrono::Utc>) -> String {
    time.to_rfc3339()
}

/// Helper to parse creation timestamp from tags
pub fn parse_created_at(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

/// Standard key/value pairs applied to every created resource
pub fn standard_tags(deployment_id: &str) -> Vec<(&'static str, String)> {
    vec![
        (TAG_TOOL, TAG_TOOL_VALUE.to_string()),
        (TAG_DEPLOYMENT, deployment_id.to_string()),
        (TAG_CREATED_AT, format_created_at(chrono::Utc::now())),
    ]
}
