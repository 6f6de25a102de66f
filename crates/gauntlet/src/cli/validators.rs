//! Argument validators for CLI parsing.

/// Validates a `--plugin` specification at parse time.
///
/// The format is `registry:Entrypoint`; both halves must be non-empty.
/// Whether the registry and entrypoint actually resolve is checked later,
/// against the linked-in plugin registry.
///
/// # Errors
///
/// Returns a human-readable message for clap to display.
pub fn validate_plugin_spec(spec: &str) -> Result<String, String> {
    match spec.split_once(':') {
        Some((registry, entrypoint)) if !registry.is_empty() && !entrypoint.is_empty() => {
            Ok(spec.to_string())
        }
        _ => Err("plugin specification must be in 'registry:Entrypoint' format".to_string()),
    }
}
