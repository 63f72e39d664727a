//! Machine identity sent to the receiver in the `connect` payload.

/// Supplies the display name the receiver's operator sees when approving.
#[cfg_attr(test, mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    fn pc_name(&self) -> String;
}

/// Uses the OS hostname, or `"Unknown"` if it cannot be read.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostnameIdentity;

impl IdentityProvider for HostnameIdentity {
    fn pc_name(&self) -> String {
        hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .ok()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Picks the `--name` override when it is non-blank, otherwise asks
/// `identity`.
pub fn resolve_pc_name(name_override: Option<String>, identity: &dyn IdentityProvider) -> String {
    match name_override {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => identity.pc_name(),
    }
}
