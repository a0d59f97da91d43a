//! Crate identity sent to brokers as the request header's `client_id`.

/// `<crate-name>-rs/<version>`, the client id sent when the caller does not override one.
pub const DEFAULT_CLIENT_ID: &str = concat!(env!("CARGO_PKG_NAME"), "-rs/", env!("CARGO_PKG_VERSION"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_client_id_is_nonempty() {
        assert!(!DEFAULT_CLIENT_ID.is_empty());
        assert!(DEFAULT_CLIENT_ID.contains('/'));
    }
}
