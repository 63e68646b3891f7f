//! Shared admin password check.

use crate::utils::sha256_hex;

/// Holds the digest of the admin password, never the password itself.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    digest: String,
}

impl AdminAuth {
    pub fn new(password: &str) -> Self {
        Self {
            digest: sha256_hex(password),
        }
    }

    /// Compare digests of the candidate and the configured password.
    pub fn verify(&self, candidate: &str) -> bool {
        !candidate.is_empty() && sha256_hex(candidate) == self.digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify() {
        let auth = AdminAuth::new("buckeyes");
        assert!(auth.verify("buckeyes"));
        assert!(!auth.verify("Buckeyes"));
        assert!(!auth.verify(""));
    }
}
