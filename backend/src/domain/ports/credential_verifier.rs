//! Port to the external credential store.
//!
//! Password hashing and storage live outside this crate. The domain only
//! needs a yes/no answer for an employee and a candidate password.

use async_trait::async_trait;

use crate::domain::EmployeeId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by credential verifier adapters.
    pub enum CredentialVerifierError {
        /// The credential backend could not be reached.
        Unavailable { message: String } =>
            "credential verifier unavailable: {message}",
    }
}

/// Port answering whether a password matches an employee's credential.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// `true` when `password` is valid for `employee`.
    async fn verify(
        &self,
        employee: EmployeeId,
        password: &str,
    ) -> Result<bool, CredentialVerifierError>;
}

/// Verifier that rejects every password.
///
/// Used when no credential backend is configured so logins fail closed.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectAllCredentials;

#[async_trait]
impl CredentialVerifier for RejectAllCredentials {
    async fn verify(
        &self,
        _employee: EmployeeId,
        _password: &str,
    ) -> Result<bool, CredentialVerifierError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    #[tokio::test]
    async fn reject_all_never_verifies() {
        let verifier = RejectAllCredentials;
        let verified = verifier
            .verify(EmployeeId::new(1), "password")
            .await
            .expect("verifier is infallible");
        assert!(!verified);
    }
}
