// Credentials Provider Port
// Transport security material for hub/agent RPC

use std::path::PathBuf;

use thiserror::Error;

/// Credential loading errors
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("Failed to read {kind} from {path}: {source}")]
    Read {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No {kind} found in {path}")]
    Missing { kind: &'static str, path: PathBuf },

    #[error("Invalid TLS configuration: {0}")]
    InvalidTls(String),

    #[error("{0}")]
    Injected(String),
}

/// Credentials provider trait
///
/// The associated types are opaque to this layer; the transport decides
/// what a server or client credential is.
///
/// Implementations:
/// - TlsCredentials (infra-system): PEM files into rustls configs
/// - mocks::MockCredentials: canned material with error injection
pub trait Credentials: Send + Sync {
    type Server;
    type Client;

    /// Load material for the listening (hub or agent server) side
    ///
    /// # Errors
    /// - CredentialsError::Read if a configured file cannot be read
    /// - CredentialsError::Missing if a file holds no usable PEM block
    /// - CredentialsError::InvalidTls if the material is rejected
    fn load_server_credentials(&self) -> Result<Self::Server, CredentialsError>;

    /// Load material for the connecting side
    fn load_client_credentials(&self) -> Result<Self::Client, CredentialsError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Mock credentials returning canned material or an injected error
    pub struct MockCredentials<S: Clone, C: Clone = S> {
        server: S,
        client: C,
        err: Mutex<Option<String>>,
    }

    impl<S: Clone, C: Clone> MockCredentials<S, C> {
        pub fn new(server: S, client: C) -> Self {
            Self {
                server,
                client,
                err: Mutex::new(None),
            }
        }

        /// Make every subsequent load fail with `message`
        pub fn set_creds_error(&self, message: impl Into<String>) {
            *self.err.lock().unwrap() = Some(message.into());
        }

        pub fn reset_creds_error(&self) {
            *self.err.lock().unwrap() = None;
        }

        fn check(&self) -> Result<(), CredentialsError> {
            match self.err.lock().unwrap().as_ref() {
                Some(message) => Err(CredentialsError::Injected(message.clone())),
                None => Ok(()),
            }
        }
    }

    impl<S, C> Credentials for MockCredentials<S, C>
    where
        S: Clone + Send + Sync,
        C: Clone + Send + Sync,
    {
        type Server = S;
        type Client = C;

        fn load_server_credentials(&self) -> Result<S, CredentialsError> {
            self.check()?;
            Ok(self.server.clone())
        }

        fn load_client_credentials(&self) -> Result<C, CredentialsError> {
            self.check()?;
            Ok(self.client.clone())
        }
    }
}
