// TLS credentials from PEM files
// reason: rustls + rustls-pemfile for mutual TLS between hub and agents

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::server::AllowAnyAuthenticatedClient;
use rustls::{Certificate, ClientConfig, PrivateKey, RootCertStore, ServerConfig};
use rustls_pemfile::Item;
use tracing::debug;

use gpmgmt_core::domain::CredentialPaths;
use gpmgmt_core::port::{Credentials, CredentialsError};

/// Mutual-TLS material loaded fresh from disk on every call
///
/// Holds no mutable state; a load either succeeds or reports exactly which
/// file was missing or unusable.
#[derive(Debug, Clone)]
pub struct TlsCredentials {
    paths: CredentialPaths,
}

impl TlsCredentials {
    pub fn new(paths: CredentialPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &CredentialPaths {
        &self.paths
    }

    fn roots(&self) -> Result<RootCertStore, CredentialsError> {
        let mut roots = RootCertStore::empty();
        for cert in load_certs(&self.paths.ca_certificate, "CA certificate")? {
            roots
                .add(&cert)
                .map_err(|e| CredentialsError::InvalidTls(format!("CA certificate: {}", e)))?;
        }
        Ok(roots)
    }
}

impl Credentials for TlsCredentials {
    type Server = Arc<ServerConfig>;
    type Client = Arc<ClientConfig>;

    fn load_server_credentials(&self) -> Result<Arc<ServerConfig>, CredentialsError> {
        let roots = self.roots()?;
        let certs = load_certs(&self.paths.server_certificate, "server certificate")?;
        let key = load_private_key(&self.paths.server_key, "server key")?;

        let config = ServerConfig::builder()
            .with_safe_defaults()
            .with_client_cert_verifier(AllowAnyAuthenticatedClient::new(roots).boxed())
            .with_single_cert(certs, key)
            .map_err(|e| CredentialsError::InvalidTls(e.to_string()))?;

        debug!(certificate = %self.paths.server_certificate.display(), "Loaded server credentials");
        Ok(Arc::new(config))
    }

    fn load_client_credentials(&self) -> Result<Arc<ClientConfig>, CredentialsError> {
        let roots = self.roots()?;
        let certs = load_certs(&self.paths.client_certificate, "client certificate")?;
        let key = load_private_key(&self.paths.client_key, "client key")?;

        let config = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_client_auth_cert(certs, key)
            .map_err(|e| CredentialsError::InvalidTls(e.to_string()))?;

        debug!(certificate = %self.paths.client_certificate.display(), "Loaded client credentials");
        Ok(Arc::new(config))
    }
}

fn open(path: &Path, kind: &'static str) -> Result<BufReader<File>, CredentialsError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| CredentialsError::Read {
            kind,
            path: path.to_path_buf(),
            source,
        })
}

fn load_certs(path: &Path, kind: &'static str) -> Result<Vec<Certificate>, CredentialsError> {
    let mut reader = open(path, kind)?;
    let certs = rustls_pemfile::certs(&mut reader).map_err(|source| CredentialsError::Read {
        kind,
        path: path.to_path_buf(),
        source,
    })?;

    if certs.is_empty() {
        return Err(missing(kind, path));
    }
    Ok(certs.into_iter().map(Certificate).collect())
}

/// First PKCS#8, RSA or EC key in the file
fn load_private_key(path: &Path, kind: &'static str) -> Result<PrivateKey, CredentialsError> {
    let mut reader = open(path, kind)?;
    let items = rustls_pemfile::read_all(&mut reader).map_err(|source| CredentialsError::Read {
        kind,
        path: path.to_path_buf(),
        source,
    })?;

    items
        .into_iter()
        .find_map(|item| match item {
            Item::PKCS8Key(key) | Item::RSAKey(key) | Item::ECKey(key) => Some(PrivateKey(key)),
            _ => None,
        })
        .ok_or_else(|| missing(kind, path))
}

fn missing(kind: &'static str, path: &Path) -> CredentialsError {
    CredentialsError::Missing {
        kind,
        path: PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn paths_in(dir: &Path) -> CredentialPaths {
        CredentialPaths {
            ca_certificate: dir.join("ca.crt"),
            server_certificate: dir.join("server.crt"),
            server_key: dir.join("server.key"),
            client_certificate: dir.join("client.crt"),
            client_key: dir.join("client.key"),
        }
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let creds = TlsCredentials::new(paths_in(dir.path()));

        let err = creds.load_server_credentials().unwrap_err();

        match err {
            CredentialsError::Read { kind, path, .. } => {
                assert_eq!(kind, "CA certificate");
                assert_eq!(path, dir.path().join("ca.crt"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_file_without_pem_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut ca = File::create(dir.path().join("ca.crt")).unwrap();
        writeln!(ca, "not a certificate").unwrap();
        let creds = TlsCredentials::new(paths_in(dir.path()));

        let err = creds.load_client_credentials().unwrap_err();

        assert!(matches!(err, CredentialsError::Missing { kind: "CA certificate", .. }));
        assert!(err.to_string().contains("ca.crt"));
    }

    #[test]
    fn test_key_file_without_key_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("client.key"), "garbage\n").unwrap();

        let err = load_private_key(&dir.path().join("client.key"), "client key").unwrap_err();

        assert!(matches!(err, CredentialsError::Missing { kind: "client key", .. }));
    }
}
