//! TLS material loading
//!
//! The client to gateway hop is mutually authenticated TLS 1.3. Both
//! sides build their rustls configuration from PEM files: a certificate
//! chain, its private key and the CA bundle used to verify the peer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::pem::{self, PemObject};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use thiserror::Error;

/// Errors while loading TLS material
#[derive(Error, Debug)]
pub enum TlsError {
    /// PEM file unreadable
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed PEM
    #[error("Invalid PEM in {path}: {message}")]
    Pem { path: PathBuf, message: String },

    /// File holds no certificates
    #[error("No certificates found in {0}")]
    NoCertificates(PathBuf),

    /// File holds no private key
    #[error("No private key found in {0}")]
    NoPrivateKey(PathBuf),

    /// rustls rejected the material
    #[error("TLS configuration error: {0}")]
    Rustls(#[from] rustls::Error),

    /// Client verifier could not be built from the CA bundle
    #[error("Invalid CA bundle: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Install ring as the process-wide crypto provider.
///
/// Libraries that build their own rustls configs fall back to the process
/// default; a second call is a no-op.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

fn read(path: &Path) -> Result<Vec<u8>, TlsError> {
    std::fs::read(path).map_err(|source| TlsError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn invalid(path: &Path, e: pem::Error) -> TlsError {
    TlsError::Pem {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Load every certificate in a PEM file
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let certs = CertificateDer::pem_slice_iter(&read(path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid(path, e))?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

/// Load the first private key in a PEM file
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsError> {
    PrivateKeyDer::from_pem_slice(&read(path)?).map_err(|e| match e {
        pem::Error::NoItemsFound => TlsError::NoPrivateKey(path.to_path_buf()),
        other => invalid(path, other),
    })
}

/// Build a trust store from a CA bundle
pub fn load_root_store(path: &Path) -> Result<RootCertStore, TlsError> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path)? {
        roots.add(cert)?;
    }
    Ok(roots)
}

/// Server config requiring a client certificate signed by `ca_path`
pub fn server_config(
    cert_path: &Path,
    key_path: &Path,
    ca_path: &Path,
) -> Result<Arc<ServerConfig>, TlsError> {
    let provider = provider();
    let roots = load_root_store(ca_path)?;
    let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
        .build()?;

    let mut config = ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&rustls::version::TLS13])?
        .with_client_cert_verifier(verifier)
        .with_single_cert(load_certs(cert_path)?, load_private_key(key_path)?)?;

    // WebSocket upgrades need HTTP/1.1
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

/// Client config presenting `cert_path` and trusting only `ca_path`
pub fn client_config(
    cert_path: &Path,
    key_path: &Path,
    ca_path: &Path,
) -> Result<Arc<ClientConfig>, TlsError> {
    let config = ClientConfig::builder_with_provider(provider())
        .with_protocol_versions(&[&rustls::version::TLS13])?
        .with_root_certificates(load_root_store(ca_path)?)
        .with_client_auth_cert(load_certs(cert_path)?, load_private_key(key_path)?)?;

    Ok(Arc::new(config))
}
