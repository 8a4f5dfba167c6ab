//! TLS material loading.
//!
//! Reads the PEM files named by [`SslConfig`] into DER buffers ready for
//! the listener's TLS stack. Only the PEM framing is checked here; chain
//! verification belongs to whoever builds the server config.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::SslConfig;

/// Errors raised while reading TLS material.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no certificates found in {}", .0.display())]
    NoCertificates(PathBuf),

    #[error("no private key found in {}", .0.display())]
    NoPrivateKey(PathBuf),
}

/// DER-encoded TLS material.
#[derive(Clone)]
pub struct TlsMaterial {
    /// Leaf certificate first, then intermediates.
    pub certificate_chain: Vec<Vec<u8>>,
    /// PKCS#1, PKCS#8 or SEC1 private key.
    pub private_key: Vec<u8>,
    /// Trust anchors from the root bundle.
    pub roots: Vec<Vec<u8>>,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("certificate_chain", &self.certificate_chain.len())
            .field("private_key", &"<redacted>")
            .field("roots", &self.roots.len())
            .finish()
    }
}

/// Load certificate chain, private key and roots from the configured files.
pub fn load_tls_material(ssl: &SslConfig) -> Result<TlsMaterial, TlsError> {
    let certificate_chain = read_certificates(&ssl.certificate)?;
    let private_key = read_private_key(&ssl.key)?;
    let roots = read_certificates(&ssl.root)?;

    tracing::debug!(
        certificates = certificate_chain.len(),
        roots = roots.len(),
        "TLS material loaded"
    );

    Ok(TlsMaterial {
        certificate_chain,
        private_key,
        roots,
    })
}

fn open(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path).map(BufReader::new).map_err(|source| TlsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_certificates(path: &Path) -> Result<Vec<Vec<u8>>, TlsError> {
    let mut reader = open(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .map(|cert| cert.map(|der| der.as_ref().to_vec()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

fn read_private_key(path: &Path) -> Result<Vec<u8>, TlsError> {
    let mut reader = open(path)?;
    let key = rustls_pemfile::private_key(&mut reader).map_err(|source| TlsError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match key {
        Some(key) => Ok(key.secret_der().to_vec()),
        None => Err(TlsError::NoPrivateKey(path.to_path_buf())),
    }
}
