//! External work the loop hands off and hears back from later.
//!
//! An [`IoOperation`] is submitted with
//! [`LocalScheduler::submit_io`](crate::LocalScheduler::submit_io); once its
//! latency has elapsed the scheduler performs it and queues the completion
//! callback for the next I/O phase. Failures of the operation itself are part
//! of its `Output` and never stop the loop on their own.

use sha2::{Sha256, Sha512};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub trait IoOperation {
    type Output;

    /// Short description used in logs.
    fn label(&self) -> &str;

    fn perform(self) -> Self::Output;
}

/// Reads a whole file as UTF-8.
#[derive(Debug, Clone)]
pub struct ReadFile {
    path: PathBuf,
    label: String,
}

impl ReadFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = format!("read {}", path.display());
        Self { path, label }
    }
}

impl IoOperation for ReadFile {
    type Output = std::io::Result<String>;

    fn label(&self) -> &str {
        &self.label
    }

    fn perform(self) -> Self::Output {
        std::fs::read_to_string(&self.path)
    }
}

/// Arbitrary deferred work, e.g. a stand-in for a network round trip.
pub struct Deferred<F> {
    label: String,
    work: F,
}

impl<F> Deferred<F> {
    pub fn new(label: impl Into<String>, work: F) -> Self {
        Self {
            label: label.into(),
            work,
        }
    }
}

impl<F, T> IoOperation for Deferred<F>
where
    F: FnOnce() -> T,
{
    type Output = T;

    fn label(&self) -> &str {
        &self.label
    }

    fn perform(self) -> T {
        (self.work)()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Digest {
    Sha256,
    Sha512,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported digest `{0}`")]
pub struct UnknownDigest(pub String);

impl FromStr for Digest {
    type Err = UnknownDigest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(Digest::Sha256),
            "sha512" => Ok(Digest::Sha512),
            _ => Err(UnknownDigest(s.to_owned())),
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Digest::Sha256 => f.write_str("sha256"),
            Digest::Sha512 => f.write_str("sha512"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyDerivationError {
    #[error("iteration count must be at least 1")]
    ZeroRounds,
    #[error("requested key length must be at least 1 byte")]
    EmptyKey,
}

/// PBKDF2-HMAC key derivation.
#[derive(Debug, Clone)]
pub struct DeriveKey {
    pub password: Vec<u8>,
    pub salt: Vec<u8>,
    pub rounds: u32,
    pub key_len: usize,
    pub digest: Digest,
}

impl DeriveKey {
    pub fn new(
        password: impl AsRef<[u8]>,
        salt: impl AsRef<[u8]>,
        rounds: u32,
        key_len: usize,
        digest: Digest,
    ) -> Self {
        Self {
            password: password.as_ref().to_vec(),
            salt: salt.as_ref().to_vec(),
            rounds,
            key_len,
            digest,
        }
    }
}

impl IoOperation for DeriveKey {
    type Output = Result<Vec<u8>, KeyDerivationError>;

    fn label(&self) -> &str {
        "pbkdf2"
    }

    fn perform(self) -> Self::Output {
        if self.rounds == 0 {
            return Err(KeyDerivationError::ZeroRounds);
        }
        if self.key_len == 0 {
            return Err(KeyDerivationError::EmptyKey);
        }

        let mut key = vec![0u8; self.key_len];
        match self.digest {
            Digest::Sha256 => {
                pbkdf2::pbkdf2_hmac::<Sha256>(&self.password, &self.salt, self.rounds, &mut key)
            }
            Digest::Sha512 => {
                pbkdf2::pbkdf2_hmac::<Sha512>(&self.password, &self.salt, self.rounds, &mut key)
            }
        }
        Ok(key)
    }
}
