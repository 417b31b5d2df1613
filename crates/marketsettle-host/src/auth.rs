//! Caller authentication for the in-memory host.
//!
//! Each invocation has a fresh challenge: `"marketsettle:auth:v1:" || nonce`.
//! A caller proves control of an [`Address`] by signing the challenge with
//! the ed25519 key whose public half is that address. Signatures are only
//! valid for the invocation they were made for; the nonce advances when the
//! invocation commits or rolls back.

use std::collections::BTreeSet;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use marketsettle_types::{Address, AuthorizationError};

/// How `require_auth` decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Every address is considered authorized. For scenario tests.
    MockAll,
    /// Only addresses that signed the current challenge are authorized.
    Signatures,
}

/// Per-invocation authorization state.
#[derive(Debug, Clone)]
pub struct Authenticator {
    mode: AuthMode,
    nonce: u64,
    authorized: BTreeSet<Address>,
}

impl Authenticator {
    #[must_use]
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            nonce: 0,
            authorized: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Bytes the caller must sign for the next invocation.
    #[must_use]
    pub fn challenge(&self) -> Vec<u8> {
        challenge_bytes(self.nonce)
    }

    /// Verify `signature` over the current challenge and authorize `signer`.
    ///
    /// # Errors
    /// [`AuthorizationError::InvalidSignature`] for a malformed key or a
    /// signature that does not verify.
    pub fn submit(
        &mut self,
        signer: Address,
        signature: &[u8; 64],
    ) -> Result<(), AuthorizationError> {
        let key = VerifyingKey::from_bytes(signer.as_bytes())
            .map_err(|_| AuthorizationError::InvalidSignature)?;
        let sig = Signature::from_bytes(signature);
        key.verify(&self.challenge(), &sig).map_err(|_| {
            tracing::warn!(signer = %signer, nonce = self.nonce, "rejected caller signature");
            AuthorizationError::InvalidSignature
        })?;
        self.authorized.insert(signer);
        Ok(())
    }

    pub fn require(&self, who: &Address) -> Result<(), AuthorizationError> {
        match self.mode {
            AuthMode::MockAll => Ok(()),
            AuthMode::Signatures if self.authorized.contains(who) => Ok(()),
            AuthMode::Signatures => Err(AuthorizationError::MissingSignature(*who)),
        }
    }

    /// End the current invocation: drop every authorization and move to a
    /// fresh challenge.
    pub fn finish_invocation(&mut self) {
        self.authorized.clear();
        self.nonce = self.nonce.wrapping_add(1);
    }
}

fn challenge_bytes(nonce: u64) -> Vec<u8> {
    let mut payload = Vec::with_capacity(32);
    payload.extend_from_slice(b"marketsettle:auth:v1:");
    payload.extend_from_slice(&nonce.to_le_bytes());
    payload
}
