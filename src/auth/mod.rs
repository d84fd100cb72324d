//! Credential verification seam for private rooms.
//!
//! Hashing and proof generation belong to an external layer; the
//! coordinator only ever compares a client-supplied plaintext against the
//! opaque proof stored on the room.

/// Verifies a plaintext credential against a stored opaque proof.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, plaintext: &str, proof: &str) -> bool;
}

/// Constant-time comparison against the stored proof.
///
/// Stands in for the external hashing layer in deployments where the proof
/// is the pre-shared token itself.
pub struct OpaqueProofVerifier;

impl CredentialVerifier for OpaqueProofVerifier {
    fn verify(&self, plaintext: &str, proof: &str) -> bool {
        constant_time_eq(plaintext.as_bytes(), proof.as_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().min(b.len()) {
        diff |= (a[i] ^ b[i]) as usize;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_matches_exact_proof_only() {
        let verifier = OpaqueProofVerifier;
        assert!(verifier.verify("secret", "secret"));
        assert!(!verifier.verify("secret", "secret2"));
        assert!(!verifier.verify("", "secret"));
    }
}
