use sequoia_openpgp as openpgp;

use openpgp::parse::stream::{
    DetachedVerifierBuilder, MessageLayer, MessageStructure, VerificationHelper,
};
use openpgp::parse::Parse;
use openpgp::policy::StandardPolicy;
use openpgp::{Cert, KeyHandle};
use ssh_key::public::{KeyData, RsaPublicKey};
use ssh_key::{Mpint, PublicKey, SshSig};
use thiserror::Error;
use tracing::debug;

pub const SSH_SIGNATURE_BEGIN: &str = "-----BEGIN SSH SIGNATURE-----";
pub const SSH_SIGNATURE_END: &str = "-----END SSH SIGNATURE-----";
pub const PGP_SIGNATURE_BEGIN: &str = "-----BEGIN PGP SIGNATURE-----";
const PGP_KEY_BEGIN: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----";
const PGP_KEY_END: &str = "-----END PGP PUBLIC KEY BLOCK-----";

/// SSHSIG namespace used by `ssh-keygen -Y sign -n file`
pub const SSH_NAMESPACE: &str = "file";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFormat {
    Ssh,
    Pgp,
}

impl SignatureFormat {
    /// Sniff the armor delimiter
    pub fn detect(signature: &str) -> Option<Self> {
        if signature.contains(SSH_SIGNATURE_BEGIN) {
            Some(SignatureFormat::Ssh)
        } else if signature.contains(PGP_SIGNATURE_BEGIN) {
            Some(SignatureFormat::Pgp)
        } else {
            None
        }
    }
}

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("unrecognized signature format")]
    UnknownFormat,

    #[error("ssh signature check failed: {0}")]
    Ssh(#[from] ssh_key::Error),

    #[error("candidate key is not an OpenPGP certificate")]
    NoCertificate,

    #[error("openpgp signature check failed: {0}")]
    Pgp(String),
}

/// Checks SSHSIG and OpenPGP detached signatures against published keys.
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    policy: StandardPolicy<'static>,
}

impl SignatureVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify `signature` over `payload` with a single candidate key.
    pub fn verify(
        &self,
        payload: &[u8],
        signature: &str,
        public_key: &str,
    ) -> Result<(), VerifyError> {
        match SignatureFormat::detect(signature) {
            Some(SignatureFormat::Ssh) => verify_ssh(payload, signature, public_key),
            Some(SignatureFormat::Pgp) => self.verify_pgp(payload, signature, public_key),
            None => Err(VerifyError::UnknownFormat),
        }
    }

    /// Try each key in order. Per-key errors count as a non-match.
    pub fn verify_any(&self, payload: &[u8], signature: &str, keys: &[String]) -> bool {
        keys.iter().enumerate().any(|(index, key)| {
            match self.verify(payload, signature, key) {
                Ok(()) => {
                    debug!(index, "signature matched candidate key");
                    true
                }
                Err(e) => {
                    debug!(index, error = %e, "candidate key rejected");
                    false
                }
            }
        })
    }

    fn verify_pgp(&self, payload: &[u8], signature: &str, armored_keys: &str) -> Result<(), VerifyError> {
        let certs = parse_certs(armored_keys);
        if certs.is_empty() {
            return Err(VerifyError::NoCertificate);
        }

        let mut failures = Vec::new();
        for cert in &certs {
            let result = DetachedVerifierBuilder::from_bytes(signature.as_bytes())
                .and_then(|builder| builder.with_policy(&self.policy, None, CertHelper { cert }))
                .and_then(|mut verifier| verifier.verify_bytes(payload));

            match result {
                Ok(()) => return Ok(()),
                Err(e) => failures.push(format!("{}: {}", cert.fingerprint(), e)),
            }
        }

        Err(VerifyError::Pgp(failures.join("; ")))
    }
}

fn verify_ssh(payload: &[u8], signature: &str, public_key: &str) -> Result<(), VerifyError> {
    let key = PublicKey::from_openssh(public_key.trim())?;
    let key = PublicKey::new(normalize_key_data(key.key_data()), key.comment());

    let sig = SshSig::from_pem(extract_ssh_armor(signature))?;
    let sig = SshSig::new(
        normalize_key_data(sig.public_key()),
        sig.namespace(),
        sig.hash_alg(),
        sig.signature().clone(),
    )?;

    key.verify(SSH_NAMESPACE, payload, &sig)?;
    Ok(())
}

/// Isolate the armored block and normalize line endings
fn extract_ssh_armor(signature: &str) -> String {
    let normalized = signature.replace("\r\n", "\n");
    let start = normalized.find(SSH_SIGNATURE_BEGIN).unwrap_or(0);
    let end = normalized[start..]
        .find(SSH_SIGNATURE_END)
        .map(|offset| start + offset + SSH_SIGNATURE_END.len())
        .unwrap_or(normalized.len());
    normalized[start..end].to_string()
}

/// Strip leading zero bytes from RSA moduli. Other key types pass through.
pub fn normalize_key_data(key: &KeyData) -> KeyData {
    match key {
        KeyData::Rsa(rsa) => {
            let bytes = rsa.n.as_bytes();
            let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
            match Mpint::from_positive_bytes(&bytes[first..]) {
                Ok(n) => KeyData::Rsa(RsaPublicKey {
                    e: rsa.e.clone(),
                    n,
                }),
                Err(e) => {
                    debug!(error = %e, "keeping RSA modulus as published");
                    key.clone()
                }
            }
        }
        other => other.clone(),
    }
}

/// Split a concatenation of armored key blocks and parse each on its own.
fn parse_certs(armored: &str) -> Vec<Cert> {
    armored
        .split_inclusive(PGP_KEY_END)
        .filter(|block| block.contains(PGP_KEY_BEGIN))
        .filter_map(|block| match Cert::from_bytes(block.trim().as_bytes()) {
            Ok(cert) => Some(cert),
            Err(e) => {
                debug!(error = %e, "skipping unparsable key block");
                None
            }
        })
        .collect()
}

struct CertHelper<'a> {
    cert: &'a Cert,
}

impl VerificationHelper for CertHelper<'_> {
    fn get_certs(&mut self, _ids: &[KeyHandle]) -> openpgp::Result<Vec<Cert>> {
        Ok(vec![self.cert.clone()])
    }

    // The verifier reports per-signature results here; at least one must be good.
    fn check(&mut self, structure: MessageStructure) -> openpgp::Result<()> {
        for layer in structure.into_iter() {
            if let MessageLayer::SignatureGroup { results } = layer {
                if results.iter().any(|result| result.is_ok()) {
                    return Ok(());
                }
            }
        }
        Err(anyhow::anyhow!("no good signature from this certificate"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openpgp::armor::{Kind, Writer};
    use openpgp::cert::prelude::*;
    use openpgp::packet::signature::SignatureBuilder;
    use openpgp::serialize::Marshal;
    use openpgp::types::{HashAlgorithm, SignatureType};
    use openpgp::Packet;
    use ssh_key::rand_core::OsRng;
    use ssh_key::{Algorithm, HashAlg, LineEnding, PrivateKey};
    use std::io::Write;

    const PAYLOAD: &[u8] = b"eyJuYW1lIjoic2xhY2sifQ";

    fn ssh_pair() -> (PrivateKey, String) {
        let sk = PrivateKey::random(&mut OsRng, Algorithm::Ed25519).unwrap();
        let pk = sk.public_key().to_openssh().unwrap();
        (sk, pk)
    }

    fn ssh_sign(sk: &PrivateKey, data: &[u8]) -> String {
        sk.sign(SSH_NAMESPACE, HashAlg::Sha256, data)
            .unwrap()
            .to_pem(LineEnding::LF)
            .unwrap()
    }

    fn pgp_cert() -> Cert {
        let (cert, _) = CertBuilder::new()
            .add_userid("tester <tester@example.org>")
            .add_signing_subkey()
            .generate()
            .unwrap();
        cert
    }

    fn pgp_sign(cert: &Cert, data: &[u8]) -> String {
        let policy = StandardPolicy::new();
        let mut keypair = cert
            .keys()
            .secret()
            .with_policy(&policy, None)
            .for_signing()
            .next()
            .unwrap()
            .key()
            .clone()
            .into_keypair()
            .unwrap();
        let sig = SignatureBuilder::new(SignatureType::Binary)
            .set_hash_algo(HashAlgorithm::SHA256)
            .sign_message(&mut keypair, data)
            .unwrap();

        let mut w = Writer::new(Vec::new(), Kind::Signature).unwrap();
        Packet::from(sig).serialize(&mut w).unwrap();
        String::from_utf8(w.finalize().unwrap()).unwrap()
    }

    fn pgp_armor(cert: &Cert) -> String {
        let mut w = Writer::new(Vec::new(), Kind::PublicKey).unwrap();
        cert.serialize(&mut w).unwrap();
        w.flush().unwrap();
        String::from_utf8(w.finalize().unwrap()).unwrap()
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            SignatureFormat::detect("-----BEGIN SSH SIGNATURE-----\nabc"),
            Some(SignatureFormat::Ssh)
        );
        assert_eq!(
            SignatureFormat::detect("-----BEGIN PGP SIGNATURE-----\nabc"),
            Some(SignatureFormat::Pgp)
        );
        assert_eq!(SignatureFormat::detect("-----BEGIN SIGNATURE-----"), None);
    }

    #[test]
    fn test_ssh_signature_round_trip() {
        let (sk, pk) = ssh_pair();
        let signature = ssh_sign(&sk, PAYLOAD);

        SignatureVerifier::new().verify(PAYLOAD, &signature, &pk).unwrap();
    }

    #[test]
    fn test_ssh_tampered_payload_fails() {
        let (sk, pk) = ssh_pair();
        let signature = ssh_sign(&sk, PAYLOAD);

        let mut tampered = PAYLOAD.to_vec();
        tampered[0] ^= 1;
        assert!(SignatureVerifier::new()
            .verify(&tampered, &signature, &pk)
            .is_err());
    }

    #[test]
    fn test_ssh_signature_with_crlf_and_surrounding_text() {
        let (sk, pk) = ssh_pair();
        let signature = ssh_sign(&sk, PAYLOAD).replace('\n', "\r\n");
        let wrapped = format!("signature follows:\r\n{}\r\n", signature);

        assert!(SignatureVerifier::new().verify(PAYLOAD, &wrapped, &pk).is_ok());
    }

    #[test]
    fn test_unknown_format_fails_closed() {
        let (_, pk) = ssh_pair();
        assert!(matches!(
            SignatureVerifier::new().verify(PAYLOAD, "garbage", &pk),
            Err(VerifyError::UnknownFormat)
        ));
        assert!(!SignatureVerifier::new().verify_any(PAYLOAD, "garbage", &[pk]));
    }

    #[test]
    fn test_verify_any_skips_bad_keys() {
        let (sk, pk) = ssh_pair();
        let (_, other) = ssh_pair();
        let signature = ssh_sign(&sk, PAYLOAD);

        let keys = vec![
            "not a key".to_string(),
            other,
            pgp_armor(&pgp_cert()),
            pk,
        ];
        assert!(SignatureVerifier::new().verify_any(PAYLOAD, &signature, &keys));
        assert!(!SignatureVerifier::new().verify_any(PAYLOAD, &signature, &keys[..3]));
    }

    #[test]
    fn test_normalize_keeps_ed25519_and_canonical_rsa() {
        let (sk, _) = ssh_pair();
        let ed = sk.public_key().key_data().clone();
        assert_eq!(normalize_key_data(&ed), ed);

        let rsa = KeyData::Rsa(RsaPublicKey {
            e: Mpint::from_positive_bytes(&[0x01, 0x00, 0x01]).unwrap(),
            n: Mpint::from_positive_bytes(&[0xc3, 0x5a, 0x11, 0x7f]).unwrap(),
        });
        assert_eq!(normalize_key_data(&rsa), rsa);
    }

    // Signed with `ssh-keygen -Y sign -n file` using a 3072-bit RSA key
    const RSA_SIGNER: &str = include_str!("../../tests/fixtures/rsa_signer.pub");
    const RSA_SIGNED_PARAM: &str = include_str!("../../tests/fixtures/signed_manifest.param");
    const RSA_SIGNATURE: &str = include_str!("../../tests/fixtures/signed_manifest.param.sig");

    #[test]
    fn test_rsa_signature_from_ssh_keygen() {
        let (_, other) = ssh_pair();
        let keys = vec![other, RSA_SIGNER.to_string()];
        let verifier = SignatureVerifier::new();

        assert!(verifier.verify_any(RSA_SIGNED_PARAM.trim().as_bytes(), RSA_SIGNATURE, &keys));
        assert!(!verifier.verify_any(RSA_SIGNED_PARAM.trim().as_bytes(), RSA_SIGNATURE, &keys[..1]));

        let mut tampered = RSA_SIGNED_PARAM.trim().as_bytes().to_vec();
        tampered[4] ^= 1;
        assert!(!verifier.verify_any(&tampered, RSA_SIGNATURE, &keys));
    }

    #[test]
    fn test_normalize_rsa_modulus_with_sign_byte() {
        let key = PublicKey::from_openssh(RSA_SIGNER.trim()).unwrap();
        let KeyData::Rsa(rsa) = key.key_data() else {
            panic!("fixture is not an RSA key");
        };
        assert_eq!(rsa.n.as_bytes()[0], 0);

        assert_eq!(normalize_key_data(key.key_data()), *key.key_data());
    }

    #[test]
    fn test_pgp_signature_round_trip() {
        let cert = pgp_cert();
        let signature = pgp_sign(&cert, PAYLOAD);

        SignatureVerifier::new()
            .verify(PAYLOAD, &signature, &pgp_armor(&cert))
            .unwrap();
    }

    #[test]
    fn test_pgp_rejects_other_certificate() {
        let signer = pgp_cert();
        let stranger = pgp_cert();
        let signature = pgp_sign(&signer, PAYLOAD);

        assert!(SignatureVerifier::new()
            .verify(PAYLOAD, &signature, &pgp_armor(&stranger))
            .is_err());
    }

    #[test]
    fn test_pgp_rejects_tampered_payload() {
        let cert = pgp_cert();
        let signature = pgp_sign(&cert, PAYLOAD);

        assert!(SignatureVerifier::new()
            .verify(b"something else", &signature, &pgp_armor(&cert))
            .is_err());
    }

    #[test]
    fn test_pgp_finds_signer_in_concatenated_blocks() {
        let signer = pgp_cert();
        let keys = format!("{}\n{}", pgp_armor(&pgp_cert()), pgp_armor(&signer));
        let signature = pgp_sign(&signer, PAYLOAD);

        assert!(SignatureVerifier::new()
            .verify(PAYLOAD, &signature, &keys)
            .is_ok());
    }

    #[test]
    fn test_pgp_signature_against_ssh_key_is_error() {
        let cert = pgp_cert();
        let (_, pk) = ssh_pair();
        let signature = pgp_sign(&cert, PAYLOAD);

        assert!(matches!(
            SignatureVerifier::new().verify(PAYLOAD, &signature, &pk),
            Err(VerifyError::NoCertificate)
        ));
    }
}
