// File: src/crypto.rs
// Version: 1.0.0 - Hash suite, block header hashing and certificate key import
//
// The suite is constructed once by the caller and passed to whatever needs it.
// There is no process-wide default.

use std::fmt;

use openssl::bn::BigNumContext;
use openssl::ec::{EcKey, PointConversionForm};
use openssl::nid::Nid;
use openssl::pkey::{Id, PKey, Public};
use openssl::x509::X509;
use sha2::{Digest, Sha256, Sha384};

use crate::error::CryptoError;
use crate::protos::{BlockData, BlockHeader};

/// `NID_sm2`, the SM2 curve (and, on OpenSSL 3, the SM2 key type).
const SM2_NID: i32 = 1172;

/// Hashing capability consumed by the ledger store and by-number traversal.
pub trait CryptoSuite: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;
    fn hash(&self, msg: &[u8]) -> Vec<u8>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sha2Level {
    L256,
    L384,
}

/// Software SHA2 suite, Fabric's `SW`/`SHA2` family.
#[derive(Debug, Clone, Copy)]
pub struct Sha2Suite {
    level: Sha2Level,
}

impl Sha2Suite {
    pub fn new(level: Sha2Level) -> Self {
        Self { level }
    }

    pub fn sha256() -> Self {
        Self::new(Sha2Level::L256)
    }

    pub fn sha384() -> Self {
        Self::new(Sha2Level::L384)
    }
}

impl CryptoSuite for Sha2Suite {
    fn name(&self) -> &'static str {
        match self.level {
            Sha2Level::L256 => "SHA2-256",
            Sha2Level::L384 => "SHA2-384",
        }
    }

    fn hash(&self, msg: &[u8]) -> Vec<u8> {
        match self.level {
            Sha2Level::L256 => Sha256::digest(msg).to_vec(),
            Sha2Level::L384 => Sha384::digest(msg).to_vec(),
        }
    }
}

/// Header hash as Fabric computes it: the suite hash of
/// `SEQUENCE { INTEGER number, OCTET STRING previous_hash, OCTET STRING data_hash }`.
pub fn block_header_hash(suite: &dyn CryptoSuite, header: &BlockHeader) -> Vec<u8> {
    suite.hash(&header_der(header))
}

/// Hash over the concatenated transaction slots, i.e. the expected `data_hash`.
pub fn block_data_hash(suite: &dyn CryptoSuite, data: &BlockData) -> Vec<u8> {
    suite.hash(&data.data.concat())
}

// Same bytes as Go's `asn1.Marshal` of `struct { Number *big.Int; PreviousHash, DataHash []byte }`.
fn header_der(header: &BlockHeader) -> Vec<u8> {
    let mut body = Vec::with_capacity(header.previous_hash.len() + header.data_hash.len() + 16);
    der_tlv(&mut body, 0x02, &der_unsigned(header.number));
    der_tlv(&mut body, 0x04, &header.previous_hash);
    der_tlv(&mut body, 0x04, &header.data_hash);

    let mut out = Vec::with_capacity(body.len() + 4);
    der_tlv(&mut out, 0x30, &body);
    out
}

fn der_unsigned(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    let mut out = Vec::with_capacity(9);
    // Non-negative integers keep a leading zero when the high bit is set.
    if bytes[first] & 0x80 != 0 {
        out.push(0);
    }
    out.extend_from_slice(&bytes[first..]);
    out
}

fn der_tlv(out: &mut Vec<u8>, tag: u8, value: &[u8]) {
    out.push(tag);
    let len = value.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let len_bytes = (len as u64).to_be_bytes();
        let first = len_bytes.iter().position(|b| *b != 0).unwrap_or(len_bytes.len() - 1);
        out.push(0x80 | (len_bytes.len() - first) as u8);
        out.extend_from_slice(&len_bytes[first..]);
    }
    out.extend_from_slice(value);
}

/// Public key imported from a creator certificate.
#[derive(Clone)]
pub enum CertPublicKey {
    Sm2(PKey<Public>),
    Ecdsa(PKey<Public>),
}

impl fmt::Debug for CertPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CertPublicKey::{}", self.algorithm())
    }
}

impl CertPublicKey {
    pub fn from_certificate(cert: &X509) -> Result<Self, CryptoError> {
        let key = cert.public_key()?;
        if key.id() == Id::from_raw(SM2_NID) {
            return Ok(CertPublicKey::Sm2(key));
        }

        let ec = ec_public_key(&key)
            .map_err(|_| CryptoError::UnsupportedKeyAlgorithm(format!("{:?}", key.id())))?;
        match ec.group().curve_name() {
            Some(nid) if nid == Nid::from_raw(SM2_NID) => Ok(CertPublicKey::Sm2(key)),
            Some(_) => Ok(CertPublicKey::Ecdsa(key)),
            None => Err(CryptoError::UnsupportedKeyAlgorithm("EC key on an unnamed curve".to_string())),
        }
    }

    pub fn algorithm(&self) -> &'static str {
        match self {
            CertPublicKey::Sm2(_) => "SM2",
            CertPublicKey::Ecdsa(_) => "ECDSA",
        }
    }

    pub fn key(&self) -> &PKey<Public> {
        match self {
            CertPublicKey::Sm2(key) | CertPublicKey::Ecdsa(key) => key,
        }
    }

    /// Fabric SKI: suite hash of the uncompressed EC point.
    pub fn subject_key_identifier(&self, suite: &dyn CryptoSuite) -> Result<Vec<u8>, CryptoError> {
        let ec = ec_public_key(self.key())?;
        let mut ctx = BigNumContext::new()?;
        let point = ec.public_key().to_bytes(ec.group(), PointConversionForm::UNCOMPRESSED, &mut ctx)?;
        Ok(suite.hash(&point))
    }
}

/// EC view of `key`. Keys parsed from certificate bytes on OpenSSL 3 may be
/// provider-backed (SM2 reports no legacy id), so those go back through the SPKI.
fn ec_public_key(key: &PKey<Public>) -> Result<EcKey<Public>, CryptoError> {
    if key.id() == Id::EC {
        return Ok(key.ec_key()?);
    }
    if key.id() != Id::from_raw(SM2_NID) && key.id() != Id::from_raw(-1) {
        return Err(CryptoError::UnsupportedKeyAlgorithm(format!("{:?}", key.id())));
    }
    Ok(EcKey::public_key_from_der(&key.public_key_to_der()?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::asn1::Asn1Time;
    use openssl::ec::EcGroup;
    use openssl::hash::MessageDigest;
    use openssl::pkey::Private;
    use openssl::rsa::Rsa;
    use openssl::x509::X509Name;

    use crate::identity::parse_certificate;

    fn cert_for(subject_key: &PKey<Private>, signer: &PKey<Private>) -> X509 {
        let mut name = X509Name::builder().unwrap();
        name.append_entry_by_nid(Nid::COMMONNAME, "key-import").unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
        builder.set_not_after(&Asn1Time::days_from_now(1).unwrap()).unwrap();
        builder.set_pubkey(subject_key).unwrap();
        builder.sign(signer, MessageDigest::sha256()).unwrap();
        builder.build()
    }

    fn p256_key() -> PKey<Private> {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
    }

    #[test]
    fn test_header_der_layout() {
        let header = BlockHeader { number: 0, previous_hash: Vec::new(), data_hash: vec![0xab; 2] };
        assert_eq!(header_der(&header), vec![0x30, 0x09, 0x02, 0x01, 0x00, 0x04, 0x00, 0x04, 0x02, 0xab, 0xab]);
    }

    #[test]
    fn test_der_unsigned_high_bit() {
        assert_eq!(der_unsigned(0x80), vec![0x00, 0x80]);
        assert_eq!(der_unsigned(0x7f), vec![0x7f]);
        assert_eq!(der_unsigned(256), vec![0x01, 0x00]);
    }

    #[test]
    fn test_der_long_form_length() {
        let mut out = Vec::new();
        der_tlv(&mut out, 0x04, &[0u8; 200]);
        assert_eq!(&out[..3], &[0x04, 0x81, 200]);
        assert_eq!(out.len(), 203);
    }

    #[test]
    fn test_suite_digest_lengths() {
        assert_eq!(Sha2Suite::sha256().hash(b"abc").len(), 32);
        assert_eq!(Sha2Suite::sha384().hash(b"abc").len(), 48);
        assert_eq!(
            hex::encode(Sha2Suite::sha256().hash(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_header_hash_changes_with_number() {
        let suite = Sha2Suite::sha256();
        let a = BlockHeader { number: 1, previous_hash: vec![1; 32], data_hash: vec![2; 32] };
        let b = BlockHeader { number: 2, ..a.clone() };
        assert_ne!(block_header_hash(&suite, &a), block_header_hash(&suite, &b));
    }

    #[test]
    fn test_ecdsa_import() {
        let key = p256_key();
        let pem = cert_for(&key, &key).to_pem().unwrap();
        let cert = parse_certificate(&pem).unwrap();

        let imported = CertPublicKey::from_certificate(&cert).unwrap();
        assert_eq!(imported.algorithm(), "ECDSA");
        assert_eq!(imported.subject_key_identifier(&Sha2Suite::sha256()).unwrap().len(), 32);
    }

    #[test]
    fn test_sm2_import_from_pem_and_der() {
        // Some OpenSSL builds ship without the SM2 curve.
        let Ok(group) = EcGroup::from_curve_name(Nid::from_raw(SM2_NID)) else {
            return;
        };
        let sm2_ec = EcKey::generate(&group).unwrap();
        let mut ctx = BigNumContext::new().unwrap();
        let point = sm2_ec.public_key().to_bytes(&group, PointConversionForm::UNCOMPRESSED, &mut ctx).unwrap();
        let sm2_key = PKey::from_ec_key(sm2_ec).unwrap();
        let built = cert_for(&sm2_key, &p256_key());

        let suite = Sha2Suite::sha256();
        for bytes in [built.to_pem().unwrap(), built.to_der().unwrap()] {
            let cert = parse_certificate(&bytes).unwrap();
            let imported = CertPublicKey::from_certificate(&cert).unwrap();
            assert_eq!(imported.algorithm(), "SM2");
            assert_eq!(imported.subject_key_identifier(&suite).unwrap(), suite.hash(&point));
        }
    }

    #[test]
    fn test_rsa_is_unsupported() {
        let rsa = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let cert = cert_for(&rsa, &rsa);
        let err = CertPublicKey::from_certificate(&cert).unwrap_err();
        assert!(matches!(err, CryptoError::UnsupportedKeyAlgorithm(_)));
    }
}
