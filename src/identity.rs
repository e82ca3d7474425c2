// File: src/identity.rs
// Version: 1.0.0 - MSP creator identity extraction
//
// A creator's `SerializedIdentity.id_bytes` normally holds a PEM certificate;
// some SDKs write raw DER. PEM is tried first.

use openssl::nid::Nid;
use openssl::x509::{X509, X509NameRef};

use crate::error::IdentityError;

/// Subject fields of a creator certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub common_name: String,
    pub organizational_unit: String,
}

pub fn parse_certificate(id_bytes: &[u8]) -> Result<X509, IdentityError> {
    match X509::from_pem(id_bytes) {
        Ok(cert) => Ok(cert),
        Err(_) => X509::from_der(id_bytes).map_err(IdentityError::Certificate),
    }
}

/// Common name and first organizational unit of the certificate in `id_bytes`.
pub fn extract_identity(id_bytes: &[u8]) -> Result<CallerIdentity, IdentityError> {
    let cert = parse_certificate(id_bytes)?;
    identity_from_certificate(&cert)
}

pub fn identity_from_certificate(cert: &X509) -> Result<CallerIdentity, IdentityError> {
    let subject = cert.subject_name();
    let common_name = first_entry(subject, Nid::COMMONNAME, "CN")?.unwrap_or_default();
    let organizational_unit =
        first_entry(subject, Nid::ORGANIZATIONALUNITNAME, "OU")?.ok_or(IdentityError::NoOrganizationalUnit)?;

    tracing::debug!(cn = %common_name, ou = %organizational_unit, "creator certificate parsed");

    Ok(CallerIdentity { common_name, organizational_unit })
}

fn first_entry(name: &X509NameRef, nid: Nid, label: &'static str) -> Result<Option<String>, IdentityError> {
    match name.entries_by_nid(nid).next() {
        Some(entry) => {
            let text = entry.data().to_string().map_err(|_| IdentityError::InvalidSubjectEntry(label))?;
            Ok(Some(text))
        }
        None => Ok(None),
    }
}
