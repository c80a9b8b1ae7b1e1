//! Certificate inspection

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::net::IpAddr;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::TrustError;
use crate::Result;

/// SHA-256 of DER bytes as colon-separated uppercase hex
pub fn fingerprint(der: &[u8]) -> String {
    Sha256::digest(der)
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// The parts of a server certificate that trust decisions need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerCertificate {
    pub fingerprint: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub common_names: Vec<String>,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
}

impl PeerCertificate {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| TrustError::InvalidCertificate(e.to_string()))?;

        let validity = cert.validity();
        let not_before = timestamp(validity.not_before.timestamp())?;
        let not_after = timestamp(validity.not_after.timestamp())?;

        let common_names = cert
            .subject()
            .iter_common_name()
            .filter_map(|cn| cn.as_str().ok())
            .map(str::to_string)
            .collect();

        let mut dns_names = Vec::new();
        let mut ip_addresses = Vec::new();
        if let Ok(Some(san)) = cert.subject_alternative_name() {
            for name in &san.value.general_names {
                match name {
                    GeneralName::DNSName(dns) => dns_names.push(dns.to_string()),
                    GeneralName::IPAddress(bytes) => {
                        if let Some(ip) = ip_from_bytes(bytes) {
                            ip_addresses.push(ip);
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(Self {
            fingerprint: fingerprint(der),
            not_before,
            not_after,
            common_names,
            dns_names,
            ip_addresses,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.not_after
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    /// Hostname verification, falling back to an exact common-name match
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.trim_start_matches('[').trim_end_matches(']');

        if let Ok(ip) = host.parse::<IpAddr>() {
            return self.ip_addresses.contains(&ip)
                || self.common_names.iter().any(|cn| cn == host);
        }

        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.dns_names
            .iter()
            .any(|pattern| dns_name_matches(pattern, &host))
            || self
                .common_names
                .iter()
                .any(|cn| cn.eq_ignore_ascii_case(&host))
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| TrustError::InvalidCertificate(format!("timestamp {secs} out of range")))
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => <[u8; 4]>::try_from(bytes).ok().map(IpAddr::from),
        16 => <[u8; 16]>::try_from(bytes).ok().map(IpAddr::from),
        _ => None,
    }
}

/// `*.example.org` matches exactly one extra leading label
fn dns_name_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim_end_matches('.').to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        Some(suffix) => host
            .split_once('.')
            .map(|(label, rest)| !label.is_empty() && rest == suffix)
            .unwrap_or(false),
        None => pattern == host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rcgen::{CertificateParams, DnType, KeyPair};

    fn generate(names: &[&str], common_name: Option<&str>) -> Vec<u8> {
        let mut params =
            CertificateParams::new(names.iter().map(|n| n.to_string()).collect::<Vec<_>>())
                .unwrap();
        params.not_before = rcgen::date_time_ymd(2024, 1, 1);
        params.not_after = rcgen::date_time_ymd(2030, 1, 1);
        if let Some(cn) = common_name {
            params.distinguished_name.push(DnType::CommonName, cn);
        }
        let key = KeyPair::generate().unwrap();
        params.self_signed(&key).unwrap().der().to_vec()
    }

    #[test]
    fn test_fingerprint_format() {
        let fp = fingerprint(b"burrow");
        assert_eq!(fp.len(), 95);
        assert_eq!(fp.matches(':').count(), 31);
        assert_eq!(fp, fp.to_uppercase());
    }

    #[test]
    fn test_parse_certificate() {
        let der = generate(&["example.org"], None);
        let cert = PeerCertificate::from_der(&der).unwrap();

        assert_eq!(cert.fingerprint, fingerprint(&der));
        assert_eq!(cert.dns_names, vec!["example.org".to_string()]);
        assert_eq!(cert.not_before, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(cert.not_after, Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_validity_window() {
        let cert = PeerCertificate::from_der(&generate(&["example.org"], None)).unwrap();

        assert!(cert.is_valid_at(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()));
        assert!(!cert.is_valid_at(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()));
        assert!(cert.is_expired(Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_matches_host() {
        let cert = PeerCertificate::from_der(&generate(&["*.example.org"], None)).unwrap();
        assert!(cert.matches_host("gemini.example.org"));
        assert!(cert.matches_host("GEMINI.Example.org"));
        assert!(!cert.matches_host("example.org"));
        assert!(!cert.matches_host("a.b.example.org"));

        let cert =
            PeerCertificate::from_der(&generate(&["other.org"], Some("capsule.org"))).unwrap();
        assert!(cert.matches_host("capsule.org"));
        assert!(cert.matches_host("other.org"));
        assert!(!cert.matches_host("unrelated.org"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            PeerCertificate::from_der(b"not a certificate"),
            Err(TrustError::InvalidCertificate(_))
        ));
    }
}
