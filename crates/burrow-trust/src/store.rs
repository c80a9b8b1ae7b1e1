//! Trust-on-first-use certificate store

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::certificate::PeerCertificate;
use crate::error::TrustError;
use crate::locks::HostLocks;
use crate::Result;

/// Host name that purges every entry
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustEntry {
    pub fingerprint: String,
    pub expires_at: DateTime<Utc>,
    pub added_at: DateTime<Utc>,
}

impl TrustEntry {
    /// Only an unexpired entry is authoritative
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Persisted form: `FINGERPRINT|expiry_unix_seconds`
    pub fn to_value(&self) -> String {
        format!("{}|{}", self.fingerprint, self.expires_at.timestamp())
    }

    pub fn parse(value: &str, now: DateTime<Utc>) -> Result<Self> {
        let (fingerprint, expiry) = value
            .split_once('|')
            .ok_or_else(|| TrustError::InvalidEntry(value.to_string()))?;

        let secs = expiry
            .trim()
            .parse::<i64>()
            .map_err(|_| TrustError::InvalidEntry(value.to_string()))?;
        let expires_at = DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| TrustError::InvalidEntry(value.to_string()))?;

        let fingerprint = fingerprint.trim();
        if fingerprint.is_empty() {
            return Err(TrustError::InvalidEntry(value.to_string()));
        }

        Ok(Self {
            fingerprint: fingerprint.to_string(),
            expires_at,
            added_at: now,
        })
    }
}

/// How a successful verification was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustOutcome {
    /// First visit, a certificate was pinned
    Pinned,
    /// The pinned certificate was presented again
    Trusted,
    /// The old pin had expired and a new one was recorded
    Repinned,
}

/// Host to pinned-certificate bindings, keyed by lowercased host
#[derive(Debug, Default)]
pub struct TrustStore {
    entries: RwLock<HashMap<String, TrustEntry>>,
    locks: HostLocks,
}

impl TrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle serialising work on one host.
    ///
    /// Hold it across the whole exchange with that host. [`TrustStore::verify`]
    /// does not take it itself; [`TrustStore::purge`] does.
    pub fn lock_host(&self, host: &str) -> Arc<Mutex<()>> {
        self.locks.handle(host)
    }

    /// Decide whether the chain offered by `host` is acceptable
    pub fn verify<D: AsRef<[u8]>>(
        &self,
        host: &str,
        chain: &[D],
        now: DateTime<Utc>,
    ) -> Result<TrustOutcome> {
        if chain.is_empty() {
            return Err(TrustError::InsecureConnection(host.to_string()));
        }

        let key = host.to_lowercase();
        let certs: Vec<Result<PeerCertificate>> = chain
            .iter()
            .map(|der| PeerCertificate::from_der(der.as_ref()))
            .collect();

        let mut outcome = TrustOutcome::Pinned;

        if let Some(entry) = self.get(&key) {
            if !entry.is_current(now) {
                tracing::info!(host = %key, "Pinned certificate expired, re-pinning");
                self.remove(&key);
                outcome = TrustOutcome::Repinned;
            } else {
                let pinned = certs
                    .iter()
                    .enumerate()
                    .filter_map(|(index, cert)| cert.as_ref().ok().map(|cert| (index, cert)))
                    .find(|(_, cert)| cert.fingerprint == entry.fingerprint);

                let Some((index, cert)) = pinned else {
                    tracing::warn!(
                        host = %key,
                        pinned = %entry.fingerprint,
                        "Offered certificate does not match the pinned one"
                    );
                    return Err(TrustError::CertificateMismatch { host: key });
                };

                if cert.is_valid_at(now) && cert.matches_host(host) {
                    tracing::debug!(host = %key, "Pinned certificate presented");
                    return Ok(TrustOutcome::Trusted);
                }

                if !cert.is_expired(now) {
                    return Err(TrustError::NoValidCertificate {
                        host: key,
                        reasons: rejection(index, cert, host, now),
                    });
                }

                tracing::info!(host = %key, "Pinned certificate is expired, re-pinning");
                self.remove(&key);
                outcome = TrustOutcome::Repinned;
            }
        }

        self.pin_first_valid(&key, host, &certs, now)?;
        Ok(outcome)
    }

    fn pin_first_valid(
        &self,
        key: &str,
        host: &str,
        certs: &[Result<PeerCertificate>],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut reasons = Vec::new();

        for (index, cert) in certs.iter().enumerate() {
            let cert = match cert {
                Ok(cert) => cert,
                Err(e) => {
                    reasons.push(format!("Cert [{index}] could not be read: {e}"));
                    continue;
                }
            };

            if cert.is_valid_at(now) && cert.matches_host(host) {
                let entry = TrustEntry {
                    fingerprint: cert.fingerprint.clone(),
                    expires_at: cert.not_after,
                    added_at: now,
                };
                tracing::info!(
                    host = %key,
                    fingerprint = %entry.fingerprint,
                    expires_at = %entry.expires_at,
                    "Pinned certificate"
                );
                self.entries.write().insert(key.to_string(), entry);
                return Ok(());
            }

            reasons.push(rejection(index, cert, host, now));
        }

        Err(TrustError::NoValidCertificate {
            host: key.to_string(),
            reasons: reasons.join("; "),
        })
    }

    /// Remove one host's pin, or every pin for [`WILDCARD`]
    pub fn purge(&self, host: &str) -> Result<()> {
        if host == WILDCARD {
            let hosts: Vec<String> = {
                let mut hosts: Vec<String> = self.entries.read().keys().cloned().collect();
                hosts.sort();
                hosts
            };
            let handles: Vec<_> = hosts.iter().map(|h| self.locks.handle(h)).collect();
            let _guards: Vec<_> = handles.iter().map(|handle| handle.lock()).collect();

            let removed = {
                let mut entries = self.entries.write();
                let count = entries.len();
                entries.clear();
                count
            };
            tracing::info!(removed, "Purged all pinned certificates");
            return Ok(());
        }

        let key = host.to_lowercase();
        let handle = self.locks.handle(&key);
        let _guard = handle.lock();

        if self.remove(&key) {
            tracing::info!(host = %key, "Purged pinned certificate");
            Ok(())
        } else {
            Err(TrustError::UnknownHost(key))
        }
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn get(&self, host: &str) -> Option<TrustEntry> {
        self.entries.read().get(&host.to_lowercase()).cloned()
    }

    /// All pins sorted by host
    pub fn entries(&self) -> Vec<(String, TrustEntry)> {
        let mut entries: Vec<(String, TrustEntry)> = self
            .entries
            .read()
            .iter()
            .map(|(host, entry)| (host.clone(), entry.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// `host` / `FINGERPRINT|expiry` pairs for the `[CERTS]` section
    pub fn dump(&self) -> Vec<(String, String)> {
        self.entries()
            .into_iter()
            .map(|(host, entry)| (host, entry.to_value()))
            .collect()
    }

    /// Load persisted pins, dropping expired and malformed ones
    pub fn load<I, K, V>(&self, pairs: I, now: DateTime<Utc>) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut entries = self.entries.write();
        let mut loaded = 0;

        for (host, value) in pairs {
            let host = host.as_ref().trim().to_lowercase();
            match TrustEntry::parse(value.as_ref(), now) {
                Ok(entry) if entry.is_current(now) => {
                    entries.insert(host, entry);
                    loaded += 1;
                }
                Ok(_) => tracing::debug!(host = %host, "Dropping expired certificate pin"),
                Err(e) => tracing::warn!(host = %host, error = %e, "Skipping certificate pin"),
            }
        }

        loaded
    }
}

fn rejection(index: usize, cert: &PeerCertificate, host: &str, now: DateTime<Utc>) -> String {
    let mut problems = Vec::new();
    if cert.is_expired(now) {
        problems.push(format!("Cert [{index}] is expired"));
    } else if now < cert.not_before {
        problems.push(format!("Cert [{index}] is not yet valid"));
    }
    if !cert.matches_host(host) {
        problems.push(format!("Cert [{index}] does not match host {host}"));
    }
    problems.join("; ")
}
