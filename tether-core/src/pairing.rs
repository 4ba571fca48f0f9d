// ABOUTME: Issues and settles one-time pairing codes that promote a conversation into the allow-set.
// ABOUTME: Codes are single-use, time-boxed, and reaped lazily on issue.

use crate::chat_key::ChatKey;
use crate::error::{Error, Result};
use crate::store::{PairingRequest, Store};
use crate::traits::UserInfo;
use rand::Rng;

/// Code alphabet: uppercase, with lookalike characters (0/O, 1/I/L) removed
/// so a human operator can relay a code over voice or chat without error.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 8;

/// Default code lifetime: one hour
pub const DEFAULT_TTL_SECS: i64 = 3600;

fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Issues, approves, rejects, and expires pairing codes.
///
/// A code is a secret relayed to a human operator; approving it promotes
/// the requesting conversation into the allow-set and consumes the code.
#[derive(Clone)]
pub struct PairingLedger {
    store: Store,
    ttl_secs: i64,
}

impl PairingLedger {
    pub fn new(store: Store) -> Self {
        Self::with_ttl(store, DEFAULT_TTL_SECS)
    }

    pub fn with_ttl(store: Store, ttl_secs: i64) -> Self {
        Self { store, ttl_secs }
    }

    /// Issue a fresh code for a conversation. Expired rows are reaped first
    /// so storage stays bounded by the set of genuinely pending requests.
    pub fn issue(&self, key: &ChatKey, user: &UserInfo) -> Result<String> {
        let now = chrono::Utc::now();
        self.store.reap_expired_pairings(&now.to_rfc3339())?;

        let request_for = |code: String| PairingRequest {
            code,
            chat_key: key.conversation_id(),
            user: user.clone(),
            created_at: now.to_rfc3339(),
            expires_at: (now + chrono::Duration::seconds(self.ttl_secs)).to_rfc3339(),
        };

        // Collisions are vanishingly rare at this alphabet size; retry a
        // couple of times rather than pre-checking.
        for _ in 0..3 {
            let code = generate_code();
            match self.store.insert_pairing(&request_for(code.clone())) {
                Ok(()) => {
                    tracing::info!(
                        chat_key = %key.conversation_id(),
                        user = %user.label(),
                        "Pairing code issued"
                    );
                    crate::metrics::record_pairing_issued();
                    return Ok(code);
                }
                Err(Error::Db(rusqlite::Error::SqliteFailure(e, _)))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::Config("could not generate a unique pairing code".to_string()))
    }

    /// Approve a code: promotes the conversation into the allow-set and
    /// deletes the row, so replay cannot double-promote.
    pub fn approve(&self, code: &str) -> Result<PairingRequest> {
        let code = normalize_code(code);
        let request = self
            .store
            .get_pairing(&code)?
            .ok_or(Error::PairingNotFound)?;

        let now = chrono::Utc::now().to_rfc3339();
        if request.expires_at <= now {
            self.store.delete_pairing(&code)?;
            return Err(Error::PairingExpired);
        }

        self.store.allow_add(&request.chat_key, Some("pairing"))?;
        self.store.delete_pairing(&code)?;

        tracing::info!(
            chat_key = %request.chat_key,
            user = %request.user.label(),
            "Pairing approved"
        );
        crate::metrics::record_pairing_settled("approved");
        Ok(request)
    }

    /// Reject a code, deleting the row without promotion. Returns whether
    /// the code existed.
    pub fn reject(&self, code: &str) -> Result<bool> {
        let code = normalize_code(code);
        let existed = self.store.delete_pairing(&code)?;
        if existed {
            tracing::info!(code = %code, "Pairing rejected");
            crate::metrics::record_pairing_settled("rejected");
        }
        Ok(existed)
    }

    /// Unexpired pending requests, oldest first
    pub fn list_pending(&self) -> Result<Vec<PairingRequest>> {
        self.store
            .list_pending_pairings(&chrono::Utc::now().to_rfc3339())
    }

    /// Count of unexpired pending requests
    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.list_pending()?.len())
    }

    /// The outstanding request for a conversation, if one is pending.
    /// Lets callers re-show a code instead of minting one per message.
    pub fn pending_for(&self, key: &ChatKey) -> Result<Option<PairingRequest>> {
        self.store
            .pending_pairing_for(&key.conversation_id(), &chrono::Utc::now().to_rfc3339())
    }
}
