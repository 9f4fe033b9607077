//! SHA-256 hash chain over audit records.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use warden_core::AuditRecord;
use warden_error::{JsonError, WardenResult};

/// `prev_hash` of the first record in a log.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// An audit record as persisted, linked to its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct SealedAuditRecord {
    /// Position in the log, starting at 0
    sequence: u64,
    /// Hash of the previous sealed record
    prev_hash: String,
    /// Hash of this record's sequence, prev_hash and content
    hash: String,
    /// The audit record itself
    record: AuditRecord,
}

#[derive(Serialize)]
struct HashInput<'a> {
    sequence: u64,
    prev_hash: &'a str,
    record: &'a AuditRecord,
}

fn compute_hash(sequence: u64, prev_hash: &str, record: &AuditRecord) -> WardenResult<String> {
    let canonical = serde_json::to_vec(&HashInput {
        sequence,
        prev_hash,
        record,
    })
    .map_err(JsonError::from)?;
    Ok(format!("{:x}", Sha256::digest(&canonical)))
}

impl SealedAuditRecord {
    /// Recompute this record's hash from its contents.
    pub fn recompute_hash(&self) -> WardenResult<String> {
        compute_hash(self.sequence, &self.prev_hash, &self.record)
    }

    /// Consume the sealed record, keeping the audit record.
    pub fn into_record(self) -> AuditRecord {
        self.record
    }
}

/// Tail of a hash chain: where the next record goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainState {
    next_sequence: u64,
    last_hash: String,
}

impl ChainState {
    /// State of an empty log.
    pub fn genesis() -> Self {
        Self {
            next_sequence: 0,
            last_hash: GENESIS_HASH.to_string(),
        }
    }

    /// Continue after an already persisted record.
    pub fn after(last: &SealedAuditRecord) -> Self {
        Self {
            next_sequence: last.sequence + 1,
            last_hash: last.hash.clone(),
        }
    }

    /// Seal a record as the next link without advancing the chain.
    ///
    /// Call [`ChainState::advance`] once the sealed record is durable.
    pub fn seal(&self, record: AuditRecord) -> WardenResult<SealedAuditRecord> {
        let hash = compute_hash(self.next_sequence, &self.last_hash, &record)?;
        Ok(SealedAuditRecord {
            sequence: self.next_sequence,
            prev_hash: self.last_hash.clone(),
            hash,
            record,
        })
    }

    /// Move the tail past a persisted record.
    pub fn advance(&mut self, sealed: &SealedAuditRecord) {
        self.next_sequence = sealed.sequence + 1;
        self.last_hash = sealed.hash.clone();
    }

    /// Sequence number the next record will get.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Hash of the last persisted record.
    pub fn last_hash(&self) -> &str {
        &self.last_hash
    }
}

impl Default for ChainState {
    fn default() -> Self {
        Self::genesis()
    }
}

/// Result of checking a sequence of sealed records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ChainVerification {
    /// Number of records checked
    total_entries: u64,
    /// Sequence of the first record whose links do not match
    first_break_at: Option<u64>,
    /// Sequence numbers absent between first and last record
    missing_sequences: Vec<u64>,
}

impl ChainVerification {
    /// Whether every link and every hash matched with no gaps.
    pub fn is_intact(&self) -> bool {
        self.first_break_at.is_none() && self.missing_sequences.is_empty()
    }
}

/// Verify a log from its first record.
///
/// Checks that sequence numbers are contiguous from 0, that every
/// `prev_hash` names its predecessor and that every stored hash matches the
/// record contents.
pub fn verify_chain(entries: &[SealedAuditRecord]) -> ChainVerification {
    let mut first_break_at = None;
    let mut missing_sequences = Vec::new();
    let mut expected_prev = GENESIS_HASH.to_string();
    let mut expected_sequence = 0u64;

    for entry in entries {
        if entry.sequence > expected_sequence {
            missing_sequences.extend(expected_sequence..entry.sequence);
        }

        let content_matches = entry
            .recompute_hash()
            .map(|hash| hash == entry.hash)
            .unwrap_or(false);

        if first_break_at.is_none()
            && (entry.prev_hash != expected_prev
                || !content_matches
                || entry.sequence < expected_sequence)
        {
            first_break_at = Some(entry.sequence);
        }

        expected_prev = entry.hash.clone();
        expected_sequence = entry.sequence.max(expected_sequence) + 1;
    }

    ChainVerification {
        total_entries: entries.len() as u64,
        first_break_at,
        missing_sequences,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{AuditAction, AuditOutcome, RequestState};

    fn record(principal: &str, action: AuditAction) -> AuditRecord {
        AuditRecord::builder()
            .principal_id(principal)
            .action(action)
            .outcome(AuditOutcome::Success)
            .final_state(RequestState::Succeeded)
            .build()
            .unwrap()
    }

    fn chain_of(n: usize) -> Vec<SealedAuditRecord> {
        let mut state = ChainState::genesis();
        (0..n)
            .map(|i| {
                let sealed = state
                    .seal(record(&format!("admin-{}", i), AuditAction::ChatMessageSent))
                    .unwrap();
                state.advance(&sealed);
                sealed
            })
            .collect()
    }

    #[test]
    fn test_intact_chain() {
        let entries = chain_of(4);
        assert_eq!(entries[0].prev_hash(), GENESIS_HASH);
        assert_eq!(entries[1].prev_hash(), entries[0].hash());

        let verification = verify_chain(&entries);
        assert!(verification.is_intact());
        assert_eq!(*verification.total_entries(), 4);
    }

    #[test]
    fn test_empty_chain_is_intact() {
        assert!(verify_chain(&[]).is_intact());
    }

    #[test]
    fn test_detects_edited_record() {
        let mut entries = chain_of(3);
        let forged = record("intruder", AuditAction::ConversationDeleted);
        entries[1].record = forged;

        let verification = verify_chain(&entries);
        assert!(!verification.is_intact());
        assert_eq!(*verification.first_break_at(), Some(1));
    }

    #[test]
    fn test_detects_deleted_record() {
        let mut entries = chain_of(4);
        entries.remove(2);

        let verification = verify_chain(&entries);
        assert!(!verification.is_intact());
        assert_eq!(verification.missing_sequences(), &vec![2]);
        assert_eq!(*verification.first_break_at(), Some(3));
    }

    #[test]
    fn test_detects_reordering() {
        let mut entries = chain_of(3);
        entries.swap(0, 1);
        assert!(!verify_chain(&entries).is_intact());
    }

    #[test]
    fn test_resume_continues_chain() {
        let entries = chain_of(2);
        let mut state = ChainState::after(&entries[1]);
        assert_eq!(state.next_sequence(), 2);

        let third = state.seal(record("admin-9", AuditAction::ChatError)).unwrap();
        state.advance(&third);

        let mut all = entries.clone();
        all.push(third);
        assert!(verify_chain(&all).is_intact());
    }
}
