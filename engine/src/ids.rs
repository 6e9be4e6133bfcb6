//! Identifier generation.
//!
//! The pipeline never invents identifiers itself; it asks an injected
//! `IdSource`. `SequentialIds` is deterministic and suited to tests and
//! reproducible runs, `RandomIds` mirrors the labels the dashboard shows.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::model::EntryId;

/// Source of entry ids and synthetic labels.
pub trait IdSource: Send + Sync {
    /// A fresh entry id, never returned before by this source.
    fn entry_id(&self) -> EntryId;

    /// Folder label for a bulk file that has no folder of its own.
    fn folder_name(&self) -> String;

    /// Deal identifier (`DEAL-...`).
    fn deal_id(&self) -> String;

    /// Placeholder customer name for a synthesized bulk deal.
    fn customer_name(&self) -> String;
}

/// Counter-backed ids: `entry_id` values are `Uuid::from_u128(n)`.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        SequentialIds {
            next: AtomicU64::new(1),
        }
    }

    fn bump(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for SequentialIds {
    fn entry_id(&self) -> EntryId {
        EntryId::from_u128(u128::from(self.bump()))
    }

    fn folder_name(&self) -> String {
        format!("Deal-{:06}", self.bump())
    }

    fn deal_id(&self) -> String {
        format!("DEAL-{:06}", self.bump())
    }

    fn customer_name(&self) -> String {
        format!("Customer {}", self.bump())
    }
}

/// Random v4 entry ids and timestamp-based deal ids.
///
/// Deal ids use the current Unix time in milliseconds, bumped forward when
/// two requests land in the same millisecond so they stay distinct.
#[derive(Debug, Default)]
pub struct RandomIds {
    last_deal_millis: AtomicI64,
}

impl RandomIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for RandomIds {
    fn entry_id(&self) -> EntryId {
        EntryId::new(Uuid::new_v4())
    }

    fn folder_name(&self) -> String {
        const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        let suffix: String = (0..6)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        format!("Deal-{}", suffix)
    }

    fn deal_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_deal_millis.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last_deal_millis.compare_exchange_weak(
                last,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format!("DEAL-{}", candidate),
                Err(actual) => last = actual,
            }
        }
    }

    fn customer_name(&self) -> String {
        format!("Customer {}", rand::thread_rng().gen_range(0..1000))
    }
}
