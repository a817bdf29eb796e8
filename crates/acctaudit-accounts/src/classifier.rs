//! Human / system partitioning of the account directory

use acctaudit_common::config::ClassificationConfig;
use acctaudit_core::AccountRecord;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Partitions accounts by uid
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    human_floor: u32,
    uid_ceiling: u32,
}

/// Result of one classification pass
///
/// Both buckets are keyed by account name, so iteration is sorted and each
/// name appears at most once across the two buckets.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Classification {
    pub human: BTreeMap<String, AccountRecord>,
    pub system: BTreeMap<String, AccountRecord>,
    /// Accounts above the uid ceiling (e.g. `nobody` at 65534)
    pub excluded: BTreeSet<String>,
    /// Records read, duplicates included
    pub total_read: usize,
    /// Records dropped because their name had already been seen
    pub duplicates: usize,
}

impl Classification {
    pub fn human_names(&self) -> Vec<String> {
        self.human.keys().cloned().collect()
    }

    pub fn system_names(&self) -> Vec<String> {
        self.system.keys().cloned().collect()
    }

    pub fn system_accounts(&self) -> impl Iterator<Item = &AccountRecord> {
        self.system.values()
    }
}

impl Classifier {
    pub fn new(human_floor: u32, uid_ceiling: u32) -> Self {
        Self {
            human_floor,
            uid_ceiling,
        }
    }

    pub fn from_config(config: &ClassificationConfig) -> Self {
        Self::new(config.human_floor, config.uid_ceiling)
    }

    pub fn is_human(&self, uid: u32) -> bool {
        uid >= self.human_floor && uid <= self.uid_ceiling
    }

    pub fn is_system(&self, uid: u32) -> bool {
        uid < self.human_floor
    }

    /// Partition records; the first record seen for a name decides its bucket
    pub fn classify<I>(&self, records: I) -> Classification
    where
        I: IntoIterator<Item = AccountRecord>,
    {
        let mut result = Classification::default();

        for record in records {
            result.total_read += 1;

            let seen = result.human.contains_key(&record.name)
                || result.system.contains_key(&record.name)
                || result.excluded.contains(&record.name);
            if seen {
                debug!("Duplicate entry for {} (uid {}) ignored", record.name, record.uid);
                result.duplicates += 1;
                continue;
            }

            if self.is_system(record.uid) {
                result.system.insert(record.name.clone(), record);
            } else if self.is_human(record.uid) {
                result.human.insert(record.name.clone(), record);
            } else {
                debug!("{} (uid {}) above uid ceiling, excluded", record.name, record.uid);
                result.excluded.insert(record.name);
            }
        }

        result
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&ClassificationConfig::default())
    }
}
