//! Train/test splitting of interaction logs.
//!
//! ## Algorithm
//! 1. Partition the log into train and test (by timestamp or at random)
//! 2. Optionally drop test rows whose user is absent from train
//! 3. Optionally drop test rows whose item is absent from train
//!
//! Cold items are dropped by default and cold users kept, so test users
//! without history can still be scored by feature-based models.

use crate::error::{Result, SplitError};
use crate::method::SplitMethod;
use data_loader::{Interaction, InteractionLog, ItemId, Timestamp, UserId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Result of splitting a log
#[derive(Debug, Clone, Default)]
pub struct LogSplit {
    pub train: InteractionLog,
    pub test: InteractionLog,
}

/// Splits interaction logs into train and test parts
#[derive(Debug, Clone, Copy)]
pub struct LogSplitter {
    drop_cold_users: bool,
    drop_cold_items: bool,
}

impl LogSplitter {
    /// Create a splitter that keeps cold users and drops cold items
    pub fn new() -> Self {
        Self {
            drop_cold_users: false,
            drop_cold_items: true,
        }
    }

    /// Drop test interactions of users absent from train (default: false)
    pub fn with_drop_cold_users(mut self, drop: bool) -> Self {
        self.drop_cold_users = drop;
        self
    }

    /// Drop test interactions with items absent from train (default: true)
    pub fn with_drop_cold_items(mut self, drop: bool) -> Self {
        self.drop_cold_items = drop;
        self
    }

    /// Split according to `method`
    pub fn split(&self, log: &InteractionLog, method: SplitMethod) -> Result<LogSplit> {
        match method {
            SplitMethod::ByDate { test_start } => self.split_by_date(log, test_start),
            SplitMethod::Randomly { test_size, seed } => self.split_randomly(log, test_size, seed),
        }
    }

    /// Everything before `test_start` is train, the rest is test
    #[instrument(skip(self, log), fields(rows = log.len()))]
    pub fn split_by_date(&self, log: &InteractionLog, test_start: Timestamp) -> Result<LogSplit> {
        if log.is_empty() {
            return Err(SplitError::EmptyLog);
        }
        let (train, test): (Vec<Interaction>, Vec<Interaction>) = log
            .as_slice()
            .par_iter()
            .cloned()
            .partition(|interaction| interaction.timestamp < test_start);

        Ok(self.finish(train, test))
    }

    /// A seeded random `test_size` fraction of rows goes to test
    #[instrument(skip(self, log), fields(rows = log.len()))]
    pub fn split_randomly(
        &self,
        log: &InteractionLog,
        test_size: f64,
        seed: u64,
    ) -> Result<LogSplit> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(SplitError::InvalidTestSize(test_size));
        }
        if log.is_empty() {
            return Err(SplitError::EmptyLog);
        }

        let mut indices: Vec<usize> = (0..log.len()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let n_test = ((log.len() as f64) * test_size).round() as usize;
        let test_rows: HashSet<usize> = indices.into_iter().take(n_test).collect();

        let mut train = Vec::with_capacity(log.len() - test_rows.len());
        let mut test = Vec::with_capacity(test_rows.len());
        for (idx, interaction) in log.iter().enumerate() {
            if test_rows.contains(&idx) {
                test.push(*interaction);
            } else {
                train.push(*interaction);
            }
        }

        Ok(self.finish(train, test))
    }

    fn finish(&self, train: Vec<Interaction>, test: Vec<Interaction>) -> LogSplit {
        let train_users: HashSet<UserId> = train.iter().map(|i| i.user_id).collect();
        let train_items: HashSet<ItemId> = train.iter().map(|i| i.item_id).collect();

        let test_len = test.len();
        let test: Vec<Interaction> = test
            .into_iter()
            .filter(|i| !self.drop_cold_users || train_users.contains(&i.user_id))
            .filter(|i| !self.drop_cold_items || train_items.contains(&i.item_id))
            .collect();

        debug!(
            "Split into {} train and {} test rows ({} cold test rows dropped)",
            train.len(),
            test.len(),
            test_len - test.len()
        );

        LogSplit {
            train: InteractionLog::from_interactions(train),
            test: InteractionLog::from_interactions(test),
        }
    }
}

impl Default for LogSplitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The six-row log used by the popular-scenario demo, timestamps as days
    fn demo_log() -> InteractionLog {
        InteractionLog::from_interactions(vec![
            Interaction::new(1, 1, 1.0, 8),
            Interaction::new(2, 2, 2.0, 9),
            Interaction::new(1, 3, 1.0, 10),
            Interaction::new(1, 1, 1.0, 11),
            Interaction::new(1, 2, 1.0, 12),
            Interaction::new(3, 3, 2.0, 13),
        ])
    }

    #[test]
    fn test_split_by_date() {
        let split = LogSplitter::new().split_by_date(&demo_log(), 11).unwrap();

        assert_eq!(split.train.len(), 3);
        assert!(split.train.iter().all(|i| i.timestamp < 11));
        // all three test items also appear in train, user 3 is cold but kept
        assert_eq!(split.test.len(), 3);
        assert!(split.test.iter().any(|i| i.user_id == 3));
    }

    #[test]
    fn test_drop_cold_users() {
        let split = LogSplitter::new()
            .with_drop_cold_users(true)
            .split_by_date(&demo_log(), 11)
            .unwrap();

        assert_eq!(split.test.len(), 2);
        assert!(split.test.iter().all(|i| i.user_id == 1));
    }

    #[test]
    fn test_drop_cold_items() {
        let log = InteractionLog::from_interactions(vec![
            Interaction::new(1, 1, 1.0, 1),
            Interaction::new(1, 2, 1.0, 5),
            Interaction::new(1, 1, 1.0, 6),
        ]);

        let dropped = LogSplitter::new().split_by_date(&log, 5).unwrap();
        assert_eq!(dropped.test.len(), 1);
        assert_eq!(dropped.test.as_slice()[0].item_id, 1);

        let kept = LogSplitter::new()
            .with_drop_cold_items(false)
            .split_by_date(&log, 5)
            .unwrap();
        assert_eq!(kept.test.len(), 2);
    }

    #[test]
    fn test_split_randomly_is_seeded() {
        let splitter = LogSplitter::new().with_drop_cold_items(false);
        let a = splitter.split_randomly(&demo_log(), 0.4, 1234).unwrap();
        let b = splitter.split_randomly(&demo_log(), 0.4, 1234).unwrap();

        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);
        // round(6 * 0.4) = 2
        assert_eq!(a.test.len(), 2);
        assert_eq!(a.train.len(), 4);
    }

    #[test]
    fn test_invalid_test_size() {
        let splitter = LogSplitter::new();
        for size in [0.0, 1.0, -0.1, f64::NAN] {
            assert!(matches!(
                splitter.split_randomly(&demo_log(), size, 1),
                Err(SplitError::InvalidTestSize(_))
            ));
        }
    }

    #[test]
    fn test_empty_log() {
        let err = LogSplitter::new()
            .split_by_date(&InteractionLog::new(), 0)
            .unwrap_err();
        assert!(matches!(err, SplitError::EmptyLog));
    }
}
