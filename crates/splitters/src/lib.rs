//! # Splitters Crate
//!
//! Validation schemes that turn one interaction log into the train/test
//! bundle a hyperparameter search runs against.
//!
//! ## Components
//!
//! ### By-date split
//! Everything before a cutoff timestamp trains the model, everything
//! after it is held out. Train and test never share a
//! (user, item, timestamp) triple.
//!
//! ### Random split
//! A seeded shuffle sends a fixed fraction of rows to test.
//!
//! Both schemes can drop cold users and cold items from the test part.
//!
//! ## Example Usage
//!
//! ```ignore
//! use splitters::{build_split_data, LogSplitter, SplitMethod};
//!
//! let split = build_split_data(
//!     &LogSplitter::new(),
//!     &log,
//!     SplitMethod::ByDate { test_start: 1_570_752_000 },
//!     None,
//!     None,
//!     None,
//!     None,
//! )?;
//! ```

pub mod error;
pub mod method;
pub mod splitter;

pub use error::{Result, SplitError};
pub use method::{SplitKind, SplitMethod};
pub use splitter::{LogSplit, LogSplitter};

use data_loader::{FeatureTable, InteractionLog, ItemId, SplitData, UserId};
use std::collections::BTreeSet;
use tracing::info;

/// Split `log` and assemble a validated [`SplitData`].
///
/// Missing candidate users/items default to every user/item of the full
/// log, so they are computed once per search run and not once per trial.
pub fn build_split_data(
    splitter: &LogSplitter,
    log: &InteractionLog,
    method: SplitMethod,
    users: Option<BTreeSet<UserId>>,
    items: Option<BTreeSet<ItemId>>,
    user_features: Option<FeatureTable>,
    item_features: Option<FeatureTable>,
) -> Result<SplitData> {
    let LogSplit { train, test } = splitter.split(log, method)?;
    info!(
        "Split log ({}): train={} test={}",
        method.kind(),
        train.len(),
        test.len()
    );

    let users = users.unwrap_or_else(|| log.users());
    let items = items.unwrap_or_else(|| log.items());

    let split = SplitData::new(train, test, users, items, user_features, item_features)?;
    if let SplitMethod::ByDate { .. } = method {
        split.check_disjoint()?;
    }
    Ok(split)
}
