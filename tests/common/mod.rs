#![allow(dead_code)]

use scanmerge::storage::IssueStore;
use std::sync::Once;

pub mod fixtures;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(scanmerge::logging::init_test_logging);
}

pub fn test_db() -> IssueStore {
    init_test_logging();
    IssueStore::open_memory().expect("Failed to create test database")
}
