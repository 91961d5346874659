//! Shared fixtures for tests
//!
//! RSA key generation dominates test time, so each test binary generates the
//! three well-known key pairs once and shares them.

use std::sync::OnceLock;

use crate::crypto::keys::{generate_key_pair, KeyPair};

fn fixture(cell: &'static OnceLock<KeyPair>) -> &'static KeyPair {
    cell.get_or_init(|| generate_key_pair().expect("fixture key generation"))
}

pub(crate) fn alice() -> &'static KeyPair {
    static CELL: OnceLock<KeyPair> = OnceLock::new();
    fixture(&CELL)
}

pub(crate) fn bob() -> &'static KeyPair {
    static CELL: OnceLock<KeyPair> = OnceLock::new();
    fixture(&CELL)
}

pub(crate) fn eve() -> &'static KeyPair {
    static CELL: OnceLock<KeyPair> = OnceLock::new();
    fixture(&CELL)
}
