// file: src/address.rs
// description: account address monitored by the listener

use crate::error::{ListenerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

const BASE32_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Raw account address in plain (undashed, upper-case) form.
///
/// Symbol addresses are 39 base32 characters, early NEM2 test networks
/// used 40; both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(input: &str) -> Result<Self> {
        let plain: String = input
            .trim()
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if !(39..=40).contains(&plain.len()) {
            return Err(ListenerError::InvalidAddress(format!(
                "{} has {} characters",
                input,
                plain.len()
            )));
        }

        if let Some(bad) = plain.chars().find(|c| !BASE32_ALPHABET.contains(*c)) {
            return Err(ListenerError::InvalidAddress(format!(
                "{} contains '{}'",
                input, bad
            )));
        }

        Ok(Self(plain))
    }

    pub fn plain(&self) -> &str {
        &self.0
    }

    /// Dash separated groups of six characters.
    pub fn pretty(&self) -> String {
        self.0
            .as_bytes()
            .chunks(6)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Compares against an address as it appears in a channel topic.
    pub fn matches(&self, other: &str) -> bool {
        Address::parse(other).is_ok_and(|parsed| parsed == *self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = ListenerError;

    fn try_from(value: String) -> Result<Self> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}
