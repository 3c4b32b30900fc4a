use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Opaque identifier of a fungible token (contract address, mint, symbol).
///
/// The ledger compares token ids byte-for-byte and never interprets them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(String);

impl TokenId {
    /// Create a token id. Blank ids and ids with surrounding whitespace are
    /// rejected, so the string form always parses back to the same id.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(TypeError::InvalidCurrency("token id must not be empty".into()));
        }
        if id.trim() != id {
            return Err(TypeError::InvalidCurrency(format!(
                "token id `{id}` has surrounding whitespace"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The unit a deposit is denominated in.
///
/// Two currencies are equal iff both are `Native`, or both are `Token` with
/// equal ids. Serialized as `"native"` or `"token:<id>"`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    /// The pool's native currency.
    #[default]
    Native,
    /// A fungible token identified by an opaque id.
    Token(TokenId),
}

impl Currency {
    /// Shorthand for a token currency.
    pub fn token(id: impl Into<String>) -> Result<Self, TypeError> {
        Ok(Self::Token(TokenId::new(id)?))
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Token(id) => write!(f, "token:{id}"),
        }
    }
}

impl FromStr for Currency {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("native") {
            return Ok(Self::Native);
        }
        match s.strip_prefix("token:") {
            Some(id) => Self::token(id),
            None => Err(TypeError::InvalidCurrency(format!(
                "expected `native` or `token:<id>`, got `{s}`"
            ))),
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.to_string()
    }
}
