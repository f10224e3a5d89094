use std::str::FromStr;

use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};

const MAX_LEN: usize = 256;

/// A newsletter title or subtitle
#[derive(Debug, PartialEq, Clone)]
pub struct Headline(String);

impl AsRef<str> for Headline {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Headline> for String {
    fn from(value: Headline) -> Self {
        value.0
    }
}

impl FromStr for Headline {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();

        if value.is_empty() {
            return Err(Error::Validation("Headline cannot be empty".into()));
        }
        if value.graphemes(true).count() > MAX_LEN {
            return Err(Error::Validation("Headline too long".into()));
        }
        Ok(Self(value.to_string()))
    }
}
