//! Study answer grades

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::Error;

/// How the user rated their recall of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Easy,
    Hard,
    Yes,
    No,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Easy => "easy",
            Grade::Hard => "hard",
            Grade::Yes => "yes",
            Grade::No => "no",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Grade::Easy),
            "hard" => Ok(Grade::Hard),
            "yes" => Ok(Grade::Yes),
            "no" => Ok(Grade::No),
            other => Err(Error::validation(format!(
                "Unknown grade '{}' (expected easy, hard, yes or no)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grades() {
        assert_eq!("yes".parse::<Grade>().unwrap(), Grade::Yes);
        assert_eq!(" No ".parse::<Grade>().unwrap(), Grade::No);
        assert_eq!("EASY".parse::<Grade>().unwrap(), Grade::Easy);
        assert_eq!("hard".parse::<Grade>().unwrap(), Grade::Hard);
        assert!("maybe".parse::<Grade>().is_err());
    }
}
