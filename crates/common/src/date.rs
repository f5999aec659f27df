//! Freeze date token.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Date token embedded in frozen channel labels.
///
/// Usually an ISO date (`2024-01-15`), but any token without whitespace or
/// dots is accepted so that freezes made with custom tokens can be reverted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FreezeDate(String);

impl FreezeDate {
    /// Today's date in local time.
    pub fn today() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    /// Create a token from a calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        FreezeDate(date.format("%Y-%m-%d").to_string())
    }

    /// Get the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for FreezeDate {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.is_empty() {
            return Err(crate::Error::Config("freeze date must not be empty".into()));
        }
        if token.chars().any(|c| c.is_whitespace() || c == '.') {
            return Err(crate::Error::Config(format!(
                "freeze date '{}' must not contain whitespace or dots",
                token
            )));
        }
        Ok(FreezeDate(token.to_string()))
    }
}

impl fmt::Display for FreezeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_iso(date: &FreezeDate) -> bool {
        NaiveDate::parse_from_str(date.as_str(), "%Y-%m-%d").is_ok()
    }

    #[test]
    fn test_from_date_format() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(FreezeDate::from_date(date).as_str(), "2024-01-15");
    }

    #[test]
    fn test_parse_token() {
        let date: FreezeDate = " 2024-01-15 ".parse().unwrap();
        assert_eq!(date.to_string(), "2024-01-15");
        assert!(is_iso(&date));

        let custom: FreezeDate = "q1release".parse().unwrap();
        assert!(!is_iso(&custom));
    }

    #[test]
    fn test_reject_bad_tokens() {
        assert!("".parse::<FreezeDate>().is_err());
        assert!("2024 01 15".parse::<FreezeDate>().is_err());
        assert!("2024.01.15".parse::<FreezeDate>().is_err());
    }

    #[test]
    fn test_today_is_iso() {
        assert!(is_iso(&FreezeDate::today()));
    }
}
