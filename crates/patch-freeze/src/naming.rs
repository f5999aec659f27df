//! Frozen channel names.
//!
//! A frozen clone of channel `L` is labelled `<label>-<date>.L`. [`ChannelNaming::freeze`]
//! builds that name and [`ChannelNaming::thaw`] strips it again, so
//! `thaw(freeze(L)) == Some(L)` for every `L`.

use regex::Regex;
use satprep_common::{Error, FreezeDate, Result};

/// Label used when none is given.
pub const DEFAULT_LABEL: &str = "satprep";

/// Normalise a user supplied label: drop whitespace, trim dashes, lowercase.
pub fn normalize_label(raw: &str) -> Result<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let label = compact.trim_matches('-').to_lowercase();
    if label.is_empty() {
        return Err(Error::Config(format!("invalid freeze label '{}'", raw)));
    }
    if label.contains('.') {
        return Err(Error::Config(format!(
            "freeze label '{}' must not contain dots",
            raw
        )));
    }
    Ok(label)
}

/// Naming scheme for one label/date pair.
#[derive(Debug, Clone)]
pub struct ChannelNaming {
    label: String,
    date: FreezeDate,
    prefix: String,
    /// Same label, any ISO date.
    any_date: Regex,
}

impl ChannelNaming {
    pub fn new(label: &str, date: FreezeDate) -> Result<Self> {
        let label = normalize_label(label)?;
        let prefix = format!("{}-{}.", label, date);
        let any_date = Regex::new(&format!(
            r"^{}-\d{{4}}-\d{{2}}-\d{{2}}\.(.+)$",
            regex::escape(&label)
        ))
        .map_err(|e| Error::Config(format!("invalid freeze label '{}': {}", label, e)))?;

        Ok(Self {
            label,
            date,
            prefix,
            any_date,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn date(&self) -> &FreezeDate {
        &self.date
    }

    /// The `<label>-<date>.` prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Frozen name of `original`.
    pub fn freeze(&self, original: &str) -> String {
        format!("{}{}", self.prefix, original)
    }

    /// Original label of a frozen name, `None` if `frozen` is not ours.
    pub fn thaw<'a>(&self, frozen: &'a str) -> Option<&'a str> {
        frozen
            .strip_prefix(self.prefix.as_str())
            .filter(|original| !original.is_empty())
    }

    /// Original identity of any subscribed label.
    ///
    /// Strips this run's prefix, or a prefix of the same label with another
    /// ISO date; other labels are returned unchanged.
    pub fn original<'a>(&self, label: &'a str) -> &'a str {
        if let Some(original) = self.thaw(label) {
            return original;
        }
        match self.any_date.captures(label).and_then(|c| c.get(1)) {
            Some(original) => original.as_str(),
            None => label,
        }
    }

    /// Human readable channel name of a clone.
    pub fn clone_name(&self, original: &str) -> String {
        format!("{} clone from {} ({})", original, self.date, self.label)
    }
}
