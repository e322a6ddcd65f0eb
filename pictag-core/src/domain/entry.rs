use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned identifier of a catalog entry (the SQLite row id).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl EntryId {
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(EntryId)
    }
}

impl From<i64> for EntryId {
    fn from(value: i64) -> Self {
        EntryId(value)
    }
}

/// Separator used when persisting the ordered label terms.
pub const LABEL_SEPARATOR: &str = ", ";

/// Non-empty, comma-space-joined label terms returned by a label provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Labels(String);

impl Labels {
    /// Join provider terms in their original order. Blank terms are dropped;
    /// returns `None` when nothing usable is left.
    pub fn from_terms<I, S>(terms: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = terms
            .into_iter()
            .filter_map(|term| {
                let trimmed = term.as_ref().trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect::<Vec<_>>()
            .join(LABEL_SEPARATOR);

        (!joined.is_empty()).then_some(Labels(joined))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.0.split(LABEL_SEPARATOR)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A catalog entry before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCatalogEntry {
    pub name: String,
    pub location: String,
    pub labels: Labels,
}

/// A persisted image record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: EntryId,
    pub name: String,
    /// Web URL or local path under the upload directory.
    pub location: String,
    pub labels: String,
}

/// The projection list views work with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub id: EntryId,
    pub name: String,
    pub location: String,
}

impl From<CatalogEntry> for EntrySummary {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            location: entry.location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_keep_provider_order() {
        let labels = Labels::from_terms(["chicken", "food", "frying"]).unwrap();
        assert_eq!(labels.as_str(), "chicken, food, frying");
        assert_eq!(
            labels.terms().collect::<Vec<_>>(),
            vec!["chicken", "food", "frying"]
        );
    }

    #[test]
    fn labels_drop_blank_terms() {
        let labels = Labels::from_terms(["  chicken ", "", "   ", "food"]).unwrap();
        assert_eq!(labels.as_str(), "chicken, food");
    }

    #[test]
    fn labels_require_at_least_one_term() {
        assert!(Labels::from_terms(Vec::<String>::new()).is_none());
        assert!(Labels::from_terms(["", " "]).is_none());
    }

    #[test]
    fn entry_id_parses_path_segments() {
        assert_eq!("42".parse::<EntryId>().unwrap(), EntryId(42));
        assert_eq!(" 7 ".parse::<EntryId>().unwrap(), EntryId(7));
        assert!("abc".parse::<EntryId>().is_err());
    }
}
