use std::collections::HashSet;
use std::fmt;

use crate::{Result, SieveError};

pub const SORT_ORDER_COORDINATE: &str = "coordinate";
pub const SORT_ORDER_UNKNOWN: &str = "unknown";

/// One header line's `TG:value` fields, in the order they were set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeaderRecord {
    fields: Vec<(String, String)>,
}
impl HeaderRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `TG:value` fields split by `sep`. Empty fields are ignored.
    ///
    /// ```rust
    /// use samsieve::HeaderRecord;
    ///
    /// let rg = HeaderRecord::parse("ID:group1 SM:sample1", ' ').unwrap();
    /// assert_eq!(rg.get("ID"), Some("group1"));
    /// assert_eq!(rg.get("SM"), Some("sample1"));
    /// ```
    pub fn parse(text: &str, sep: char) -> Result<Self> {
        let mut record = Self::new();
        for field in text.split(sep).filter(|f| !f.is_empty()) {
            match field.split_once(':') {
                Some((tag, value)) if tag.len() == 2 => record.set(tag, value),
                _ => return Err(SieveError::MalformedHeader(text.to_string())),
            }
        }
        Ok(record)
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, v)| v.as_str())
    }

    /// Replaces the value of an existing tag in place, or appends a new one.
    pub fn set(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        let tag = tag.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(t, _)| *t == tag) {
            Some((_, v)) => *v = value,
            None => self.fields.push((tag, value)),
        }
    }

    pub fn remove(&mut self, tag: &str) -> Option<String> {
        let pos = self.fields.iter().position(|(t, _)| t == tag)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (tag, value) in iter {
            record.set(tag, value);
        }
        record
    }
}

impl fmt::Display for HeaderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (tag, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str("\t")?;
            }
            write!(f, "{}:{}", tag, value)?;
        }
        Ok(())
    }
}

/// Per-run SAM header.
///
/// `sq` order defines reference indices. `user_records` holds record types
/// outside the SAM standard, keyed by their full type (`"@sr"`), in the order
/// each type first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    pub hd: HeaderRecord,
    pub sq: Vec<HeaderRecord>,
    pub rg: Vec<HeaderRecord>,
    pub pg: Vec<HeaderRecord>,
    pub co: Vec<String>,
    pub user_records: Vec<(String, Vec<HeaderRecord>)>,
}
impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_order(&self) -> Option<&str> {
        self.hd.get("SO")
    }

    pub fn set_sort_order(&mut self, sort_order: &str) {
        self.hd.set("SO", sort_order);
    }

    /// Position of `name` in the reference dictionary.
    pub fn reference_index(&self, name: &str) -> Option<usize> {
        self.sq.iter().position(|entry| entry.get("SN") == Some(name))
    }

    pub fn reference_names(&self) -> impl Iterator<Item = &str> {
        self.sq.iter().filter_map(|entry| entry.get("SN"))
    }

    /// Records of a non-standard type such as `"@sr"`.
    pub fn user_records(&self, kind: &str) -> Option<&[HeaderRecord]> {
        self.user_records
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, entries)| entries.as_slice())
    }

    /// Appends a record of a non-standard type after any earlier ones.
    pub fn push_user_record(&mut self, kind: &str, record: HeaderRecord) {
        match self.user_records.iter_mut().find(|(k, _)| k == kind) {
            Some((_, entries)) => entries.push(record),
            None => self.user_records.push((kind.to_string(), vec![record])),
        }
    }

    /// Removes every record of a non-standard type, returning them.
    pub fn remove_user_records(&mut self, kind: &str) -> Option<Vec<HeaderRecord>> {
        let pos = self.user_records.iter().position(|(k, _)| k == kind)?;
        Some(self.user_records.remove(pos).1)
    }

    /// Checks that every reference entry has an `SN` and that no `SN` repeats.
    pub fn validate(&self) -> Result<()> {
        validate_dictionary(&self.sq)
    }

    /// Adds one SAM text header line (`@XX\t...`) to the header.
    pub fn parse_line(&mut self, line: &str) -> Result<()> {
        let line = line.trim_end_matches(['\n', '\r']);
        let (kind, rest) = match line.split_once('\t') {
            Some((kind, rest)) => (kind, rest),
            None => (line, ""),
        };
        if kind.len() != 3 || !kind.starts_with('@') {
            return Err(SieveError::MalformedHeader(line.to_string()));
        }
        if kind == "@CO" {
            self.co.push(rest.to_string());
            return Ok(());
        }
        let record = HeaderRecord::parse(rest, '\t')
            .map_err(|_| SieveError::MalformedHeader(line.to_string()))?;
        match kind {
            "@HD" => {
                for (tag, value) in record.iter() {
                    self.hd.set(tag, value);
                }
            }
            "@SQ" => self.sq.push(record),
            "@RG" => self.rg.push(record),
            "@PG" => self.pg.push(record),
            _ => self.push_user_record(kind, record),
        }
        Ok(())
    }
}

/// Reference dictionaries must name every entry, and names must be unique.
pub(crate) fn validate_dictionary(dict: &[HeaderRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(dict.len());
    for (index, entry) in dict.iter().enumerate() {
        let name = entry
            .get("SN")
            .ok_or(SieveError::MissingSequenceName { index })?;
        if !seen.insert(name) {
            return Err(SieveError::DuplicateReference(name.to_string()));
        }
    }
    Ok(())
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.hd.is_empty() {
            writeln!(f, "@HD\t{}", self.hd)?;
        }
        for entry in &self.sq {
            writeln!(f, "@SQ\t{}", entry)?;
        }
        for entry in &self.rg {
            writeln!(f, "@RG\t{}", entry)?;
        }
        for entry in &self.pg {
            writeln!(f, "@PG\t{}", entry)?;
        }
        for comment in &self.co {
            writeln!(f, "@CO\t{}", comment)?;
        }
        for (kind, entries) in &self.user_records {
            for entry in entries {
                if entry.is_empty() {
                    writeln!(f, "{}", kind)?;
                } else {
                    writeln!(f, "{}\t{}", kind, entry)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Header {
        let mut header = Header::new();
        for line in text.lines() {
            header.parse_line(line).unwrap();
        }
        header
    }

    #[test]
    fn test_parse_header_lines() {
        let header = parse(
            "@HD\tVN:1.6\tSO:coordinate\n\
             @SQ\tSN:chr1\tLN:248956422\n\
             @SQ\tSN:chr2\tLN:242193529\n\
             @RG\tID:rg1\tSM:s1\n\
             @PG\tID:bwa\tPN:bwa\n\
             @CO\tfree text: with colon\n\
             @sr\tco:optional records\n",
        );

        assert_eq!(header.sort_order(), Some("coordinate"));
        assert_eq!(header.hd.get("VN"), Some("1.6"));
        assert_eq!(header.sq.len(), 2);
        assert_eq!(header.reference_index("chr2"), Some(1));
        assert_eq!(header.reference_index("chrM"), None);
        assert_eq!(header.rg[0].get("SM"), Some("s1"));
        assert_eq!(header.pg[0].get("ID"), Some("bwa"));
        assert_eq!(header.co, vec!["free text: with colon".to_string()]);
        assert_eq!(header.user_records("@sr").map(<[_]>::len), Some(1));
    }

    #[test]
    fn test_header_display_order() {
        let text = "@HD\tVN:1.6\tSO:unknown\n\
                    @SQ\tSN:chr1\tLN:10\n\
                    @RG\tID:rg1\n\
                    @PG\tID:p1\n\
                    @CO\tcomment\n\
                    @sr\tco:x\n";
        let header = parse(text);
        assert_eq!(header.to_string(), text);
    }

    #[test]
    fn test_user_records_keep_input_order() {
        let text = "@zz\tID:1\n\
                    @aa\tID:2\n\
                    @zz\tID:3\n";
        let mut header = parse(text);
        let kinds: Vec<_> = header.user_records.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(kinds, vec!["@zz", "@aa"]);
        assert_eq!(header.to_string(), "@zz\tID:1\n@zz\tID:3\n@aa\tID:2\n");

        assert_eq!(header.remove_user_records("@zz").map(|r| r.len()), Some(2));
        assert!(header.user_records("@zz").is_none());
        assert_eq!(header.to_string(), "@aa\tID:2\n");
    }

    #[test]
    fn test_set_keeps_position() {
        let mut record: HeaderRecord = [("ID", "a"), ("PP", "b")].into_iter().collect();
        record.set("ID", "c");
        assert_eq!(record.to_string(), "ID:c\tPP:b");
        assert_eq!(record.remove("PP"), Some("b".to_string()));
        assert!(!record.contains("PP"));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_value_may_contain_colon() {
        let record = HeaderRecord::parse("ID:p1\tCL:bwa mem -R @RG\\tID:x ref.fa", '\t').unwrap();
        assert_eq!(record.get("CL"), Some("bwa mem -R @RG\\tID:x ref.fa"));
    }

    #[test]
    fn test_malformed_lines() {
        let mut header = Header::new();
        assert!(matches!(
            header.parse_line("SQ\tSN:chr1"),
            Err(SieveError::MalformedHeader(_))
        ));
        assert!(matches!(
            header.parse_line("@SQ\tSNchr1"),
            Err(SieveError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_validate_dictionary() {
        let header = parse("@SQ\tSN:chr1\n@SQ\tSN:chr2\n");
        assert!(header.validate().is_ok());

        let header = parse("@SQ\tSN:chr1\n@SQ\tSN:chr1\n");
        assert!(matches!(
            header.validate(),
            Err(SieveError::DuplicateReference(name)) if name == "chr1"
        ));

        let header = parse("@SQ\tSN:chr1\n@SQ\tLN:5\n");
        assert!(matches!(
            header.validate(),
            Err(SieveError::MissingSequenceName { index: 1 })
        ));
    }
}
