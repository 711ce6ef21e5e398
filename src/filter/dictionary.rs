use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use crate::constructs::validate_dictionary;
use crate::filter::{BoxedAlignmentFilter, Filter};
use crate::io::read_header;
use crate::{Alignment, Header, HeaderRecord, Result, SORT_ORDER_COORDINATE, SORT_ORDER_UNKNOWN};

/// Replaces the reference sequence dictionary and drops alignments whose
/// `RNAME` is not in the new dictionary.
///
/// A `coordinate` sort order survives only if the sequences shared with the
/// old dictionary keep their relative order; otherwise it becomes `unknown`.
#[derive(Debug, Clone)]
pub struct ReplaceReferenceSequenceDictionary {
    dict: Vec<HeaderRecord>,
}
impl ReplaceReferenceSequenceDictionary {
    /// Fails if an entry lacks `SN` or two entries share one.
    pub fn new(dict: Vec<HeaderRecord>) -> Result<Self> {
        validate_dictionary(&dict)?;
        Ok(Self { dict })
    }

    /// Uses the `@SQ` lines of another SAM file (or sequence dictionary).
    ///
    /// The file is closed before this returns, whether or not parsing succeeded.
    ///
    /// # Errors
    ///
    /// * [`SieveError::Io`](crate::SieveError::Io) if the file cannot be read
    /// * [`SieveError::MalformedHeader`](crate::SieveError::MalformedHeader) for a bad header line
    /// * [`SieveError::DuplicateReference`](crate::SieveError::DuplicateReference) if an `SN` repeats
    pub fn from_sam_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let header = read_header(path)?;
        Self::new(header.sq)
    }

    pub fn dictionary(&self) -> &[HeaderRecord] {
        &self.dict
    }
}

/// Whether the new dictionary keeps the old order of the names both share.
///
/// Stops at the first name whose old index does not increase.
fn preserves_order(old: &[HeaderRecord], new: &[HeaderRecord]) -> bool {
    let mut old_index: HashMap<&str, usize> = HashMap::with_capacity(old.len());
    for (i, entry) in old.iter().enumerate() {
        if let Some(sn) = entry.get("SN") {
            old_index.entry(sn).or_insert(i);
        }
    }
    let mut previous: Option<usize> = None;
    for name in new.iter().filter_map(|entry| entry.get("SN")) {
        let Some(&pos) = old_index.get(name) else {
            continue;
        };
        if previous.is_some_and(|prev| pos <= prev) {
            return false;
        }
        previous = Some(pos);
    }
    true
}

impl Filter for ReplaceReferenceSequenceDictionary {
    fn apply(&self, header: &mut Header) -> Option<BoxedAlignmentFilter> {
        if header.sort_order() == Some(SORT_ORDER_COORDINATE)
            && !preserves_order(&header.sq, &self.dict)
        {
            log::warn!("New sequence dictionary reorders references; sort order set to unknown");
            header.set_sort_order(SORT_ORDER_UNKNOWN);
        }

        let names: Arc<HashSet<String>> = Arc::new(
            self.dict
                .iter()
                .filter_map(|entry| entry.get("SN"))
                .map(str::to_string)
                .collect(),
        );
        header.sq = self.dict.clone();

        Some(Box::new(move |aln: &mut Alignment| {
            names.contains(aln.rname.as_str())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pipeline;

    fn dict(names: &[&str]) -> Vec<HeaderRecord> {
        names
            .iter()
            .map(|name| [("SN", *name), ("LN", "1000")].into_iter().collect())
            .collect()
    }

    fn header(sort_order: &str, names: &[&str]) -> Header {
        let mut header = Header::new();
        header.set_sort_order(sort_order);
        header.sq = dict(names);
        header
    }

    fn replace(header: &mut Header, names: &[&str]) -> crate::RecordFilter {
        let filter = ReplaceReferenceSequenceDictionary::new(dict(names)).unwrap();
        Pipeline::new().with(filter).apply(header)
    }

    #[test]
    fn test_same_order_keeps_coordinate() {
        let mut h = header("coordinate", &["chr1", "chr2", "chr3"]);
        replace(&mut h, &["chr1", "chr2", "chr3"]);
        assert_eq!(h.sort_order(), Some("coordinate"));
    }

    #[test]
    fn test_swapped_order_downgrades() {
        let mut h = header("coordinate", &["chr1", "chr2", "chr3"]);
        replace(&mut h, &["chr2", "chr1", "chr3"]);
        assert_eq!(h.sort_order(), Some("unknown"));
        assert_eq!(h.reference_index("chr2"), Some(0));
    }

    #[test]
    fn test_new_names_do_not_constrain() {
        let mut h = header("coordinate", &["chr1", "chr2", "chr3"]);
        replace(&mut h, &["chrM", "chr1", "chrX", "chr3", "chrY"]);
        assert_eq!(h.sort_order(), Some("coordinate"));
    }

    #[test]
    fn test_dropping_names_keeps_coordinate() {
        let mut h = header("coordinate", &["chr1", "chr2", "chr3"]);
        replace(&mut h, &["chr1", "chr3"]);
        assert_eq!(h.sort_order(), Some("coordinate"));
    }

    #[test]
    fn test_other_sort_orders_untouched() {
        let mut h = header("queryname", &["chr1", "chr2"]);
        replace(&mut h, &["chr2", "chr1"]);
        assert_eq!(h.sort_order(), Some("queryname"));
    }

    #[test]
    fn test_drops_unknown_references() {
        let mut h = header("unsorted", &["chr1", "chr2"]);
        let records = replace(&mut h, &["chr2"]);

        let mut aln = Alignment {
            rname: "chr2".to_string(),
            ..Default::default()
        };
        assert!(records.keep(&mut aln));
        aln.rname = "chr1".to_string();
        assert!(!records.keep(&mut aln));
        aln.rname = "*".to_string();
        assert!(!records.keep(&mut aln));
    }

    #[test]
    fn test_preserves_order_examples() {
        let old = dict(&["a", "b", "c", "d"]);
        assert!(preserves_order(&old, &dict(&["a", "c", "d"])));
        assert!(preserves_order(&old, &dict(&[])));
        assert!(!preserves_order(&old, &dict(&["a", "d", "b"])));
        assert!(!preserves_order(&old, &dict(&["d", "a", "b", "c"])));
    }

    #[test]
    fn test_rejects_invalid_dictionary() {
        assert!(ReplaceReferenceSequenceDictionary::new(dict(&["chr1", "chr1"])).is_err());
        let unnamed: HeaderRecord = [("LN", "5")].into_iter().collect();
        assert!(ReplaceReferenceSequenceDictionary::new(vec![unnamed]).is_err());
    }

    #[test]
    fn test_from_sam_file() {
        let path = std::env::temp_dir().join("samsieve_test_from_sam_file.dict");
        std::fs::write(
            &path,
            "@HD\tVN:1.6\n@SQ\tSN:chrB\tLN:20\n@SQ\tSN:chrA\tLN:10\n",
        )
        .unwrap();

        let filter = ReplaceReferenceSequenceDictionary::from_sam_file(&path).unwrap();
        let names: Vec<_> = filter
            .dictionary()
            .iter()
            .filter_map(|e| e.get("SN"))
            .collect();
        assert_eq!(names, vec!["chrB", "chrA"]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_from_malformed_sam_file() {
        let path = std::env::temp_dir().join("samsieve_test_malformed.dict");
        std::fs::write(&path, "@HD\tVN:1.6\n@SQ\tSNchrA\tLN:10\n").unwrap();
        let result = ReplaceReferenceSequenceDictionary::from_sam_file(&path);
        assert!(matches!(result, Err(crate::SieveError::MalformedHeader(_))));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_from_sam_file_with_duplicate_names() {
        let path = std::env::temp_dir().join("samsieve_test_duplicate.dict");
        std::fs::write(&path, "@SQ\tSN:chrA\tLN:10\n@SQ\tSN:chrA\tLN:20\n").unwrap();
        let result = ReplaceReferenceSequenceDictionary::from_sam_file(&path);
        assert!(matches!(
            result,
            Err(crate::SieveError::DuplicateReference(name)) if name == "chrA"
        ));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_from_missing_sam_file() {
        let result = ReplaceReferenceSequenceDictionary::from_sam_file("/nonexistent/ref.dict");
        assert!(matches!(result, Err(crate::SieveError::Io(_))));
    }
}
