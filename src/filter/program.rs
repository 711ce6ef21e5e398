use std::collections::HashSet;

use rand::Rng;

use crate::filter::{BoxedAlignmentFilter, Filter};
use crate::{Header, HeaderRecord};

/// Appends a `@PG` record to the end of the program chain.
///
/// The record's `ID` gets random four-digit hex suffixes until it is unique,
/// and its `PP` points at the current tail of the chain. Header-only.
#[derive(Debug, Clone)]
pub struct AddPgLine {
    record: HeaderRecord,
}
impl AddPgLine {
    /// # Arguments
    ///
    /// * `record` - The `@PG` fields to add; its `ID` is the base for the
    ///   unique identifier, and `PP` is set to the current chain tail if any
    ///
    /// # Examples
    ///
    /// ```rust
    /// use samsieve::{AddPgLine, Header, HeaderRecord, Pipeline};
    ///
    /// let mut header = Header::new();
    /// header.parse_line("@PG\tID:bwa\tPN:bwa").unwrap();
    ///
    /// let pg: HeaderRecord = [("ID", "bwa"), ("PN", "samsieve")].into_iter().collect();
    /// Pipeline::new().with(AddPgLine::new(pg)).apply(&mut header);
    ///
    /// assert_eq!(header.pg.len(), 2);
    /// assert_ne!(header.pg[1].get("ID"), Some("bwa"));
    /// assert_eq!(header.pg[1].get("PP"), Some("bwa"));
    /// ```
    pub fn new(record: HeaderRecord) -> Self {
        Self { record }
    }
}

/// First record, in header order, that no other record names as its `PP`.
///
/// With several disconnected chains this is the tail of whichever chain's
/// tail comes first in the header, which is not necessarily the chain the
/// caller meant to extend.
fn chain_tail(pg: &[HeaderRecord]) -> Option<&str> {
    let referenced: HashSet<&str> = pg.iter().filter_map(|entry| entry.get("PP")).collect();
    pg.iter()
        .filter_map(|entry| entry.get("ID"))
        .find(|id| !referenced.contains(id))
}

impl Filter for AddPgLine {
    fn apply(&self, header: &mut Header) -> Option<BoxedAlignmentFilter> {
        let mut record = self.record.clone();

        let ids: HashSet<&str> = header.pg.iter().filter_map(|entry| entry.get("ID")).collect();
        let mut id = record.get("ID").unwrap_or_default().to_string();
        if ids.contains(id.as_str()) {
            let mut rng = rand::rng();
            while ids.contains(id.as_str()) {
                id.push_str(&format!("{:04x}", rng.random_range(0..0x10000u32)));
            }
            log::warn!("Program record ID collision; using {} instead", id);
        }
        record.set("ID", id);

        if let Some(tail) = chain_tail(&header.pg) {
            record.set("PP", tail);
        }
        header.pg.push(record);
        None
    }
}
