use std::collections::HashMap;
use std::sync::Arc;

use crate::filter::{BoxedAlignmentFilter, Filter};
use crate::{Alignment, Header, HeaderRecord};

/// Replaces all `@RG` lines with one read group and tags every alignment with it.
#[derive(Debug, Clone)]
pub struct AddOrReplaceReadGroup {
    read_group: HeaderRecord,
}
impl AddOrReplaceReadGroup {
    pub fn new(read_group: HeaderRecord) -> Self {
        Self { read_group }
    }
}

impl Filter for AddOrReplaceReadGroup {
    fn apply(&self, header: &mut Header) -> Option<BoxedAlignmentFilter> {
        header.rg = vec![self.read_group.clone()];
        let id: Arc<str> = self.read_group.get("ID").unwrap_or_default().into();
        Some(Box::new(move |aln: &mut Alignment| {
            aln.set_read_group(&id);
            true
        }))
    }
}

/// Annotates each alignment with the index of its `RNAME` in `@SQ`, or -1.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddRefId;

impl Filter for AddRefId {
    fn apply(&self, header: &mut Header) -> Option<BoxedAlignmentFilter> {
        let index: Arc<HashMap<String, i32>> = Arc::new(
            header
                .sq
                .iter()
                .enumerate()
                .filter_map(|(i, entry)| entry.get("SN").map(|sn| (sn.to_string(), i as i32)))
                .collect(),
        );
        Some(Box::new(move |aln: &mut Alignment| {
            aln.refid = Some(index.get(aln.rname.as_str()).copied().unwrap_or(-1));
            true
        }))
    }
}

/// Prefixes reference names in `@SQ` and in every `RNAME`/`RNEXT`.
///
/// `*` and `=` are left alone.
#[derive(Debug, Clone)]
pub struct RenameChromosomes {
    prefix: Arc<str>,
}
impl RenameChromosomes {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}
impl Default for RenameChromosomes {
    fn default() -> Self {
        Self::new("chr")
    }
}

fn is_sentinel(name: &str) -> bool {
    name == "*" || name == "="
}

fn prefix_name(prefix: &str, name: &mut String) {
    if !is_sentinel(name) {
        name.insert_str(0, prefix);
    }
}

impl Filter for RenameChromosomes {
    fn apply(&self, header: &mut Header) -> Option<BoxedAlignmentFilter> {
        for entry in header.sq.iter_mut() {
            if let Some(sn) = entry.get("SN") {
                let renamed = format!("{}{}", self.prefix, sn);
                entry.set("SN", renamed);
            }
        }
        let prefix = Arc::clone(&self.prefix);
        Some(Box::new(move |aln: &mut Alignment| {
            prefix_name(&prefix, &mut aln.rname);
            prefix_name(&prefix, &mut aln.rnext);
            true
        }))
    }
}
