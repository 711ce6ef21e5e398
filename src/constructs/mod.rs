mod alignment;
mod header;

pub use alignment::{flag, Alignment, Tag, TagValue, Tags};
pub(crate) use header::validate_dictionary;
pub use header::{Header, HeaderRecord, SORT_ORDER_COORDINATE, SORT_ORDER_UNKNOWN};
