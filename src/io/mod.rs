mod reader;
mod split;
mod writer;

pub use reader::{read_header, Reader};
pub use split::{split_file_per_chromosome, OutputFormat, UNMAPPED_SUFFIX};
pub use writer::{BoxedWriter, Writer};
