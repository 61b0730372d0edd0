// Raw header text handling: tokenizing, version detection, reconstruction
pub mod tokenizer;
pub mod version;

pub use tokenizer::{
    format_header_line, latin1_to_string, read_header_lines, reconstruct_header_lines,
    string_to_latin1, Header, HeaderError, HEADER_END_MARKER, HEADER_EOL, HEADER_START_MARKER,
};
pub use version::FormatVersion;
