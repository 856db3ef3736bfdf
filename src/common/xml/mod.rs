//! XML text helpers shared by the package reader and writer.

mod escape;

pub use escape::{escape_text, escape_xml, unescape_xml};
