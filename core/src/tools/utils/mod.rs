//! Tool utilities

pub mod webpage;

pub use webpage::{chunk_text_by_token_size, clean_source_text, extract_text_from_html, extract_url};
