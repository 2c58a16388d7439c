//! Rendering and writing of the Markdown digest.

mod export;

use thiserror::Error;

pub use export::{FILENAME_PREFIX, output_filename, render_markdown, write_digest};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateDir {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}
