//! Line-oriented variable scripts used to persist settings.
//!
//! ```text
//! #begin
//! display_width int 1280
//! title string "Umbra engine"
//! #end
//! ```

pub mod value;
pub mod variable_script;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use value::Value;
pub use variable_script::{Variable, VariableScript};

/// Extension every variable script file must carry.
pub const SCRIPT_EXTENSION: &str = "var";

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unsupported variable script extension: {0}")]
    UnsupportedExtension(PathBuf),
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
    #[error("#begin on line {0} has no matching #end")]
    UnterminatedBlock(usize),
}
