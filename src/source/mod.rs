//! Reading tracked programs' source text back in, so diagnostics can quote
//! the offending lines.
//!
//! Nothing here knows about allocations; this is a dumb "give me the file and
//! its lines" service that the renderer leans on. Failures are loud on
//! purpose -- a path that cannot be opened must never come back as an empty
//! file, or the renderer would quietly annotate nothing.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

/// Why a source file could not be fetched
#[non_exhaustive]
#[derive(Debug)]
pub enum SourceError {
    /// The file at `path` could not be opened or read
    FailedOpening { path: PathBuf, source: io::Error },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::FailedOpening { path, source } => {
                write!(f, "failed opening {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourceError::FailedOpening { source, .. } => Some(source),
        }
    }
}

/// Read the full contents of `path`
pub fn load_file(path: &Path) -> Result<String, SourceError> {
    fs::read_to_string(path).map_err(|source| SourceError::FailedOpening {
        path: path.to_path_buf(),
        source,
    })
}

/// Split `data` into newline-delimited records. The record after the final
/// newline is always included, so `"a\nb\n"` yields `["a", "b", ""]` and the
/// 1-based line numbers of an editor map directly onto indices + 1.
pub fn partition_data(data: &str) -> Vec<&str> {
    data.split('\n').collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn partition_keeps_trailing_record() {
        assert_eq!(partition_data("a\nb\n"), vec!["a", "b", ""]);
        assert_eq!(partition_data("a\nb"), vec!["a", "b"]);
        assert_eq!(partition_data(""), vec![""]);
        assert_eq!(partition_data("\n"), vec!["", ""]);
    }

    #[test]
    fn partition_preserves_indentation() {
        let lines = partition_data("fn main() {\n    let x = 5;\n}\n");
        assert_eq!(lines[1], "    let x = 5;");
    }

    #[test]
    fn load_file_round_trips() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"line one\nline two\n").unwrap();
        file.flush().unwrap();
        let data = load_file(file.path()).unwrap();
        assert_eq!(partition_data(&data)[1], "line two");
    }

    #[test]
    fn load_file_fails_distinctly_for_missing_path() {
        let missing = Path::new("/definitely/not/a/real/file.rs");
        let err = load_file(missing).unwrap_err();
        let SourceError::FailedOpening { path, .. } = err;
        assert_eq!(path, missing);
    }
}
