//! Document enumeration.

use crate::error::{CliError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Whether `path` has a `.pdf` extension, in any case.
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Documents to process for `path`.
///
/// A file must be a PDF. A directory yields its PDF files (not its subdirectories),
/// sorted by path, and must contain at least one.
pub fn discover_documents(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        if !is_pdf(path) {
            return Err(CliError::InvalidInput(format!(
                "{} is not a PDF document",
                path.display()
            )));
        }
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        return Err(CliError::InvalidInput(format!(
            "{} is neither a file nor a directory",
            path.display()
        )));
    }

    let mut documents = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.is_file() && is_pdf(&entry_path) {
            documents.push(entry_path);
        }
    }
    documents.sort();

    if documents.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "No PDF documents found in {}",
            path.display()
        )));
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"%PDF").unwrap();
        path
    }

    #[test]
    fn test_pdf_extension_is_case_insensitive() {
        assert!(is_pdf(Path::new("a.pdf")));
        assert!(is_pdf(Path::new("B.PDF")));
        assert!(is_pdf(Path::new("c.Pdf")));
        assert!(!is_pdf(Path::new("d.pdf.json")));
        assert!(!is_pdf(Path::new("pdf")));
    }

    #[test]
    fn test_directory_lists_only_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        let b = touch(dir.path(), "b.PDF");
        let a = touch(dir.path(), "a.pdf");
        touch(dir.path(), "a.pdf.json");
        touch(dir.path(), "notes.txt");
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub"), "deep.pdf");

        assert_eq!(discover_documents(dir.path()).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_single_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let doc = touch(dir.path(), "acme.pdf");
        assert_eq!(discover_documents(&doc).unwrap(), vec![doc]);
    }

    #[test]
    fn test_single_non_pdf_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let doc = touch(dir.path(), "acme.docx");
        assert!(matches!(discover_documents(&doc), Err(CliError::InvalidInput(_))));
    }

    #[test]
    fn test_empty_directory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "readme.md");
        let err = discover_documents(dir.path()).unwrap_err();
        assert!(err.to_string().contains("No PDF documents"));
    }

    #[test]
    fn test_missing_path_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_documents(&dir.path().join("missing")).unwrap_err();
        assert!(err.to_string().contains("neither a file nor a directory"));
    }
}
