use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use common::types::{
    document::{document_name, FailedDocument},
    ingestion_job::CustomMetadata,
    job_result::ValidationError,
};
use tracing::debug;

/// File types the extraction service can process.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "bmp", "docx", "html", "jpeg", "jpg", "json", "md", "pdf", "png", "pptx", "svg", "tiff",
    "txt",
];

/// Formats that need a Pandoc-enabled extraction build and get a distinct
/// rejection message.
const PANDOC_EXTENSIONS: &[&str] = &["rst", "rtf", "org"];

#[derive(Debug, Default)]
pub struct PrevalidationOutcome {
    pub accepted: Vec<PathBuf>,
    pub rejected: Vec<FailedDocument>,
}

#[derive(Debug, Default)]
pub struct MetadataValidation {
    pub errors: Vec<ValidationError>,
    /// Filenames whose metadata failed and must not reach extraction.
    pub rejected: Vec<FailedDocument>,
}

/// Resolves every file's fate before any extraction call. Checks run in
/// order and a filename is recorded at most once, no matter how many checks
/// would fire for it. None of these rejections are ever retried.
pub async fn prevalidate_files(
    filepaths: &[PathBuf],
    existing_documents: &HashSet<String>,
) -> PrevalidationOutcome {
    let mut outcome = PrevalidationOutcome::default();
    let mut seen_names: HashSet<String> = HashSet::new();

    for path in filepaths {
        let name = document_name(path);

        if !seen_names.insert(name.clone()) {
            outcome.rejected.push(FailedDocument::new(
                name,
                "Duplicate filename in the upload request",
            ));
            continue;
        }

        match reject_reason(path, &name, existing_documents).await {
            Some(reason) => {
                debug!(document_name = %name, %reason, "file rejected before extraction");
                outcome.rejected.push(FailedDocument::new(name, reason));
            }
            None => outcome.accepted.push(path.clone()),
        }
    }

    outcome
}

async fn reject_reason(
    path: &Path,
    name: &str,
    existing_documents: &HashSet<String>,
) -> Option<String> {
    // Strict resolution both verifies existence and defuses traversal
    // attempts: a path that escapes to a non-existent location fails here.
    let resolved = match tokio::fs::canonicalize(path).await {
        Ok(resolved) => resolved,
        Err(_) => {
            return Some(format!(
                "File not found or a directory traversal attack detected. Filepath: {}",
                path.display()
            ))
        }
    };

    match tokio::fs::metadata(&resolved).await {
        Ok(metadata) if metadata.is_file() => {}
        _ => return Some(format!("File {name} is not a regular file. Ingestion failed.")),
    }

    if existing_documents.contains(name) {
        return Some(format!(
            "Document {name} already exists. Use the update document operation instead."
        ));
    }

    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if PANDOC_EXTENSIONS.contains(&extension.as_str()) {
        return Some(format!(
            "Document {name} is not a supported format; .{extension} files require a Pandoc-enabled extraction build."
        ));
    }

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Some(format!(
            "Unsupported file type '.{extension}', supported file types are: {}",
            SUPPORTED_EXTENSIONS.join(", ")
        ));
    }

    None
}

/// Validates caller-supplied metadata against the upload. Entries that
/// reference a filename outside the request only produce a validation
/// error; entries with a malformed payload also reject the referenced file.
pub fn validate_custom_metadata(
    entries: &[CustomMetadata],
    filepaths: &[PathBuf],
) -> MetadataValidation {
    let filenames: HashSet<String> = filepaths.iter().map(|path| document_name(path)).collect();

    let mut validation = MetadataValidation::default();
    let mut rejected_names: HashSet<String> = HashSet::new();

    for entry in entries {
        if !filenames.contains(&entry.filename) {
            validation.errors.push(ValidationError {
                error: format!(
                    "Filename: {} is not provided in the ingestion request",
                    entry.filename
                ),
                document_name: Some(entry.filename.clone()),
            });
            continue;
        }

        if !entry.metadata.is_object() {
            validation.errors.push(ValidationError {
                error: format!(
                    "File '{}': metadata must be a JSON object",
                    entry.filename
                ),
                document_name: Some(entry.filename.clone()),
            });
            if rejected_names.insert(entry.filename.clone()) {
                validation.rejected.push(FailedDocument::new(
                    entry.filename.clone(),
                    format!("Metadata validation failed for {}", entry.filename),
                ));
            }
        }
    }

    validation
}
