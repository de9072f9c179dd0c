use super::config::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobValidationError {
    TooManyFiles(String),
    BadRequest(String),
}

/// Edge validation for an upload request, applied before a job is built.
pub fn validate_job_input(
    config: &AppConfig,
    file_count: usize,
    batch_size: usize,
) -> Result<(), JobValidationError> {
    if file_count == 0 {
        return Err(JobValidationError::BadRequest(
            "No files provided for ingestion".to_string(),
        ));
    }

    if file_count > config.ingest_max_files {
        return Err(JobValidationError::TooManyFiles(format!(
            "Too many files. Maximum allowed is {}",
            config.ingest_max_files
        )));
    }

    if batch_size == 0 {
        return Err(JobValidationError::BadRequest(
            "Batch size must be a positive integer".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_job_input_rejects_empty_file_list() {
        let config = AppConfig::default();
        let result = validate_job_input(&config, 0, 16);

        assert!(matches!(result, Err(JobValidationError::BadRequest(_))));
    }

    #[test]
    fn validate_job_input_rejects_too_many_files() {
        let config = AppConfig {
            ingest_max_files: 1,
            ..AppConfig::default()
        };
        let result = validate_job_input(&config, 2, 16);

        assert!(matches!(result, Err(JobValidationError::TooManyFiles(_))));
    }

    #[test]
    fn validate_job_input_rejects_zero_batch_size() {
        let config = AppConfig::default();
        let result = validate_job_input(&config, 1, 0);

        assert!(matches!(result, Err(JobValidationError::BadRequest(_))));
    }

    #[test]
    fn validate_job_input_accepts_valid_request() {
        let config = AppConfig::default();
        let result = validate_job_input(&config, 3, 16);

        assert!(result.is_ok());
    }
}
