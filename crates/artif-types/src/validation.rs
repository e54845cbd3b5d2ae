//! Validation results for component configuration

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: ValidationError) -> Self {
        self.valid = false;
        self.errors.push(error);
        self
    }

    pub fn with_warning(mut self, warning: ValidationWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.valid &= other.valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self
    }

    /// Add a `REQUIRED` error when `value` is blank
    pub fn require(self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.with_error(ValidationError::required(field))
        } else {
            self
        }
    }

    /// Add a warning when an optional `value` is blank
    pub fn recommend(self, field: &str, value: &str, suggestion: &str) -> Self {
        if value.trim().is_empty() {
            self.with_warning(ValidationWarning {
                field: field.to_string(),
                message: format!("{} is not set", field),
                suggestion: Some(suggestion.to_string()),
            })
        } else {
            self
        }
    }

    /// Error messages joined for a single-line report
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub code: String,
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        Self {
            field: field.to_string(),
            message: format!("{} must be set", field),
            code: "REQUIRED".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}
