//! Pre-publish validation.
//!
//! Runs every rule and reports the complete set of violations, so a
//! caller can fix an artifact in one pass instead of replaying the
//! publish to discover rules one at a time.

use thiserror::Error;

use crate::artifact::Artifact;

/// A single validation rule violation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is missing")]
    MissingTitle,

    #[error("Body is missing")]
    MissingBody,

    #[error("Body has {words} words, minimum is {min}")]
    BodyTooShort { words: u32, min: u32 },

    #[error("Overall score {score} is below the minimum {min}")]
    ScoreTooLow { score: u32, min: u32 },

    #[error("Focus keyword is missing")]
    MissingFocusKeyword,

    #[error("Meta title is missing")]
    MissingMetaTitle,

    #[error("Meta description is missing")]
    MissingMetaDescription,
}

/// Thresholds for publishability.
#[derive(Debug, Clone, Copy)]
pub struct ValidationLimits {
    pub min_word_count: u32,
    pub min_overall_score: u32,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            min_word_count: 500,
            min_overall_score: 50,
        }
    }
}

/// Checks an artifact against all rules. Empty result means publishable.
pub fn validate(artifact: &Artifact, limits: &ValidationLimits) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if artifact.title.trim().is_empty() {
        errors.push(ValidationError::MissingTitle);
    }

    if artifact.body_html.trim().is_empty() {
        errors.push(ValidationError::MissingBody);
    } else if artifact.word_count < limits.min_word_count {
        errors.push(ValidationError::BodyTooShort {
            words: artifact.word_count,
            min: limits.min_word_count,
        });
    }

    if artifact.quality.overall_score < limits.min_overall_score {
        errors.push(ValidationError::ScoreTooLow {
            score: artifact.quality.overall_score,
            min: limits.min_overall_score,
        });
    }

    if artifact.focus_keyword.trim().is_empty() {
        errors.push(ValidationError::MissingFocusKeyword);
    }

    if artifact.meta_title.trim().is_empty() {
        errors.push(ValidationError::MissingMetaTitle);
    }

    if artifact.meta_description.trim().is_empty() {
        errors.push(ValidationError::MissingMetaDescription);
    }

    errors
}
