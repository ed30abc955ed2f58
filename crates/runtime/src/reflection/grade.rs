//! Letter grades, reflection dimensions and the three-grade output contract

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::GradeValidationError;

/// Coarse confidence label for one dimension.
///
/// `A` is the most confident, `B` the least and `C` sits in between. Only
/// the numeric value is meaningful; grades are not ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LetterGrade {
    A,
    B,
    C,
}

impl LetterGrade {
    pub const ALL: [LetterGrade; 3] = [LetterGrade::A, LetterGrade::B, LetterGrade::C];

    /// Numeric weight used for scoring.
    pub fn value(self) -> f64 {
        match self {
            LetterGrade::A => 1.0,
            LetterGrade::B => 0.0,
            LetterGrade::C => 0.5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
        }
    }

    /// Parse a single grade character. Case-sensitive.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(LetterGrade::A),
            'B' => Some(LetterGrade::B),
            'C' => Some(LetterGrade::C),
            _ => None,
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three fixed reflection dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Completeness,
    Accuracy,
    Reasoning,
}

impl Dimension {
    /// Dimensions in grading order.
    pub const ALL: [Dimension; 3] = [
        Dimension::Completeness,
        Dimension::Accuracy,
        Dimension::Reasoning,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Completeness => "completeness",
            Dimension::Accuracy => "accuracy",
            Dimension::Reasoning => "reasoning",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks raw concise-reflection output against the three-letter contract.
pub struct GradeValidator;

impl GradeValidator {
    /// Validate model output, in order: present, exactly three characters,
    /// every character one of `A`, `B`, `C`.
    ///
    /// The text is taken as-is: no trimming, no case folding.
    pub fn validate(raw: Option<&str>) -> Result<[LetterGrade; 3], GradeValidationError> {
        let text = match raw {
            Some(text) if !text.is_empty() => text,
            _ => return Err(GradeValidationError::NoLetterGradesFound),
        };

        let length = text.chars().count();
        if length != 3 {
            return Err(GradeValidationError::LetterGradesNotThreeCharactersLong { length });
        }

        let mut grades = [LetterGrade::A; 3];
        for (slot, c) in grades.iter_mut().zip(text.chars()) {
            *slot = LetterGrade::from_char(c)
                .ok_or(GradeValidationError::InvalidLetterGrade { found: c })?;
        }
        Ok(grades)
    }
}
