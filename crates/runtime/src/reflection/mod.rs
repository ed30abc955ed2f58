//! Self-reflection: grading contract, structured extraction and scoring

pub mod extract;
pub mod grade;
pub mod scoring;

pub use extract::{reflection_extract_schema, ReflectionExtractor, StructuredExtractor};
pub use grade::{Dimension, GradeValidator, LetterGrade};
pub use scoring::{numerical_score, Reflection, ReflectionExtract, ScoredReflection};
