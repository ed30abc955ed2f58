//! Reflection assembly and scoring
//!
//! Both reflection strategies end here: grades from the concise path are
//! paired with catalog reason codes, extracts from the reasoning path are
//! taken as-is, and either way the score comes from [`numerical_score`].

use serde::{Deserialize, Serialize};

use super::grade::{Dimension, LetterGrade};
use crate::prompts::PromptCatalog;
use crate::types::ConfigError;

/// A grade on one dimension with its justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub rating: LetterGrade,
    pub reason: String,
}

/// The three per-dimension reflections, without a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionExtract {
    pub completeness: Reflection,
    pub accuracy: Reflection,
    pub reasoning: Reflection,
}

impl ReflectionExtract {
    /// Ratings in dimension order.
    pub fn ratings(&self) -> [LetterGrade; 3] {
        [
            self.completeness.rating,
            self.accuracy.rating,
            self.reasoning.rating,
        ]
    }

    pub fn get(&self, dimension: Dimension) -> &Reflection {
        match dimension {
            Dimension::Completeness => &self.completeness,
            Dimension::Accuracy => &self.accuracy,
            Dimension::Reasoning => &self.reasoning,
        }
    }

    /// First dimension whose reason is blank, if any.
    pub fn blank_reason(&self) -> Option<Dimension> {
        Dimension::ALL
            .into_iter()
            .find(|d| self.get(*d).reason.trim().is_empty())
    }
}

/// A reflection extract with its derived confidence score.
///
/// The score is only ever computed from the ratings; there is no way to
/// build one with an arbitrary score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredReflection {
    #[serde(flatten)]
    extract: ReflectionExtract,
    numerical_score: f64,
}

impl ScoredReflection {
    /// Concise path: pair each grade with its catalog reason code.
    pub fn from_letter_grades(
        grades: [LetterGrade; 3],
        catalog: &PromptCatalog,
    ) -> Result<Self, ConfigError> {
        let [completeness, accuracy, reasoning] = grades;
        let reflect = |dimension: Dimension, rating: LetterGrade| -> Result<Reflection, ConfigError> {
            Ok(Reflection {
                rating,
                reason: catalog.reason_code(dimension, rating)?.to_string(),
            })
        };

        let extract = ReflectionExtract {
            completeness: reflect(Dimension::Completeness, completeness)?,
            accuracy: reflect(Dimension::Accuracy, accuracy)?,
            reasoning: reflect(Dimension::Reasoning, reasoning)?,
        };
        Ok(Self::from_extract(extract))
    }

    /// Reasoning path: score a model-produced extract.
    pub fn from_extract(extract: ReflectionExtract) -> Self {
        let numerical_score = numerical_score(extract.ratings());
        Self {
            extract,
            numerical_score,
        }
    }

    pub fn numerical_score(&self) -> f64 {
        self.numerical_score
    }

    pub fn extract(&self) -> &ReflectionExtract {
        &self.extract
    }

    pub fn completeness(&self) -> &Reflection {
        &self.extract.completeness
    }

    pub fn accuracy(&self) -> &Reflection {
        &self.extract.accuracy
    }

    pub fn reasoning(&self) -> &Reflection {
        &self.extract.reasoning
    }
}

/// Mean of the three grade values, rounded to two decimals.
pub fn numerical_score(grades: [LetterGrade; 3]) -> f64 {
    let sum: f64 = grades.iter().map(|g| g.value()).sum();
    (sum / 3.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use LetterGrade::{A, B, C};

    fn catalog() -> PromptCatalog {
        let mut yaml = String::from(
            "respond_score:\n  system_prompt: s\n  concise_addition: c\n  user_message_template: \"{query} {answer}\"\n  reason_codes:\n",
        );
        for d in Dimension::ALL {
            yaml.push_str(&format!("    {}:\n", d));
            for g in LetterGrade::ALL {
                yaml.push_str(&format!("      {}: \"{} {}\"\n", g, d, g));
            }
        }
        PromptCatalog::from_yaml_str(&yaml).unwrap()
    }

    fn reflection(rating: LetterGrade, reason: &str) -> Reflection {
        Reflection {
            rating,
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_score_examples() {
        assert_eq!(numerical_score([A, A, A]), 1.0);
        assert_eq!(numerical_score([B, B, B]), 0.0);
        assert_eq!(numerical_score([A, C, B]), 0.5);
        assert_eq!(numerical_score([C, B, B]), 0.17);
        assert_eq!(numerical_score([A, B, B]), 0.33);
        assert_eq!(numerical_score([A, C, A]), 0.83);
        assert_eq!(numerical_score([A, A, B]), 0.67);
    }

    #[test]
    fn test_score_takes_only_documented_values() {
        let allowed = [0.0, 0.17, 0.33, 0.5, 0.67, 0.83, 1.0];
        for a in LetterGrade::ALL {
            for b in LetterGrade::ALL {
                for c in LetterGrade::ALL {
                    let score = numerical_score([a, b, c]);
                    assert!(allowed.contains(&score), "{}{}{} -> {}", a, b, c, score);
                }
            }
        }
    }

    #[test]
    fn test_both_paths_agree() {
        let catalog = catalog();
        let from_grades = ScoredReflection::from_letter_grades([A, B, C], &catalog).unwrap();
        let from_extract = ScoredReflection::from_extract(ReflectionExtract {
            completeness: reflection(A, "model says complete"),
            accuracy: reflection(B, "model unsure"),
            reasoning: reflection(C, "model so-so"),
        });

        assert_eq!(from_grades.numerical_score(), 0.5);
        assert_eq!(from_grades.numerical_score(), from_extract.numerical_score());
        assert_eq!(from_grades.accuracy().reason, "accuracy B");
    }

    #[test]
    fn test_missing_reason_code_surfaces() {
        let catalog = PromptCatalog::from_yaml_str(
            "respond_score:\n  system_prompt: s\n  concise_addition: c\n  user_message_template: \"{query} {answer}\"\n  reason_codes:\n    completeness:\n      A: ok\n",
        )
        .unwrap();
        let err = ScoredReflection::from_letter_grades([A, A, A], &catalog).unwrap_err();
        assert!(matches!(err, ConfigError::MissingReasonCode { ref dimension, .. } if dimension == "accuracy"));
    }

    #[test]
    fn test_serialized_shape() {
        let scored = ScoredReflection::from_letter_grades([A, A, C], &catalog()).unwrap();
        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["completeness"]["rating"], "A");
        assert_eq!(json["reasoning"]["reason"], "reasoning C");
        assert_eq!(json["numerical_score"], 0.83);
    }

    #[test]
    fn test_blank_reason_detected() {
        let extract = ReflectionExtract {
            completeness: reflection(A, "fine"),
            accuracy: reflection(A, "  "),
            reasoning: reflection(A, "fine"),
        };
        assert_eq!(extract.blank_reason(), Some(Dimension::Accuracy));
    }
}
