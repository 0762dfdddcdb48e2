//! Menu languages: the global catalog and per-restaurant configuration.

use serde::{Deserialize, Serialize};

use super::LanguageId;

/// An entry of the global language catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: LanguageId,
    /// BCP 47 code, e.g. `pt-BR`.
    pub code: String,
    pub name: String,
    pub native_name: String,
    pub flag: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
}

/// A catalog language as configured for one restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantLanguage {
    pub language_id: LanguageId,
    pub code: String,
    pub name: String,
    pub native_name: String,
    pub flag: Option<String>,
    /// Restaurant-specific ordering.
    pub display_order: i32,
    pub is_default: bool,
    pub is_active: bool,
}

/// One requested language in an add or bulk update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageAssignment {
    pub code: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub is_default: bool,
}

/// Number of entries flagged as default; a bulk update accepts at most one.
#[must_use]
pub fn count_defaults(assignments: &[LanguageAssignment]) -> usize {
    assignments.iter().filter(|a| a.is_default).count()
}

/// The active default among configured languages, if any.
#[must_use]
pub fn active_default(languages: &[RestaurantLanguage]) -> Option<&RestaurantLanguage> {
    languages.iter().find(|l| l.is_active && l.is_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(code: &str, is_default: bool) -> LanguageAssignment {
        LanguageAssignment {
            code: code.to_owned(),
            display_order: 0,
            is_default,
        }
    }

    #[test]
    fn test_count_defaults() {
        assert_eq!(count_defaults(&[]), 0);
        assert_eq!(
            count_defaults(&[assignment("pt-BR", true), assignment("en", false)]),
            1
        );
        assert_eq!(
            count_defaults(&[assignment("pt-BR", true), assignment("en", true)]),
            2
        );
    }

    #[test]
    fn test_active_default_ignores_inactive() {
        let language = RestaurantLanguage {
            language_id: LanguageId::new(1),
            code: "pt-BR".to_owned(),
            name: "Portuguese".to_owned(),
            native_name: "Português".to_owned(),
            flag: None,
            display_order: 0,
            is_default: true,
            is_active: false,
        };
        assert!(active_default(std::slice::from_ref(&language)).is_none());

        let active = RestaurantLanguage {
            is_active: true,
            ..language
        };
        assert_eq!(active_default(&[active]).map(|l| l.code.as_str()), Some("pt-BR"));
    }
}
