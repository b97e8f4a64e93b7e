//! Fixed marker tables for the report format this pipeline targets.
//! Keep matching rules next to the data so every stage agrees on them.

/// Default directory holding the downloaded reports
pub const DEFAULT_BASE_DIR: &str = "statista_data";

/// Sibling directory every stage writes into
pub const TRANSFORMED_DIR: &str = "transformed";

/// Basename substring marking advanced-report files (matched case-insensitively)
pub const ADVANCED_MARKER: &str = "adv";

/// Suffix appended to the probability CSV produced by the last stage
pub const PROBABILITY_SUFFIX: &str = "_transformed";

/// Sheets dropped by the first stage (exact, case-sensitive)
pub const REMOVED_SHEETS: &[&str] = &["Overview", "Content", "Lists"];

/// Name of the single sheet produced by the merge stage
pub const MERGED_SHEET: &str = "Merged Data";

/// Substrings identifying boilerplate rows in a report sheet
pub const METADATA_MARKERS: &[&str] = &[
    "Survey Name:",
    "Base n =",
    "Question Type:",
    "Population:",
    "Low base",
    "Survey period",
];

/// Substrings identifying columns that carry totals, percentages or income brackets
pub const PRUNED_COLUMN_MARKERS: &[&str] = &[
    "Grand Total",
    "in %",
    "Low income",
    "Middle income",
    "High income",
    "Household income",
    "Net income",
    "net income",
    "in EUR",
    "in €",
    "in USD",
    "in US$",
    "in GBP",
    "in £",
    "in CZK",
    "in Kč",
];

/// Substrings identifying demographic section rows dropped alongside the columns above
pub const PRUNED_ROW_MARKERS: &[&str] = &["Gender", "Age (basic)"];

/// Column-label substring denoting a sample-size denominator
pub const BASE_COLUMN_MARKER: &str = "_ Base";

/// pandas label for a blank first header cell, renamed by the join stage
pub const UNNAMED_FIRST_COLUMN: &str = "Unnamed: 0";
pub const TOPIC_COLUMN: &str = "Topic";

/// Substring identifying an age-range label
pub const AGE_RANGE_MARKER: &str = "years";

/// Phrases recognized as question lead-ins besides a trailing question mark
pub const QUESTION_PHRASES: &[&str] = &["(multi-pick)", "(single-pick)"];
pub const QUESTION_LEAD_IN: &str = "Thinking about";

/// Characters removed from a question before it becomes a label prefix
pub const QUESTION_PUNCTUATION: &[char] = &[',', ':', '.', '"', '\'', '“', '”', '‘', '’'];

/// Generation labels and their birth-year bounds
pub const GENERATIONS: &[(&str, i32, i32)] = &[
    ("Gen Z (1995-2012)", 1995, 2012),
    ("Generation Z (1995-2012)", 1995, 2012),
    ("Generace Z (1995-2012)", 1995, 2012),
    ("Millennials (1980-1994)", 1980, 1994),
    ("Gen Y (1980-1994)", 1980, 1994),
    ("Mileniálové (1980-1994)", 1980, 1994),
    ("Gen X (1965-1979)", 1965, 1979),
    ("Generation X (1965-1979)", 1965, 1979),
    ("Generace X (1965-1979)", 1965, 1979),
    ("Baby Boomers (1946-1964)", 1946, 1964),
    ("Baby boomers (1946-1964)", 1946, 1964),
    ("Babyboomer (1946-1964)", 1946, 1964),
];

/// Sheet names the transformability score rewards
pub const SCORE_LOOKUP_SHEETS: &[&str] = &[
    "overview",
    "content",
    "characteristics & demographics",
    "demographics",
];

/// Column prefixes the transformability score rewards
pub const SCORE_LOOKUP_COLUMNS: &[&str] = &["age", "gender"];

/// Gender tokens recognized in demographic rows.
///
/// "Male"/"Female" is the minimum contract; other casings are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("female") {
            Some(Gender::Female)
        } else if trimmed.eq_ignore_ascii_case("male") {
            Some(Gender::Male)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
        }
    }
}

/// Superscript and exponent characters stripped by the advanced filter
pub fn is_superscript(c: char) -> bool {
    matches!(c, '\u{00B2}' | '\u{00B3}' | '\u{00B9}' | '\u{2070}'..='\u{209F}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parse_accepts_case_variants() {
        assert_eq!(Gender::parse("Male"), Some(Gender::Male));
        assert_eq!(Gender::parse(" FEMALE "), Some(Gender::Female));
        assert_eq!(Gender::parse("female"), Some(Gender::Female));
        assert_eq!(Gender::parse("Males"), None);
    }

    #[test]
    fn test_superscripts() {
        assert!(is_superscript('¹'));
        assert!(is_superscript('⁴'));
        assert!(!is_superscript('4'));
    }
}
