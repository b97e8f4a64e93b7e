use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::{map_sheets, Stage, StageContext, StageResult};
use crate::constants::{Gender, QUESTION_LEAD_IN, QUESTION_PHRASES, QUESTION_PUNCTUATION};
use crate::error::Result;
use crate::workbook::{Cell, Table, Workbook};

/// Recognizes a question row from its first cell and extracts the question text
pub trait QuestionMatcher: Send + Sync {
    fn extract(&self, first_cell: &str) -> Option<String>;
}

/// Matcher backed by a regex whose first capture group is the question
#[derive(Debug, Clone)]
pub struct RegexQuestionMatcher {
    pattern: Regex,
}

impl RegexQuestionMatcher {
    pub fn new(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl QuestionMatcher for RegexQuestionMatcher {
    fn extract(&self, first_cell: &str) -> Option<String> {
        self.pattern
            .captures(first_cell)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|q| !q.is_empty())
    }
}

/// Trailing question mark, pick-type phrase, and "Thinking about" lead-in
static DEFAULT_MATCHERS: Lazy<Vec<RegexQuestionMatcher>> = Lazy::new(|| {
    let phrases = QUESTION_PHRASES
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    let patterns = [
        r"^\s*(.+\?)\s*$".to_string(),
        format!(r"^\s*(.*(?:{}).*?)\s*$", phrases),
        format!(r"^\s*({}\b.*?)\s*$", regex::escape(QUESTION_LEAD_IN)),
    ];
    patterns
        .iter()
        .filter_map(|p| RegexQuestionMatcher::new(p).ok())
        .collect()
});

pub fn default_question_matchers() -> Vec<Box<dyn QuestionMatcher>> {
    DEFAULT_MATCHERS
        .iter()
        .cloned()
        .map(|m| Box::new(m) as Box<dyn QuestionMatcher>)
        .collect()
}

fn matchers_from_patterns<'p>(
    patterns: impl Iterator<Item = &'p str>,
) -> Vec<Box<dyn QuestionMatcher>> {
    let mut matchers: Vec<Box<dyn QuestionMatcher>> = Vec::new();
    for pattern in patterns {
        match RegexQuestionMatcher::new(pattern) {
            Ok(matcher) => matchers.push(Box::new(matcher)),
            Err(e) => warn!("⚠️ Ignoring invalid question pattern '{}': {}", pattern, e),
        }
    }
    matchers
}

/// Stage 6: prefix answer rows with the question they belong to
pub struct AppendQuestionsStage {
    matchers: Vec<Box<dyn QuestionMatcher>>,
}

impl Default for AppendQuestionsStage {
    fn default() -> Self {
        Self::new(default_question_matchers())
    }
}

impl AppendQuestionsStage {
    pub fn new(matchers: Vec<Box<dyn QuestionMatcher>>) -> Self {
        Self { matchers }
    }

    /// Default matchers followed by the given extra patterns
    pub fn with_patterns(patterns: &[String]) -> Self {
        let mut matchers = default_question_matchers();
        matchers.extend(matchers_from_patterns(patterns.iter().map(String::as_str)));
        Self::new(matchers)
    }

    fn match_question(&self, first_cell: &Cell) -> Option<String> {
        let text = first_cell.as_str()?;
        self.matchers.iter().find_map(|m| m.extract(text))
    }

    pub fn append_questions(&self, mut table: Table) -> Table {
        let mut delete = vec![false; table.rows.len()];
        let mut current: Option<String> = None;

        for (i, row) in table.rows.iter_mut().enumerate() {
            let Some(first) = row.first_mut() else {
                continue;
            };
            if let Some(question) = self.match_question(first) {
                current = Some(question_label(&question));
                delete[i] = true;
                continue;
            }
            if let Some(label) = &current {
                if !first.is_empty() {
                    *first = Cell::Text(format!("{}{}", label, first.as_text()));
                }
            }
        }

        // leftover section headers sitting right above a gender row
        for i in 1..table.rows.len() {
            let gender_row = table.rows[i]
                .iter()
                .any(|cell| cell.as_str().and_then(Gender::parse).is_some());
            if gender_row && table.rows[i - 1].iter().skip(1).all(Cell::is_empty) {
                delete[i - 1] = true;
            }
        }

        let mut flags = delete.into_iter();
        table.rows.retain(|_| !flags.next().unwrap_or(false));
        table
    }
}

impl Stage for AppendQuestionsStage {
    fn name(&self) -> &'static str {
        "append_questions"
    }

    fn description(&self) -> &'static str {
        "Appending questions to options"
    }

    fn transform(&self, workbook: Workbook, ctx: &StageContext<'_>) -> Result<StageResult> {
        map_sheets(workbook, ctx, |sheet, grid| {
            let table = Table::from_grid(grid);
            let before = table.height();
            let table = self.append_questions(table);
            debug!(file = ctx.file, sheet, "Dropped {} question rows", before - table.height());
            Ok(table)
        })
    }
}

/// "Do you, own a bike?" -> "Do_you_own_a_bike?_"
pub fn question_label(question: &str) -> String {
    let stripped: String = question
        .chars()
        .filter(|c| !QUESTION_PUNCTUATION.contains(c))
        .collect();
    format!("{}_", stripped.trim().replace(' ', "_"))
}
