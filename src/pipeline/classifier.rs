use std::path::Path;

use crate::constants;

/// Decides whether a report file is an advanced report.
///
/// Today the designation travels in the filename; swapping this trait out is all it
/// takes to read it from somewhere else.
pub trait FileClassifier: Send + Sync {
    fn is_advanced(&self, relative_path: &str) -> bool;
}

/// Case-insensitive basename substring match
#[derive(Debug, Clone)]
pub struct MarkerClassifier {
    marker: String,
}

impl MarkerClassifier {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().to_lowercase(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Default for MarkerClassifier {
    fn default() -> Self {
        Self::new(constants::ADVANCED_MARKER)
    }
}

impl FileClassifier for MarkerClassifier {
    fn is_advanced(&self, relative_path: &str) -> bool {
        Path::new(relative_path)
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase().contains(&self.marker))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_matches_basename_only() {
        let classifier = MarkerClassifier::default();
        assert!(classifier.is_advanced("topicA/report_adv.xlsx"));
        assert!(classifier.is_advanced("topicA/Food in Italy 2021 ADV.xlsx"));
        assert!(!classifier.is_advanced("advanced_reports/report.xlsx"));
        assert!(!classifier.is_advanced("topicB/report.xlsx"));
    }
}
