use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

use crate::core::error::NebulaResult;

/// Files whose content may change on the client without being re-downloaded.
///
/// ```json
/// { "appliesTo": ["files"], "patterns": ["config/*.cfg"] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UntrackedFilesOption {
    pub applies_to: Vec<String>,
    pub patterns: Vec<String>,
}

/// Glob patterns that apply to one structure root.
#[derive(Debug, Clone, Default)]
pub struct UntrackedMatcher {
    patterns: Vec<Pattern>,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl UntrackedMatcher {
    /// Collect the patterns of every option that applies to `root_name`.
    pub fn for_root(options: &[UntrackedFilesOption], root_name: &str) -> NebulaResult<Self> {
        let mut patterns = Vec::new();
        for option in options.iter().filter(|o| o.applies_to.iter().any(|a| a == root_name)) {
            for raw in &option.patterns {
                patterns.push(Pattern::new(raw)?);
            }
        }
        Ok(Self { patterns })
    }

    /// `relative_path` is `/`-separated and relative to the structure root.
    pub fn is_untracked(&self, relative_path: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(relative_path, MATCH_OPTIONS))
    }
}
