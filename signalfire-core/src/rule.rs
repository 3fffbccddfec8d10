//! Naming rules that sort deployments into groups.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::CoreError;
use crate::types::DeploymentInput;

/// Pattern of the default rule that groups by the token after the last `-`.
pub const SUFFIX_PATTERN: &str = ".*-(.*)";
/// Pattern of the default catch-all rule.
pub const IDENTITY_PATTERN: &str = "(.*)";

/// Derives a group name for a deployment.
pub trait CollationRule: fmt::Debug + Send + Sync {
    /// `None` (or an empty name) means the rule does not apply and the next
    /// rule should be tried.
    fn deployment_group(&self, input: &DeploymentInput) -> Option<String>;
}

/// Applies a pattern to the deployment name and uses the first capture group
/// as the group name.
#[derive(Debug, Clone)]
pub struct RegexCaptureRule {
    pattern: Regex,
}

impl RegexCaptureRule {
    pub fn new(pattern: &str) -> Result<Self, CoreError> {
        let compiled = Regex::new(pattern).map_err(|source| CoreError::InvalidRule {
            pattern: pattern.to_owned(),
            reason: source.to_string(),
        })?;
        if compiled.captures_len() < 2 {
            return Err(CoreError::InvalidRule {
                pattern: pattern.to_owned(),
                reason: "pattern has no capturing group".to_owned(),
            });
        }
        Ok(Self { pattern: compiled })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl CollationRule for RegexCaptureRule {
    fn deployment_group(&self, input: &DeploymentInput) -> Option<String> {
        self.pattern
            .captures(&input.deployment_name)?
            .get(1)
            .map(|m| m.as_str().to_owned())
    }
}

/// Ordered, immutable list of rules. The first rule yielding a non-empty name
/// wins. Cloning shares the underlying list.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Arc<[Box<dyn CollationRule>]>,
}

impl RuleSet {
    pub fn new(rules: Vec<Box<dyn CollationRule>>) -> Self {
        Self {
            rules: rules.into(),
        }
    }

    /// Build a rule set from regex capture patterns, in order.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, CoreError> {
        let rules = patterns
            .iter()
            .map(|pattern| {
                RegexCaptureRule::new(pattern.as_ref())
                    .map(|rule| Box::new(rule) as Box<dyn CollationRule>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    pub fn group_for(&self, input: &DeploymentInput) -> Option<String> {
        self.rules
            .iter()
            .filter_map(|rule| rule.deployment_group(input))
            .find(|name| !name.is_empty())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    /// Suffix after the last `-`, then the whole deployment name.
    fn default() -> Self {
        Self::new(vec![
            Box::new(RegexCaptureRule {
                pattern: Regex::new(SUFFIX_PATTERN).expect("suffix pattern is valid"),
            }),
            Box::new(RegexCaptureRule {
                pattern: Regex::new(IDENTITY_PATTERN).expect("identity pattern is valid"),
            }),
        ])
    }
}
