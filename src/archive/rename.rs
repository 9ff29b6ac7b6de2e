//! Rename rules applied while copying files into the archive
//!
//! Rules are an ordered list of (pattern, target) pairs. Both sides may use
//! the `{groupId}`, `{artifactId}` and `{version}` placeholders. A pattern
//! is an exact file name unless it contains glob metacharacters. The first
//! matching rule wins.

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};

use crate::coordinate::RepositoryCoordinate;
use crate::staging::is_sidecar;

/// Errors building rename rules
#[derive(Debug, thiserror::Error)]
pub enum RenameError {
    #[error("invalid rename pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("rename target for {pattern:?} must be a plain file name, got {target:?}")]
    InvalidTarget { pattern: String, target: String },
}

/// A rename rule as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRuleConfig {
    pub from: String,
    pub to: String,
}

/// The generated POM becomes `<artifactId>-<version>.pom`; the `-base` jar
/// becomes the canonical artifact jar.
pub fn default_rule_configs() -> Vec<RenameRuleConfig> {
    vec![
        RenameRuleConfig {
            from: "pom-default.xml".to_string(),
            to: "{artifactId}-{version}.pom".to_string(),
        },
        RenameRuleConfig {
            from: "{artifactId}-{version}-base.jar".to_string(),
            to: "{artifactId}-{version}.jar".to_string(),
        },
    ]
}

#[derive(Debug, Clone)]
enum NamePattern {
    Exact(String),
    Glob(GlobMatcher),
}

impl NamePattern {
    fn parse(pattern: &str) -> Result<Self, globset::Error> {
        if pattern.contains(['*', '?', '[']) {
            Ok(NamePattern::Glob(Glob::new(pattern)?.compile_matcher()))
        } else {
            Ok(NamePattern::Exact(pattern.to_string()))
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(exact) => exact == name,
            NamePattern::Glob(glob) => glob.is_match(name),
        }
    }
}

/// One expanded rename rule
#[derive(Debug, Clone)]
pub struct RenameRule {
    expanded: String,
    pattern: NamePattern,
    target: String,
}

impl RenameRule {
    /// Expand a configured rule for a coordinate
    pub fn new(config: &RenameRuleConfig, coordinate: &RepositoryCoordinate) -> Result<Self, RenameError> {
        let expanded = coordinate.expand(&config.from);
        let target = coordinate.expand(&config.to);

        if target.is_empty() || target.contains(['/', '\\']) {
            return Err(RenameError::InvalidTarget {
                pattern: config.from.clone(),
                target,
            });
        }

        let pattern = NamePattern::parse(&expanded).map_err(|source| RenameError::Pattern {
            pattern: expanded.clone(),
            source,
        })?;

        Ok(Self {
            expanded,
            pattern,
            target,
        })
    }

    /// The expanded pattern
    pub fn pattern(&self) -> &str {
        &self.expanded
    }

    /// The expanded target name
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether this rule applies to a file name
    pub fn matches(&self, name: &str) -> bool {
        self.pattern.matches(name)
    }
}

/// Ordered rename rules
#[derive(Debug, Clone, Default)]
pub struct RenameRules {
    rules: Vec<RenameRule>,
}

impl RenameRules {
    /// Expand configured rules for a coordinate, keeping their order
    pub fn from_configs(
        configs: &[RenameRuleConfig],
        coordinate: &RepositoryCoordinate,
    ) -> Result<Self, RenameError> {
        let rules = configs
            .iter()
            .map(|c| RenameRule::new(c, coordinate))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// The built-in rules for a coordinate
    pub fn defaults(coordinate: &RepositoryCoordinate) -> Self {
        // Built-in patterns are literal names and targets; expansion cannot fail
        let rules = default_rule_configs()
            .iter()
            .filter_map(|c| RenameRule::new(c, coordinate).ok())
            .collect();
        Self { rules }
    }

    /// The rules in evaluation order
    pub fn rules(&self) -> &[RenameRule] {
        &self.rules
    }

    /// Name a file gets inside the archive.
    ///
    /// A sidecar follows its primary file: the rules are matched against
    /// the name without the sidecar extension, which is then re-appended.
    pub fn apply(&self, name: &str) -> String {
        if let Some((base, ext)) = split_sidecar(name) {
            if let Some(rule) = self.rules.iter().find(|r| r.matches(base)) {
                return format!("{}.{}", rule.target, ext);
            }
            return name.to_string();
        }

        match self.rules.iter().find(|r| r.matches(name)) {
            Some(rule) => rule.target.clone(),
            None => name.to_string(),
        }
    }
}

fn split_sidecar(name: &str) -> Option<(&str, &str)> {
    if !is_sidecar(std::path::Path::new(name)) {
        return None;
    }
    let (base, ext) = name.rsplit_once('.')?;
    if base.is_empty() {
        None
    } else {
        Some((base, ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinate() -> RepositoryCoordinate {
        RepositoryCoordinate::new("dev.sbs", "mylib", "1.0.3").unwrap()
    }

    #[test]
    fn test_default_rules() {
        let rules = RenameRules::defaults(&coordinate());
        assert_eq!(rules.rules().len(), 2);
        assert_eq!(rules.apply("pom-default.xml"), "mylib-1.0.3.pom");
        assert_eq!(rules.apply("mylib-1.0.3-base.jar"), "mylib-1.0.3.jar");
        assert_eq!(rules.apply("mylib-1.0.3-sources.jar"), "mylib-1.0.3-sources.jar");
        assert_eq!(rules.apply("mylib-1.0.3-javadoc.jar"), "mylib-1.0.3-javadoc.jar");
    }

    #[test]
    fn test_exact_match_only() {
        let rules = RenameRules::defaults(&coordinate());
        // Another version's base jar is not the canonical one
        assert_eq!(rules.apply("mylib-1.0.2-base.jar"), "mylib-1.0.2-base.jar");
        assert_eq!(rules.apply("xpom-default.xml"), "xpom-default.xml");
    }

    #[test]
    fn test_sidecars_follow_primary() {
        let rules = RenameRules::defaults(&coordinate());
        assert_eq!(rules.apply("pom-default.xml.sha1"), "mylib-1.0.3.pom.sha1");
        assert_eq!(rules.apply("pom-default.xml.asc"), "mylib-1.0.3.pom.asc");
        assert_eq!(rules.apply("mylib-1.0.3-base.jar.md5"), "mylib-1.0.3.jar.md5");
        assert_eq!(rules.apply("other.jar.md5"), "other.jar.md5");
    }

    #[test]
    fn test_first_match_wins() {
        let configs = vec![
            RenameRuleConfig {
                from: "*.xml".to_string(),
                to: "first.xml".to_string(),
            },
            RenameRuleConfig {
                from: "pom-default.xml".to_string(),
                to: "second.xml".to_string(),
            },
        ];
        let rules = RenameRules::from_configs(&configs, &coordinate()).unwrap();
        assert_eq!(rules.apply("pom-default.xml"), "first.xml");
    }

    #[test]
    fn test_glob_pattern_with_placeholders() {
        let configs = vec![RenameRuleConfig {
            from: "{artifactId}-*-all.jar".to_string(),
            to: "{artifactId}-{version}-all.jar".to_string(),
        }];
        let rules = RenameRules::from_configs(&configs, &coordinate()).unwrap();
        assert_eq!(rules.rules()[0].pattern(), "mylib-*-all.jar");
        assert_eq!(rules.apply("mylib-snapshot-all.jar"), "mylib-1.0.3-all.jar");
    }

    #[test]
    fn test_invalid_target_rejected() {
        let configs = vec![RenameRuleConfig {
            from: "pom-default.xml".to_string(),
            to: "nested/dir.pom".to_string(),
        }];
        let err = RenameRules::from_configs(&configs, &coordinate()).unwrap_err();
        assert!(matches!(err, RenameError::InvalidTarget { .. }));
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let configs = vec![RenameRuleConfig {
            from: "[oops".to_string(),
            to: "x.jar".to_string(),
        }];
        let err = RenameRules::from_configs(&configs, &coordinate()).unwrap_err();
        assert!(matches!(err, RenameError::Pattern { .. }));
    }
}
