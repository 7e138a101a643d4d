//! Access rule and group parsing
//!
//! Both rule files (`access.txt`, `.access`) and the group file (`.group`)
//! are line-oriented text, `#`-commented, blank lines ignored.

use std::collections::HashMap;

use serde::Serialize;

/// One of the three characters a rule's access string may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Read,
    Write,
    Delete,
}

impl AccessLevel {
    pub fn as_char(self) -> char {
        match self {
            AccessLevel::Read => 'r',
            AccessLevel::Write => 'w',
            AccessLevel::Delete => 'd',
        }
    }
}

/// A single `<subject> <access> <target>` line.
#[derive(Debug, Clone, Serialize)]
pub struct AccessRule {
    pub subject: String,
    pub access: String,
    pub target: String,
}

impl AccessRule {
    /// True when `level` is granted by this rule against `path`.
    ///
    /// Matching is plain prefix comparison on both sides normalised to a
    /// leading `/`; a bare target and a directory target (trailing `/`)
    /// both fall out of that without special-casing.
    pub fn grants(&self, level: AccessLevel, path: &str) -> bool {
        self.access.contains(level.as_char()) && normalize(path).starts_with(&normalize(&self.target))
    }
}

fn normalize(path: &str) -> String {
    if path.starts_with('/') { path.to_string() } else { format!("/{path}") }
}

/// Parse a rule file: one `<subject> <access> <target>` triple per line.
pub fn parse_rules(text: &str) -> Vec<AccessRule> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut parts = line.splitn(3, char::is_whitespace).filter(|p| !p.is_empty());
            let subject = parts.next()?.to_string();
            let access = parts.next()?.to_string();
            let target = parts.next()?.trim().to_string();
            Some(AccessRule { subject, access, target })
        })
        .collect()
}

/// Parse `.group`: `<group> <member> <member> …`, members may reference
/// another group with a leading `.`.
pub fn parse_groups(text: &str) -> HashMap<String, Vec<String>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut words = line.split_whitespace();
            let group = words.next()?.to_string();
            let members: Vec<String> = words.map(str::to_string).collect();
            Some((group, members))
        })
        .collect()
}

/// Whether `user` belongs to `group`, resolving one level of `.other-group`
/// indirection (deeper chains are not followed).
pub fn is_member(groups: &HashMap<String, Vec<String>>, group: &str, user: &str) -> bool {
    let Some(members) = groups.get(group) else {
        return false;
    };
    members.iter().any(|member| match member.strip_prefix('.') {
        Some(nested) => groups.get(nested).is_some_and(|nested_members| nested_members.iter().any(|m| m == user)),
        None => member == user,
    })
}

/// All group names `user` is a member of, sorted.
pub fn groups_for_user(groups: &HashMap<String, Vec<String>>, user: &str) -> Vec<String> {
    let mut names: Vec<String> = groups.keys().filter(|g| is_member(groups, g, user)).cloned().collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rule_lines_and_skips_comments() {
        let text = "# comment\nalice rw /notes\n\n* rwd /\n";
        let rules = parse_rules(text);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].subject, "alice");
        assert_eq!(rules[0].access, "rw");
        assert_eq!(rules[0].target, "/notes");
        assert_eq!(rules[1].subject, "*");
    }

    #[test]
    fn grants_checks_level_and_prefix() {
        let rule = AccessRule { subject: "alice".into(), access: "rw".into(), target: "test/".into() };
        assert!(!rule.grants(AccessLevel::Read, "/test"));
        assert!(rule.grants(AccessLevel::Read, "/test/x"));
        assert!(!rule.grants(AccessLevel::Delete, "/test/x"));
    }

    #[test]
    fn bare_target_matches_equal_path() {
        let rule = AccessRule { subject: "*".into(), access: "r".into(), target: "/notes.json".into() };
        assert!(rule.grants(AccessLevel::Read, "notes.json"));
    }

    #[test]
    fn root_target_matches_everything() {
        let rule = AccessRule { subject: "*".into(), access: "rwd".into(), target: "/".into() };
        assert!(rule.grants(AccessLevel::Write, "/anything/deep"));
    }

    #[test]
    fn group_membership_direct() {
        let groups = parse_groups("editors alice bob\n");
        assert!(is_member(&groups, "editors", "alice"));
        assert!(!is_member(&groups, "editors", "carol"));
    }

    #[test]
    fn group_membership_one_level_indirection() {
        let groups = parse_groups("seniors alice\neditors bob .seniors\n");
        assert!(is_member(&groups, "editors", "bob"));
        assert!(is_member(&groups, "editors", "alice"));
    }

    #[test]
    fn group_membership_does_not_chain_beyond_one_level() {
        let groups = parse_groups("core alice\nseniors .core\neditors .seniors\n");
        assert!(is_member(&groups, "seniors", "alice"));
        assert!(!is_member(&groups, "editors", "alice"));
    }

    #[test]
    fn groups_for_user_is_sorted() {
        let groups = parse_groups("zeta alice\nalpha alice\nbeta bob\n");
        assert_eq!(groups_for_user(&groups, "alice"), vec!["alpha".to_string(), "zeta".to_string()]);
    }
}
