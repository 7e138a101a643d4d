//! AccessEvaluator: decides `(user, path, level) -> bool` from three text files

use std::sync::Arc;

use auth_store::{Store, UserDirectory};
use serde::Serialize;

use crate::error::Result;
use crate::rules::{AccessLevel, AccessRule, groups_for_user, is_member, parse_groups, parse_rules};

const GROUP_PATH: &str = ".group";
const GLOBAL_ACCESS_PATH: &str = ".access";

/// Summary returned to the `/auth/access/info` endpoint.
#[derive(Debug, Serialize)]
pub struct AccessInfo {
    #[serde(rename = "userAccess")]
    pub user_access: Vec<AccessRule>,
    #[serde(rename = "groupRules")]
    pub group_rules: Vec<AccessRule>,
    #[serde(rename = "globalRules")]
    pub global_rules: Vec<AccessRule>,
    pub groups: Vec<String>,
}

pub struct AccessEvaluator {
    store: Arc<Store>,
    directory: Arc<UserDirectory>,
}

impl AccessEvaluator {
    pub fn new(store: Arc<Store>, directory: Arc<UserDirectory>) -> Self {
        Self { store, directory }
    }

    /// `(user, path, level) -> bool`, per-user rules first, then groups, then global.
    pub async fn check(&self, user: &str, path: &str, level: AccessLevel) -> Result<bool> {
        let user_rules = parse_rules(&self.directory.access_rules(user).await?);
        if user_rules.iter().any(|rule| rule.grants(level, path)) {
            return Ok(true);
        }

        let groups = parse_groups(&self.store.load_text(GROUP_PATH, String::new()).await?);
        let global_rules = parse_rules(&self.store.load_text(GLOBAL_ACCESS_PATH, String::new()).await?);

        let group_match = global_rules
            .iter()
            .any(|rule| rule.subject != "*" && is_member(&groups, &rule.subject, user) && rule.grants(level, path));
        if group_match {
            return Ok(true);
        }

        Ok(global_rules.iter().any(|rule| rule.subject == "*" && rule.grants(level, path)))
    }

    /// Own rules, plus the group and global rules that apply to `user`.
    pub async fn info(&self, user: &str) -> Result<AccessInfo> {
        let user_access = parse_rules(&self.directory.access_rules(user).await?);
        let groups = parse_groups(&self.store.load_text(GROUP_PATH, String::new()).await?);
        let all_global = parse_rules(&self.store.load_text(GLOBAL_ACCESS_PATH, String::new()).await?);
        let member_of = groups_for_user(&groups, user);

        let group_rules: Vec<AccessRule> =
            all_global.iter().filter(|rule| member_of.contains(&rule.subject)).cloned().collect();
        let global_rules: Vec<AccessRule> = all_global.into_iter().filter(|rule| rule.subject == "*").collect();

        Ok(AccessInfo { user_access, group_rules, global_rules, groups: member_of })
    }
}
