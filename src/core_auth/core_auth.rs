use crate::constants::USERNAME_REGEX;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

fn username_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(USERNAME_REGEX).ok()).as_ref()
}

pub fn is_valid_username(username: &str) -> bool {
    username_regex().is_some_and(|re| re.is_match(username))
}

/// Read-only `username -> password` table shared by every session.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    users: Arc<HashMap<String, String>>,
}

impl Credentials {
    pub fn from_map(users: HashMap<String, String>) -> Self {
        Self {
            users: Arc::new(users),
        }
    }

    /// True when the name is well formed and present in the table.
    pub fn contains_user(&self, username: &str) -> bool {
        is_valid_username(username) && self.users.contains_key(username)
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.contains_user(username)
            && self
                .users
                .get(username)
                .is_some_and(|expected| expected == password)
    }
}
