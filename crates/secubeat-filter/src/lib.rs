//! Inclusion/exclusion filtering over user, command, and IP fields.
//!
//! Precedence is strict: the excluded set is checked first and any match
//! excludes immediately; otherwise the included set decides, with `"*"`
//! including everything. No match on the included set excludes.

use secubeat_types::CommandEvent;

/// Literal entry that includes every value.
pub const WILDCARD: &str = "*";

/// How rule entries are matched against a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Entry must equal the value (users, IPs).
    Exact,
    /// Entry must be contained in the value (commands).
    Substring,
}

/// Allow/deny rules for a single field.
#[derive(Debug, Clone)]
pub struct FieldRules {
    included: Vec<String>,
    excluded: Vec<String>,
    mode: MatchMode,
}

impl FieldRules {
    /// Build rules from included/excluded entries.
    pub fn new(included: Vec<String>, excluded: Vec<String>, mode: MatchMode) -> Self {
        Self {
            included,
            excluded,
            mode,
        }
    }

    /// Rules that include everything and exclude nothing.
    pub fn allow_all(mode: MatchMode) -> Self {
        Self::new(vec![WILDCARD.to_string()], Vec::new(), mode)
    }

    fn matches(&self, entry: &str, value: &str) -> bool {
        match self.mode {
            MatchMode::Exact => entry == value,
            MatchMode::Substring => value.contains(entry),
        }
    }

    /// Decide whether a value passes these rules. Exclusion always wins.
    pub fn should_include(&self, value: &str) -> bool {
        if self.excluded.iter().any(|entry| self.matches(entry, value)) {
            return false;
        }
        if self.included.iter().any(|entry| entry == WILDCARD) {
            return true;
        }
        self.included.iter().any(|entry| self.matches(entry, value))
    }
}

/// Filter engine evaluating rules over the three event dimensions.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    users: FieldRules,
    commands: FieldRules,
    ips: FieldRules,
}

impl FilterEngine {
    /// Build an engine from per-dimension rules.
    pub fn new(users: FieldRules, commands: FieldRules, ips: FieldRules) -> Self {
        Self {
            users,
            commands,
            ips,
        }
    }

    /// Engine that passes every event.
    pub fn allow_all() -> Self {
        Self::new(
            FieldRules::allow_all(MatchMode::Exact),
            FieldRules::allow_all(MatchMode::Substring),
            FieldRules::allow_all(MatchMode::Exact),
        )
    }

    /// Decide whether a user passes the user rules.
    pub fn should_include_user(&self, user: &str) -> bool {
        self.users.should_include(user)
    }

    /// Decide whether a command passes the command rules.
    pub fn should_include_command(&self, command: &str) -> bool {
        self.commands.should_include(command)
    }

    /// Decide whether an IP passes the IP rules.
    pub fn should_include_ip(&self, ip: &str) -> bool {
        self.ips.should_include(ip)
    }

    /// Decide whether an event passes all dimensions.
    ///
    /// A dimension is only consulted when the corresponding field is
    /// non-empty; an event with no correlated origin is not excluded by IP
    /// rules.
    pub fn accepts(&self, event: &CommandEvent) -> bool {
        if !event.user.is_empty() && !self.should_include_user(&event.user) {
            return false;
        }
        if !event.command.is_empty() && !self.should_include_command(&event.command) {
            return false;
        }
        if let Some(ip) = event.source_ip.as_deref() {
            if !ip.is_empty() && !self.should_include_ip(ip) {
                return false;
            }
        }
        true
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::allow_all()
    }
}
