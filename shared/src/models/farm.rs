//! Farm membership roles

use serde::{Deserialize, Serialize};

/// Role of a user within a farm, from most to least privileged
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FarmRole {
    Owner,
    Manager,
    Operator,
    Viewer,
}

impl FarmRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FarmRole::Owner => "owner",
            FarmRole::Manager => "manager",
            FarmRole::Operator => "operator",
            FarmRole::Viewer => "viewer",
        }
    }

    pub fn parse(value: &str) -> Option<FarmRole> {
        match value {
            "owner" => Some(FarmRole::Owner),
            "manager" => Some(FarmRole::Manager),
            "operator" => Some(FarmRole::Operator),
            "viewer" => Some(FarmRole::Viewer),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FarmRole::Owner => 4,
            FarmRole::Manager => 3,
            FarmRole::Operator => 2,
            FarmRole::Viewer => 1,
        }
    }

    /// Whether this role grants at least the privileges of `required`
    pub fn at_least(&self, required: FarmRole) -> bool {
        self.rank() >= required.rank()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ladder() {
        assert!(FarmRole::Owner.at_least(FarmRole::Viewer));
        assert!(FarmRole::Manager.at_least(FarmRole::Manager));
        assert!(!FarmRole::Viewer.at_least(FarmRole::Operator));
    }
}
