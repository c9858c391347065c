use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

/// Discriminant for the two end-user principal kinds. Employees and
/// employers live in disjoint collections with independent credentials;
/// every polymorphic reference (payments, assignments, subscriptions)
/// stores this tag next to the id instead of a collection-name string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    Employee,
    Employer,
}

impl UserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserKind::Employee => "employee",
            UserKind::Employer => "employer",
        }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            UserKind::Employee => "employees",
            UserKind::Employer => "employers",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "employee" => Some(UserKind::Employee),
            "employer" => Some(UserKind::Employer),
            _ => None,
        }
    }
}

/// Tagged reference to an employee or employer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRef {
    pub id: ObjectId,
    pub kind: UserKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    SuperAdmin,
    Manager,
    Staff,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::SuperAdmin => "super_admin",
            AdminRole::Manager => "manager",
            AdminRole::Staff => "staff",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "super_admin" => Some(AdminRole::SuperAdmin),
            "manager" => Some(AdminRole::Manager),
            "staff" => Some(AdminRole::Staff),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_kind_round_trips_through_its_string_form() {
        for kind in [UserKind::Employee, UserKind::Employer] {
            assert_eq!(UserKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(UserKind::parse("admin"), None);
    }

    #[test]
    fn kinds_map_to_disjoint_collections() {
        assert_ne!(
            UserKind::Employee.collection(),
            UserKind::Employer.collection()
        );
    }
}
