//! Domain model: identities, courses, users, and channel permissions.

use std::fmt;

/// Declares a string-backed identity newtype.
macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Get the raw string value.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// Platform identity of a user.
    UserId
}
string_id! {
    /// Platform identity of a channel (guild channel or direct channel).
    ChannelId
}
string_id! {
    /// Platform identity of a role.
    RoleId
}
string_id! {
    /// Platform identity of a guild (server).
    GuildId
}

/// Identity of a course in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CourseId(pub i64);

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External resources bound to a provisioned course.
///
/// A course either has no binding at all or both the channel and the
/// role. The two are never set independently, which is why they live
/// in one struct behind a single `Option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseBinding {
    /// The course's text channel.
    pub channel: ChannelId,
    /// The role granting visibility into that channel.
    pub role: RoleId,
}

/// A course users can enroll in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    /// Store identity.
    pub id: CourseId,
    /// Display name.
    pub name: String,
    /// Short abbreviation.
    pub abbr: String,
    /// External channel/role binding, present once provisioned.
    pub binding: Option<CourseBinding>,
}

impl Course {
    /// Create an unprovisioned course.
    pub fn new(id: CourseId, name: impl Into<String>, abbr: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            abbr: abbr.into(),
            binding: None,
        }
    }

    /// Whether external resources have been provisioned for this course.
    pub fn is_provisioned(&self) -> bool {
        self.binding.is_some()
    }
}

/// Searchable projection of a course for catalog queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    /// Store identity.
    pub id: CourseId,
    /// Display name.
    pub name: String,
    /// Short abbreviation.
    pub abbr: String,
    /// Majors the course belongs to.
    pub majors: Vec<String>,
}

/// A user record with its enrollment projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Platform identity.
    pub id: UserId,
    /// Courses the user is enrolled in (projection of memberships).
    pub courses: Vec<CourseId>,
}

/// Target of a channel permission overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverwriteTarget {
    /// The guild-wide default (everyone).
    Default,
    /// A specific role.
    Role(RoleId),
}

/// A channel view-permission overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionOverwrite {
    /// Who the overwrite applies to.
    pub target: OverwriteTarget,
    /// Whether the target may view the channel.
    pub view: bool,
}

impl PermissionOverwrite {
    /// Deny channel visibility to the guild default.
    pub fn deny_default() -> Self {
        Self {
            target: OverwriteTarget::Default,
            view: false,
        }
    }

    /// Allow channel visibility to a role.
    pub fn allow_view(role: RoleId) -> Self {
        Self {
            target: OverwriteTarget::Role(role),
            view: true,
        }
    }
}

/// Per-guild settings a session or saga operates under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildContext {
    /// Guild identity.
    pub id: GuildId,
    /// Prefix guild commands must start with.
    pub command_prefix: String,
    /// Category channel course channels are created under.
    pub course_category: Option<ChannelId>,
    /// User allowed to open admin sessions.
    pub admin_user: Option<UserId>,
}

impl GuildContext {
    /// Create a guild context with default settings.
    pub fn new(id: GuildId) -> Self {
        Self {
            id,
            command_prefix: "!".to_string(),
            course_category: None,
            admin_user: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_provisioning_flag() {
        let mut course = Course::new(CourseId(7), "Algebra", "alg");
        assert!(!course.is_provisioned());

        course.binding = Some(CourseBinding {
            channel: ChannelId::from("chan-1"),
            role: RoleId::from("role-1"),
        });
        assert!(course.is_provisioned());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(UserId::from("u1").to_string(), "u1");
        assert_eq!(CourseId(42).to_string(), "42");
    }

    #[test]
    fn test_id_hash_eq() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(ChannelId::from("c1"));
        assert!(set.contains(&ChannelId::from("c1")));
        assert!(!set.contains(&ChannelId::from("c2")));
    }

    #[test]
    fn test_overwrite_constructors() {
        let deny = PermissionOverwrite::deny_default();
        assert_eq!(deny.target, OverwriteTarget::Default);
        assert!(!deny.view);

        let allow = PermissionOverwrite::allow_view(RoleId::from("r1"));
        assert_eq!(allow.target, OverwriteTarget::Role(RoleId::from("r1")));
        assert!(allow.view);
    }
}
