//! Course store seam.
//!
//! Persistence for courses, users, memberships, and resource bindings.
//! The schema and its migrations live behind this trait; the core only
//! relies on the atomic operations below.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ChannelId, Course, CourseId, CourseSummary, RoleId, User, UserId};

/// Error raised by a store operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StoreError(String);

impl StoreError {
    /// Create a new store error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence operations the core requires.
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Look up a course by id.
    async fn find_course(&self, id: CourseId) -> StoreResult<Option<Course>>;

    /// Persist a course's bound-channel reference.
    async fn set_course_channel(&self, id: CourseId, channel: &ChannelId) -> StoreResult<()>;

    /// Persist a role created for a course.
    async fn insert_role(&self, role: &RoleId) -> StoreResult<()>;

    /// Persist a channel and its role binding.
    async fn insert_channel(&self, channel: &ChannelId, role: &RoleId) -> StoreResult<()>;

    /// Look up a user record.
    async fn find_user(&self, id: &UserId) -> StoreResult<Option<User>>;

    /// Create a user record.
    async fn insert_user(&self, id: &UserId) -> StoreResult<()>;

    /// Whether the user is enrolled in the course.
    async fn has_membership(&self, user: &UserId, course: CourseId) -> StoreResult<bool>;

    /// Persist an enrollment.
    async fn insert_membership(&self, user: &UserId, course: CourseId) -> StoreResult<()>;

    /// Delete an enrollment.
    async fn delete_membership(&self, user: &UserId, course: CourseId) -> StoreResult<()>;

    /// Searchable summaries of every course.
    async fn course_catalog(&self) -> StoreResult<Vec<CourseSummary>>;

    /// Courses a user is enrolled in.
    async fn courses_of(&self, user: &UserId) -> StoreResult<Vec<Course>>;
}
