//! In-memory course store.
//!
//! Backs tests and small embedders. All operations lock a single map
//! set; no operation holds the lock across an await point.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::model::{ChannelId, Course, CourseBinding, CourseId, CourseSummary, RoleId, User, UserId};
use crate::store::{CourseStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    courses: HashMap<CourseId, Course>,
    majors: HashMap<CourseId, Vec<String>>,
    users: HashSet<UserId>,
    memberships: HashSet<(UserId, CourseId)>,
    roles: HashSet<RoleId>,
    channels: HashMap<ChannelId, RoleId>,
}

/// Thread-safe in-memory implementation of [`CourseStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a course into the catalog.
    pub fn add_course(
        &self,
        id: CourseId,
        name: impl Into<String>,
        abbr: impl Into<String>,
        majors: Vec<String>,
    ) {
        let mut tables = self.tables.write().expect("memory store lock");
        tables.courses.insert(id, Course::new(id, name, abbr));
        tables.majors.insert(id, majors);
    }

    /// Number of persisted memberships, across all courses.
    pub fn membership_count(&self) -> usize {
        self.tables.read().expect("memory store lock").memberships.len()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::new("store lock poisoned"))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::new("store lock poisoned"))
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn find_course(&self, id: CourseId) -> StoreResult<Option<Course>> {
        Ok(self.read()?.courses.get(&id).cloned())
    }

    async fn set_course_channel(&self, id: CourseId, channel: &ChannelId) -> StoreResult<()> {
        let mut tables = self.write()?;
        let role = tables
            .channels
            .get(channel)
            .cloned()
            .ok_or_else(|| StoreError::new(format!("channel {channel} has no role binding")))?;
        let course = tables
            .courses
            .get_mut(&id)
            .ok_or_else(|| StoreError::new(format!("no course with id {id}")))?;
        course.binding = Some(CourseBinding {
            channel: channel.clone(),
            role,
        });
        Ok(())
    }

    async fn insert_role(&self, role: &RoleId) -> StoreResult<()> {
        self.write()?.roles.insert(role.clone());
        Ok(())
    }

    async fn insert_channel(&self, channel: &ChannelId, role: &RoleId) -> StoreResult<()> {
        self.write()?.channels.insert(channel.clone(), role.clone());
        Ok(())
    }

    async fn find_user(&self, id: &UserId) -> StoreResult<Option<User>> {
        let tables = self.read()?;
        if !tables.users.contains(id) {
            return Ok(None);
        }
        let courses = tables
            .memberships
            .iter()
            .filter(|(user, _)| user == id)
            .map(|(_, course)| *course)
            .collect();
        Ok(Some(User {
            id: id.clone(),
            courses,
        }))
    }

    async fn insert_user(&self, id: &UserId) -> StoreResult<()> {
        self.write()?.users.insert(id.clone());
        Ok(())
    }

    async fn has_membership(&self, user: &UserId, course: CourseId) -> StoreResult<bool> {
        Ok(self.read()?.memberships.contains(&(user.clone(), course)))
    }

    async fn insert_membership(&self, user: &UserId, course: CourseId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.memberships.insert((user.clone(), course)) {
            return Err(StoreError::new("membership already exists"));
        }
        Ok(())
    }

    async fn delete_membership(&self, user: &UserId, course: CourseId) -> StoreResult<()> {
        self.write()?.memberships.remove(&(user.clone(), course));
        Ok(())
    }

    async fn course_catalog(&self) -> StoreResult<Vec<CourseSummary>> {
        let tables = self.read()?;
        let mut catalog: Vec<CourseSummary> = tables
            .courses
            .values()
            .map(|course| CourseSummary {
                id: course.id,
                name: course.name.clone(),
                abbr: course.abbr.clone(),
                majors: tables.majors.get(&course.id).cloned().unwrap_or_default(),
            })
            .collect();
        catalog.sort_by_key(|summary| summary.id);
        Ok(catalog)
    }

    async fn courses_of(&self, user: &UserId) -> StoreResult<Vec<Course>> {
        let tables = self.read()?;
        let mut courses: Vec<Course> = tables
            .memberships
            .iter()
            .filter(|(member, _)| member == user)
            .filter_map(|(_, id)| tables.courses.get(id).cloned())
            .collect();
        courses.sort_by_key(|course| course.id);
        Ok(courses)
    }
}
