//! Shared test doubles: a recording chat platform and a store wrapper
//! with per-operation failure injection.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use study_hall::chat::{ChatClient, ChatError, ChatResult};
use study_hall::store::{CourseStore, StoreResult};
use study_hall::{
    ChannelId, Course, CourseId, CourseSummary, GuildId, MemoryStore, PermissionOverwrite, RoleId,
    User, UserId,
};

/// Observable external platform state.
#[derive(Default)]
pub struct ChatState {
    pub roles: HashSet<RoleId>,
    pub channels: HashSet<ChannelId>,
    pub grants: HashSet<(UserId, RoleId)>,
    pub messages: Vec<(ChannelId, String)>,
    pub calls: Vec<&'static str>,
}

/// In-memory [`ChatClient`] recording every call, with failure injection.
///
/// Direct channels are deterministic (`dm-<user>`); created roles and
/// channels get sequential ids.
#[derive(Default)]
pub struct FakeChat {
    next_id: AtomicU64,
    pub state: Mutex<ChatState>,
    fail: Mutex<HashSet<&'static str>>,
}

impl FakeChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future call to `op` fail until cleared.
    pub fn fail_on(&self, op: &'static str) {
        self.fail.lock().unwrap().insert(op);
    }

    pub fn clear_failures(&self) {
        self.fail.lock().unwrap().clear();
    }

    fn begin(&self, op: &'static str) -> ChatResult<()> {
        self.state.lock().unwrap().calls.push(op);
        if self.fail.lock().unwrap().contains(op) {
            Err(ChatError::new(format!("{op} failed")))
        } else {
            Ok(())
        }
    }

    fn next(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn role_count(&self) -> usize {
        self.state.lock().unwrap().roles.len()
    }

    pub fn channel_count(&self) -> usize {
        self.state.lock().unwrap().channels.len()
    }

    pub fn grant_count(&self) -> usize {
        self.state.lock().unwrap().grants.len()
    }

    pub fn has_grant(&self, user: &UserId) -> bool {
        self.state
            .lock()
            .unwrap()
            .grants
            .iter()
            .any(|(grantee, _)| grantee == user)
    }

    pub fn messages_for(&self, channel: &ChannelId) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .messages
            .iter()
            .filter(|(target, _)| target == channel)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn direct_channel_of(user: &str) -> ChannelId {
        ChannelId::from(format!("dm-{user}"))
    }
}

#[async_trait]
impl ChatClient for FakeChat {
    async fn create_role(&self, _guild: &GuildId, _name: &str) -> ChatResult<RoleId> {
        self.begin("create_role")?;
        let role = RoleId::from(self.next("role"));
        self.state.lock().unwrap().roles.insert(role.clone());
        Ok(role)
    }

    async fn delete_role(&self, _guild: &GuildId, role: &RoleId) -> ChatResult<()> {
        self.begin("delete_role")?;
        self.state.lock().unwrap().roles.remove(role);
        Ok(())
    }

    async fn create_channel(
        &self,
        _guild: &GuildId,
        _name: &str,
        _parent: Option<&ChannelId>,
        _overwrites: &[PermissionOverwrite],
    ) -> ChatResult<ChannelId> {
        self.begin("create_channel")?;
        let channel = ChannelId::from(self.next("chan"));
        self.state.lock().unwrap().channels.insert(channel.clone());
        Ok(channel)
    }

    async fn delete_channel(&self, channel: &ChannelId) -> ChatResult<()> {
        self.begin("delete_channel")?;
        self.state.lock().unwrap().channels.remove(channel);
        Ok(())
    }

    async fn add_member_role(
        &self,
        _guild: &GuildId,
        user: &UserId,
        role: &RoleId,
    ) -> ChatResult<()> {
        self.begin("add_member_role")?;
        self.state
            .lock()
            .unwrap()
            .grants
            .insert((user.clone(), role.clone()));
        Ok(())
    }

    async fn remove_member_role(
        &self,
        _guild: &GuildId,
        user: &UserId,
        role: &RoleId,
    ) -> ChatResult<()> {
        self.begin("remove_member_role")?;
        self.state
            .lock()
            .unwrap()
            .grants
            .remove(&(user.clone(), role.clone()));
        Ok(())
    }

    async fn open_direct_channel(&self, user: &UserId) -> ChatResult<ChannelId> {
        self.begin("open_direct_channel")?;
        Ok(ChannelId::from(format!("dm-{user}")))
    }

    async fn send_message(&self, channel: &ChannelId, text: &str) -> ChatResult<()> {
        self.begin("send_message")?;
        self.state
            .lock()
            .unwrap()
            .messages
            .push((channel.clone(), text.to_string()));
        Ok(())
    }
}

/// [`CourseStore`] wrapper that fails named operations on demand.
pub struct FlakyStore {
    pub inner: MemoryStore,
    fail: Mutex<HashSet<&'static str>>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail: Mutex::new(HashSet::new()),
        }
    }

    /// Make every future call to `op` fail until cleared.
    pub fn fail_on(&self, op: &'static str) {
        self.fail.lock().unwrap().insert(op);
    }

    pub fn clear_failures(&self) {
        self.fail.lock().unwrap().clear();
    }

    fn check(&self, op: &'static str) -> StoreResult<()> {
        if self.fail.lock().unwrap().contains(op) {
            Err(study_hall::StoreError::new(format!("{op} failed")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CourseStore for FlakyStore {
    async fn find_course(&self, id: CourseId) -> StoreResult<Option<Course>> {
        self.check("find_course")?;
        self.inner.find_course(id).await
    }

    async fn set_course_channel(&self, id: CourseId, channel: &ChannelId) -> StoreResult<()> {
        self.check("set_course_channel")?;
        self.inner.set_course_channel(id, channel).await
    }

    async fn insert_role(&self, role: &RoleId) -> StoreResult<()> {
        self.check("insert_role")?;
        self.inner.insert_role(role).await
    }

    async fn insert_channel(&self, channel: &ChannelId, role: &RoleId) -> StoreResult<()> {
        self.check("insert_channel")?;
        self.inner.insert_channel(channel, role).await
    }

    async fn find_user(&self, id: &UserId) -> StoreResult<Option<User>> {
        self.check("find_user")?;
        self.inner.find_user(id).await
    }

    async fn insert_user(&self, id: &UserId) -> StoreResult<()> {
        self.check("insert_user")?;
        self.inner.insert_user(id).await
    }

    async fn has_membership(&self, user: &UserId, course: CourseId) -> StoreResult<bool> {
        self.check("has_membership")?;
        self.inner.has_membership(user, course).await
    }

    async fn insert_membership(&self, user: &UserId, course: CourseId) -> StoreResult<()> {
        self.check("insert_membership")?;
        self.inner.insert_membership(user, course).await
    }

    async fn delete_membership(&self, user: &UserId, course: CourseId) -> StoreResult<()> {
        self.check("delete_membership")?;
        self.inner.delete_membership(user, course).await
    }

    async fn course_catalog(&self) -> StoreResult<Vec<CourseSummary>> {
        self.check("course_catalog")?;
        self.inner.course_catalog().await
    }

    async fn courses_of(&self, user: &UserId) -> StoreResult<Vec<Course>> {
        self.check("courses_of")?;
        self.inner.courses_of(user).await
    }
}
