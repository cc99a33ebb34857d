//! Enrollment saga.
//!
//! Joining or leaving a course touches two systems that cannot be updated
//! atomically together: the chat platform (roles, channels, grants) and
//! the course store (bindings, memberships). Every step that commits a
//! side effect records a typed undo step; on failure the recorded steps
//! run in reverse order, so observers see the operation either fully
//! applied or fully reverted. A failed undo aborts the unwind and is
//! surfaced as [`Error::Compensation`] carrying both errors; an
//! inconsistency is reported loudly, never masked.
//!
//! No step is retried here; some failures (name collisions, permission
//! changes) are not transient, so retrying is the caller's call.
//!
//! Two sagas for different courses may run concurrently without
//! coordination. Two concurrent joins on the same unprovisioned course
//! can double-provision (one binding wins, the other's resources leak);
//! see DESIGN.md.

use tracing::{debug, info};

use crate::chat::ChatClient;
use crate::error::{Error, ProvisionStep};
use crate::model::{
    ChannelId, Course, CourseBinding, CourseId, GuildContext, PermissionOverwrite, RoleId, UserId,
};
use crate::store::CourseStore;
use crate::Result;

/// A recorded side effect and how to revert it.
#[derive(Debug)]
enum Undo {
    DeleteRole(RoleId),
    DeleteChannel(ChannelId),
    RevokeRole { user: UserId, role: RoleId },
    RestoreMembership { user: UserId, course: CourseId },
}

/// Ordered log of committed side effects for one saga attempt.
#[derive(Debug, Default)]
struct Compensator {
    undo: Vec<Undo>,
}

impl Compensator {
    fn new() -> Self {
        Self::default()
    }

    /// Record a committed side effect.
    fn record(&mut self, step: Undo) {
        self.undo.push(step);
    }

    /// Forget the recorded steps; the saga committed.
    fn disarm(mut self) {
        self.undo.clear();
    }

    /// Revert recorded side effects in reverse order.
    ///
    /// Returns the error the caller should propagate: `original` when the
    /// unwind completed, or a [`Error::Compensation`] wrapping both when
    /// an undo step itself failed.
    async fn unwind(self, saga: &Enrollment<'_>, original: Error) -> Error {
        for step in self.undo.into_iter().rev() {
            debug!(?step, "compensating");
            let result: Result<()> = match step {
                Undo::DeleteRole(role) => saga
                    .chat
                    .delete_role(&saga.guild.id, &role)
                    .await
                    .map_err(|err| Error::provisioning(ProvisionStep::DeleteRole, err)),
                Undo::DeleteChannel(channel) => saga
                    .chat
                    .delete_channel(&channel)
                    .await
                    .map_err(|err| Error::provisioning(ProvisionStep::DeleteChannel, err)),
                Undo::RevokeRole { user, role } => saga
                    .chat
                    .remove_member_role(&saga.guild.id, &user, &role)
                    .await
                    .map_err(|err| Error::provisioning(ProvisionStep::RevokeRole, err)),
                Undo::RestoreMembership { user, course } => saga
                    .store
                    .insert_membership(&user, course)
                    .await
                    .map_err(Error::from),
            };
            if let Err(compensation) = result {
                return Error::compensation(original, compensation);
            }
        }
        original
    }
}

/// Orchestrates course join/leave against the chat platform and the store.
pub struct Enrollment<'a> {
    store: &'a dyn CourseStore,
    chat: &'a dyn ChatClient,
    guild: &'a GuildContext,
}

impl<'a> Enrollment<'a> {
    /// Create a saga bound to one guild.
    pub fn new(store: &'a dyn CourseStore, chat: &'a dyn ChatClient, guild: &'a GuildContext) -> Self {
        Self { store, chat, guild }
    }

    /// Enroll `user` in `course`, provisioning its channel and role first
    /// if the course has none yet.
    ///
    /// Returns the course with its binding populated. Fails with
    /// [`Error::AlreadyJoined`] (and zero mutations) when the user is
    /// already enrolled.
    pub async fn join_course(&self, course: &Course, user: &UserId) -> Result<Course> {
        let course = self.ensure_provisioned(course).await?;
        let binding = course
            .binding
            .as_ref()
            .ok_or_else(|| Error::Execution("provisioned course lost its binding".to_string()))?;

        if self.store.find_user(user).await?.is_none() {
            self.store.insert_user(user).await?;
        }

        if self.store.has_membership(user, course.id).await? {
            return Err(Error::AlreadyJoined);
        }

        self.chat
            .add_member_role(&self.guild.id, user, &binding.role)
            .await
            .map_err(|err| Error::provisioning(ProvisionStep::GrantRole, err))?;

        let mut compensator = Compensator::new();
        compensator.record(Undo::RevokeRole {
            user: user.clone(),
            role: binding.role.clone(),
        });

        if let Err(err) = self.store.insert_membership(user, course.id).await {
            return Err(compensator.unwind(self, Error::Persistence(err)).await);
        }
        compensator.disarm();

        info!(course = %course.id, %user, "user enrolled");
        Ok(course)
    }

    /// Remove `user` from `course`.
    ///
    /// The course's channel and role stay behind for future joiners.
    /// Fails with [`Error::NotJoined`] (and zero mutations) when the user
    /// is not enrolled.
    pub async fn leave_course(&self, course: &Course, user: &UserId) -> Result<()> {
        if !self.store.has_membership(user, course.id).await? {
            return Err(Error::NotJoined);
        }
        let binding = course
            .binding
            .as_ref()
            .ok_or_else(|| Error::Execution("enrolled course has no binding".to_string()))?;

        self.store.delete_membership(user, course.id).await?;

        let mut compensator = Compensator::new();
        compensator.record(Undo::RestoreMembership {
            user: user.clone(),
            course: course.id,
        });

        if let Err(err) = self
            .chat
            .remove_member_role(&self.guild.id, user, &binding.role)
            .await
        {
            let original = Error::provisioning(ProvisionStep::RevokeRole, err);
            return Err(compensator.unwind(self, original).await);
        }
        compensator.disarm();

        info!(course = %course.id, %user, "user left course");
        Ok(())
    }

    /// Lazily provision the course's role and channel.
    ///
    /// Creation order is role, then channel, then the three store writes;
    /// any failure unwinds external resources in reverse (channel first,
    /// then role) before the original error propagates.
    async fn ensure_provisioned(&self, course: &Course) -> Result<Course> {
        if course.is_provisioned() {
            return Ok(course.clone());
        }

        let name = format!("{} [{}]", course.name, course.id);

        let role = self
            .chat
            .create_role(&self.guild.id, &name)
            .await
            .map_err(|err| Error::provisioning(ProvisionStep::CreateRole, err))?;
        let mut compensator = Compensator::new();
        compensator.record(Undo::DeleteRole(role.clone()));

        // Visible only to holders of the course role.
        let overwrites = [
            PermissionOverwrite::deny_default(),
            PermissionOverwrite::allow_view(role.clone()),
        ];
        let channel = match self
            .chat
            .create_channel(
                &self.guild.id,
                &name,
                self.guild.course_category.as_ref(),
                &overwrites,
            )
            .await
        {
            Ok(channel) => channel,
            Err(err) => {
                let original = Error::provisioning(ProvisionStep::CreateChannel, err);
                return Err(compensator.unwind(self, original).await);
            }
        };
        compensator.record(Undo::DeleteChannel(channel.clone()));

        if let Err(err) = self.store.insert_role(&role).await {
            return Err(compensator.unwind(self, Error::Persistence(err)).await);
        }
        if let Err(err) = self.store.insert_channel(&channel, &role).await {
            return Err(compensator.unwind(self, Error::Persistence(err)).await);
        }
        if let Err(err) = self.store.set_course_channel(course.id, &channel).await {
            return Err(compensator.unwind(self, Error::Persistence(err)).await);
        }
        compensator.disarm();

        info!(course = %course.id, %channel, %role, "course provisioned");
        Ok(Course {
            binding: Some(CourseBinding { channel, role }),
            ..course.clone()
        })
    }
}
