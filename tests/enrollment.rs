//! Enrollment saga integration tests: lazy provisioning, compensation on
//! partial failure, and business-rule rejections.

mod common;

use study_hall::{
    CourseId, Enrollment, Error, GuildContext, GuildId, MemoryStore, ProvisionStep, UserId,
};

use common::{FakeChat, FlakyStore};

fn guild() -> GuildContext {
    GuildContext::new(GuildId::from("guild-1"))
}

fn store_with_algebra() -> FlakyStore {
    let inner = MemoryStore::new();
    inner.add_course(CourseId(7), "Algebra", "alg", vec!["math".to_string()]);
    FlakyStore::new(inner)
}

async fn course(store: &FlakyStore, id: i64) -> study_hall::Course {
    use study_hall::store::CourseStore;
    store.find_course(CourseId(id)).await.unwrap().unwrap()
}

#[tokio::test]
async fn join_provisions_and_enrolls() {
    let chat = FakeChat::new();
    let store = store_with_algebra();
    let guild = guild();
    let user = UserId::from("u1");

    let saga = Enrollment::new(&store, &chat, &guild);
    let joined = saga.join_course(&course(&store, 7).await, &user).await.unwrap();

    assert!(joined.is_provisioned());
    assert_eq!(chat.role_count(), 1);
    assert_eq!(chat.channel_count(), 1);
    assert!(chat.has_grant(&user));
    assert!(course(&store, 7).await.is_provisioned());
    assert_eq!(store.inner.membership_count(), 1);
}

#[tokio::test]
async fn provisioning_rollback_on_channel_create_failure() {
    let chat = FakeChat::new();
    let store = store_with_algebra();
    let guild = guild();
    chat.fail_on("create_channel");

    let saga = Enrollment::new(&store, &chat, &guild);
    let err = saga
        .join_course(&course(&store, 7).await, &UserId::from("u1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Provisioning {
            step: ProvisionStep::CreateChannel,
            ..
        }
    ));
    // The role created before the failure was deleted again.
    assert_eq!(chat.role_count(), 0);
    assert_eq!(chat.channel_count(), 0);
    assert!(!course(&store, 7).await.is_provisioned());
    assert_eq!(store.inner.membership_count(), 0);
}

#[tokio::test]
async fn provisioning_rollback_on_each_persistence_step() {
    for failing_op in ["insert_role", "insert_channel", "set_course_channel"] {
        let chat = FakeChat::new();
        let store = store_with_algebra();
        let guild = guild();
        store.fail_on(failing_op);

        let saga = Enrollment::new(&store, &chat, &guild);
        let err = saga
            .join_course(&course(&store, 7).await, &UserId::from("u1"))
            .await
            .unwrap_err();

        assert!(
            matches!(err, Error::Persistence(_)),
            "{failing_op}: expected persistence error, got {err}"
        );
        // Channel and role were both torn down, channel first.
        assert_eq!(chat.role_count(), 0, "{failing_op}: role leaked");
        assert_eq!(chat.channel_count(), 0, "{failing_op}: channel leaked");
        assert!(
            !course(&store, 7).await.is_provisioned(),
            "{failing_op}: course left partially bound"
        );
        assert_eq!(store.inner.membership_count(), 0);
    }
}

#[tokio::test]
async fn join_reverts_grant_when_membership_persist_fails() {
    let chat = FakeChat::new();
    let store = store_with_algebra();
    let guild = guild();
    let user = UserId::from("u1");
    store.fail_on("insert_membership");

    let saga = Enrollment::new(&store, &chat, &guild);
    let err = saga
        .join_course(&course(&store, 7).await, &user)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Persistence(_)));
    assert!(!chat.has_grant(&user));

    use study_hall::store::CourseStore;
    assert!(!store.has_membership(&user, CourseId(7)).await.unwrap());
    // Provisioning itself committed; the channel is reused next time.
    assert!(course(&store, 7).await.is_provisioned());
}

#[tokio::test]
async fn leave_restores_membership_when_revoke_fails() {
    let chat = FakeChat::new();
    let store = store_with_algebra();
    let guild = guild();
    let user = UserId::from("u1");

    let saga = Enrollment::new(&store, &chat, &guild);
    saga.join_course(&course(&store, 7).await, &user).await.unwrap();

    chat.fail_on("remove_member_role");
    let err = saga
        .leave_course(&course(&store, 7).await, &user)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Provisioning {
            step: ProvisionStep::RevokeRole,
            ..
        }
    ));

    use study_hall::store::CourseStore;
    assert!(store.has_membership(&user, CourseId(7)).await.unwrap());
    assert!(chat.has_grant(&user));
}

#[tokio::test]
async fn compensation_failure_is_surfaced_with_both_errors() {
    let chat = FakeChat::new();
    let store = store_with_algebra();
    let guild = guild();
    let user = UserId::from("u1");

    // Membership persist fails, and so does the grant revocation that
    // should undo the grant.
    store.fail_on("insert_membership");
    chat.fail_on("remove_member_role");

    let saga = Enrollment::new(&store, &chat, &guild);
    let err = saga
        .join_course(&course(&store, 7).await, &user)
        .await
        .unwrap_err();

    let Error::Compensation {
        original,
        compensation,
    } = err
    else {
        panic!("expected compensation error, got {err}");
    };
    assert!(matches!(*original, Error::Persistence(_)));
    assert!(matches!(
        *compensation,
        Error::Provisioning {
            step: ProvisionStep::RevokeRole,
            ..
        }
    ));
}

#[tokio::test]
async fn leave_compensation_failure_reports_inconsistency() {
    let chat = FakeChat::new();
    let store = store_with_algebra();
    let guild = guild();
    let user = UserId::from("u1");

    let saga = Enrollment::new(&store, &chat, &guild);
    saga.join_course(&course(&store, 7).await, &user).await.unwrap();

    // Revocation fails and the membership row cannot be re-inserted.
    chat.fail_on("remove_member_role");
    store.fail_on("insert_membership");

    let err = saga
        .leave_course(&course(&store, 7).await, &user)
        .await
        .unwrap_err();

    let Error::Compensation {
        original,
        compensation,
    } = err
    else {
        panic!("expected compensation error, got {err}");
    };
    assert!(matches!(
        *original,
        Error::Provisioning {
            step: ProvisionStep::RevokeRole,
            ..
        }
    ));
    assert!(matches!(*compensation, Error::Persistence(_)));
}

#[tokio::test]
async fn double_join_rejected_without_mutation() {
    let chat = FakeChat::new();
    let store = store_with_algebra();
    let guild = guild();
    let user = UserId::from("u1");

    let saga = Enrollment::new(&store, &chat, &guild);
    saga.join_course(&course(&store, 7).await, &user).await.unwrap();

    let calls_before = chat.call_count();
    let err = saga
        .join_course(&course(&store, 7).await, &user)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AlreadyJoined));
    // No provisioner calls at all on the rejected attempt.
    assert_eq!(chat.call_count(), calls_before);
    assert_eq!(store.inner.membership_count(), 1);
    assert_eq!(chat.grant_count(), 1);
}

#[tokio::test]
async fn double_leave_rejected_without_mutation() {
    let chat = FakeChat::new();
    let store = store_with_algebra();
    let guild = guild();
    let user = UserId::from("u1");

    let saga = Enrollment::new(&store, &chat, &guild);
    let err = saga
        .leave_course(&course(&store, 7).await, &user)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotJoined));
    assert_eq!(chat.call_count(), 0);
    assert_eq!(store.inner.membership_count(), 0);
}

#[tokio::test]
async fn channel_and_role_are_reused_for_later_joiners() {
    let chat = FakeChat::new();
    let store = store_with_algebra();
    let guild = guild();
    let first = UserId::from("u1");
    let second = UserId::from("v1");

    let saga = Enrollment::new(&store, &chat, &guild);

    // First joiner provisions the course.
    saga.join_course(&course(&store, 7).await, &first).await.unwrap();
    assert_eq!(chat.role_count(), 1);
    assert_eq!(chat.channel_count(), 1);

    // Leaving removes only the membership and the grant.
    saga.leave_course(&course(&store, 7).await, &first).await.unwrap();
    use study_hall::store::CourseStore;
    assert!(!store.has_membership(&first, CourseId(7)).await.unwrap());
    assert!(!chat.has_grant(&first));
    assert_eq!(chat.role_count(), 1);
    assert_eq!(chat.channel_count(), 1);
    assert!(course(&store, 7).await.is_provisioned());

    // Second joiner reuses the existing binding.
    saga.join_course(&course(&store, 7).await, &second).await.unwrap();
    assert_eq!(chat.role_count(), 1);
    assert_eq!(chat.channel_count(), 1);
    assert!(store.has_membership(&second, CourseId(7)).await.unwrap());
    assert!(chat.has_grant(&second));
}
