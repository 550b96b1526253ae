//! Facade behavior: linking, unlink-time cache invalidation, the read
//! surface and the notification passthrough.

mod common;

use std::time::Duration;

use common::*;
use guildsync_cache::{keys, CacheStore};
use guildsync_core::{ChannelId, GuildId, LinkError, Message, RoleId, UserId};
use guildsync_engine::SyncSettings;

#[tokio::test]
async fn test_link_rejects_a_second_link_for_the_same_external_account() {
    let h = harness(SyncSettings::for_testing(standard_mappings()));

    let (_, user) = linked_user(&h, 100).await;

    let result = h
        .service
        .link_identity(guildsync_core::LocalUserId::new(), user)
        .await;
    assert!(matches!(result, Err(LinkError::AlreadyLinked { .. })));
}

#[tokio::test]
async fn test_unlink_clears_the_identitys_cache_keys() {
    let h = harness(SyncSettings::for_testing(standard_mappings()));
    let (local, user) = linked_user(&h, 100).await;

    let guild = GuildId::new(TEST_GUILD);
    let ttl = Duration::from_secs(300);

    // Entries a synced identity accumulates.
    h.store
        .set(&keys::member(guild, user), "{}", ttl)
        .await
        .unwrap();
    h.store
        .set(&keys::member_negative(guild, user), "1", ttl)
        .await
        .unwrap();
    h.store
        .set(&keys::sync_attempts("to_local", local), "2", ttl)
        .await
        .unwrap();
    h.store
        .set(&keys::sync_lock("to_external", local), "1", ttl)
        .await
        .unwrap();
    // Another identity's entry must survive.
    let other = UserId::new(999);
    h.store
        .set(&keys::member(guild, other), "{}", ttl)
        .await
        .unwrap();

    h.service.unlink_identity(local).await.unwrap();

    assert!(h.store.get(&keys::member(guild, user)).await.unwrap().is_none());
    assert!(h
        .store
        .get(&keys::member_negative(guild, user))
        .await
        .unwrap()
        .is_none());
    assert!(h
        .store
        .get(&keys::sync_attempts("to_local", local))
        .await
        .unwrap()
        .is_none());
    assert!(h
        .store
        .get(&keys::sync_lock("to_external", local))
        .await
        .unwrap()
        .is_none());
    assert!(h.store.get(&keys::member(guild, other)).await.unwrap().is_some());

    // The pair can link again afterwards.
    h.service.link_identity(local, user).await.unwrap();
}

#[tokio::test]
async fn test_unlink_of_unlinked_account_is_a_noop() {
    let h = harness(SyncSettings::for_testing(standard_mappings()));
    h.service
        .unlink_identity(guildsync_core::LocalUserId::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_read_surface_passthrough() {
    let h = harness(SyncSettings::for_testing(standard_mappings()));
    let user = UserId::new(100);
    h.directory.add_member(user, &[1, 2]).await;

    assert!(h.service.is_member(user, false, false).await.unwrap());
    assert!(!h
        .service
        .is_member(UserId::new(999), false, true)
        .await
        .unwrap());

    let roles = h.service.get_member_roles(user).await.unwrap();
    assert_eq!(roles, vec![RoleId::new(1), RoleId::new(2)]);
}

#[tokio::test]
async fn test_post_message_reaches_the_directory() {
    let h = harness(SyncSettings::for_testing(standard_mappings()));

    let channel = ChannelId::new(42);
    let message = Message::text("order #1001 shipped");
    h.service.post_message(channel, &message).await.unwrap();

    let posted = h.directory.messages().await;
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].0, channel);
    assert_eq!(posted[0].1.content, "order #1001 shipped");
}

#[tokio::test]
async fn test_builder_rejects_missing_collaborators() {
    let result = guildsync_engine::GuildSync::builder()
        .guild_id(GuildId::new(1))
        .build();
    assert!(matches!(
        result,
        Err(guildsync_engine::SyncError::Config { .. })
    ));
}
