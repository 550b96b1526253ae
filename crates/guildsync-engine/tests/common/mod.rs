//! Shared test harness: an in-memory directory fake and an assembled
//! service around it.

#![allow(dead_code)] // not every test binary exercises every helper

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use guildsync_cache::MemoryStore;
use guildsync_core::{
    ChannelId, Directory, DirectoryError, DirectoryMember, DirectoryResult, DirectoryRole,
    GuildId, IdentityLinkStore, LocalUserId, MappingTable, MemoryLinkStore, MemoryRoleStore,
    Message, RoleId, RoleMapping, UserId,
};
use guildsync_engine::{GuildSync, SyncSettings};

/// The guild every engine test runs against.
pub const TEST_GUILD: u64 = 1;

/// In-memory directory with call counting and fault injection.
#[derive(Default)]
pub struct FakeDirectory {
    roles: RwLock<Vec<DirectoryRole>>,
    members: RwLock<HashMap<UserId, Vec<RoleId>>>,
    /// Every bulk role write, in order.
    set_calls: RwLock<Vec<(UserId, Vec<RoleId>)>>,
    messages: RwLock<Vec<(ChannelId, Message)>>,
    member_fetches: AtomicUsize,
    fail_member_fetches: AtomicBool,
    /// Artificial latency on member fetches, for concurrency tests.
    fetch_delay_ms: AtomicUsize,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_role(&self, id: u64, name: &str, position: i64) {
        self.roles.write().await.push(DirectoryRole {
            id: RoleId::new(id),
            name: name.to_string(),
            position,
        });
    }

    pub async fn add_member(&self, user: UserId, roles: &[u64]) {
        self.members
            .write()
            .await
            .insert(user, roles.iter().map(|&r| RoleId::new(r)).collect());
    }

    pub async fn member_roles(&self, user: UserId) -> Option<Vec<RoleId>> {
        self.members.read().await.get(&user).cloned()
    }

    pub async fn set_calls(&self) -> Vec<(UserId, Vec<RoleId>)> {
        self.set_calls.read().await.clone()
    }

    pub async fn messages(&self) -> Vec<(ChannelId, Message)> {
        self.messages.read().await.clone()
    }

    pub fn member_fetch_count(&self) -> usize {
        self.member_fetches.load(Ordering::SeqCst)
    }

    pub fn fail_member_fetches(&self, fail: bool) {
        self.fail_member_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        self.fetch_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    async fn member_or_not_found(&self, user_id: UserId) -> DirectoryResult<Vec<RoleId>> {
        self.member_fetches.fetch_add(1, Ordering::SeqCst);

        let delay = self.fetch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }

        if self.fail_member_fetches.load(Ordering::SeqCst) {
            return Err(DirectoryError::Api {
                status: 500,
                code: "0".to_string(),
                message: "injected failure".to_string(),
            });
        }

        self.members
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found("member", Some(user_id.to_string())))
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn list_roles(&self, _force: bool) -> DirectoryResult<Vec<DirectoryRole>> {
        let mut roles = self.roles.read().await.clone();
        roles.sort_by(|a, b| b.position.cmp(&a.position));
        Ok(roles)
    }

    async fn get_member(&self, user_id: UserId, force: bool) -> DirectoryResult<DirectoryMember> {
        let roles = self.member_or_not_found(user_id).await?;
        let _ = force;
        Ok(DirectoryMember {
            user_id,
            nick: None,
            roles,
        })
    }

    async fn get_member_roles(&self, user_id: UserId, _force: bool) -> DirectoryResult<Vec<RoleId>> {
        self.member_or_not_found(user_id).await
    }

    async fn is_member(
        &self,
        user_id: UserId,
        _force: bool,
        _sensitive: bool,
    ) -> DirectoryResult<bool> {
        match self.member_or_not_found(user_id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn set_member_roles(&self, user_id: UserId, roles: Vec<RoleId>) -> DirectoryResult<()> {
        self.set_calls
            .write()
            .await
            .push((user_id, roles.clone()));
        self.members.write().await.insert(user_id, roles);
        Ok(())
    }

    async fn post_message(&self, channel: ChannelId, message: &Message) -> DirectoryResult<()> {
        self.messages.write().await.push((channel, message.clone()));
        Ok(())
    }
}

/// Everything a test needs, with every collaborator reachable.
pub struct Harness {
    pub directory: Arc<FakeDirectory>,
    pub store: Arc<MemoryStore>,
    pub links: Arc<MemoryLinkStore>,
    pub roles: Arc<MemoryRoleStore>,
    pub service: GuildSync,
}

/// The standard two-row mapping: R1 -> "member", R2 -> "vip".
pub fn standard_mappings() -> MappingTable {
    mappings(&[(1, "member"), (2, "vip")])
}

/// Builds a mapping table from (directory role, local role) pairs in
/// administrator order.
pub fn mappings(rows: &[(u64, &str)]) -> MappingTable {
    MappingTable::new(
        rows.iter()
            .map(|&(role, local)| RoleMapping {
                directory_role: RoleId::new(role),
                local_role: local.to_string(),
            })
            .collect(),
    )
    .expect("test mapping should be valid")
}

/// Assembles a service around fresh in-memory stores.
pub fn harness(settings: SyncSettings) -> Harness {
    let directory = Arc::new(FakeDirectory::new());
    let store = Arc::new(MemoryStore::new());
    let links = Arc::new(MemoryLinkStore::new());
    let roles = Arc::new(MemoryRoleStore::new());

    let service = GuildSync::builder()
        .guild_id(GuildId::new(TEST_GUILD))
        .directory(Arc::clone(&directory) as Arc<dyn Directory>)
        .store(Arc::clone(&store) as Arc<dyn guildsync_cache::CacheStore>)
        .links(Arc::clone(&links) as Arc<dyn guildsync_core::IdentityLinkStore>)
        .roles(Arc::clone(&roles) as Arc<dyn guildsync_core::LocalRoleStore>)
        .settings(settings)
        .build()
        .expect("test settings should be valid");

    Harness {
        directory,
        store,
        links,
        roles,
        service,
    }
}

/// Links a fresh local identity to the given external account.
pub async fn linked_user(h: &Harness, external: u64) -> (LocalUserId, UserId) {
    let local = LocalUserId::new();
    let user = UserId::new(external);
    h.links.link(local, user).await.unwrap();
    (local, user)
}
