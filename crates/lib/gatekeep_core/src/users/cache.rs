//! Multi-keyed TTL cache in front of a [`UserStore`].
//!
//! A principal is cached once, keyed by id, and reachable through two alias
//! indexes (email and refresh digest). Aliases are only trusted when the
//! entry they point at still carries the same value, so a stale alias reads
//! as a miss.
//!
//! Writers bump an epoch before touching the cache. A read-through fill only
//! lands if the epoch has not moved since the fill started, which keeps a
//! slow reader from resurrecting a principal that was deleted or changed
//! while it was talking to the store.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tracing::trace;
use uuid::Uuid;

use super::UserStore;
use crate::error::AuthError;
use crate::models::User;

/// Default entry TTL: 10 seconds.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

/// Default maximum number of cached principals.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Share of entries dropped when the cache overflows after expiry cleanup.
pub const DEFAULT_EVICTION_PERCENTAGE: usize = 10;

/// Number of shards per index. Must be a power of two.
const SHARDS: usize = 16;

/// Number of writer lock stripes.
const WRITE_STRIPES: usize = 16;

#[derive(Debug, Clone)]
struct CachedUser {
    user: User,
    expires_at: Instant,
}

impl CachedUser {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Cache sizing knobs.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub capacity: usize,
    pub eviction_percentage: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            capacity: DEFAULT_CAPACITY,
            eviction_percentage: DEFAULT_EVICTION_PERCENTAGE,
        }
    }
}

/// Sharded principal cache with id, email and refresh-digest keys.
#[derive(Debug)]
pub struct UserCache {
    entries: DashMap<Uuid, CachedUser>,
    by_email: DashMap<String, Uuid>,
    by_refresh: DashMap<String, Uuid>,
    epoch: AtomicU64,
    config: CacheConfig,
}

impl UserCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::with_shard_amount(SHARDS),
            by_email: DashMap::with_shard_amount(SHARDS),
            by_refresh: DashMap::with_shard_amount(SHARDS),
            epoch: AtomicU64::new(0),
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current write epoch. Capture before a store read, pass to [`fill`].
    ///
    /// [`fill`]: UserCache::fill
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn get_by_id(&self, id: Uuid) -> Option<User> {
        let hit = self
            .entries
            .get(&id)
            .filter(|c| !c.is_expired())
            .map(|c| c.user.clone());
        if hit.is_none() {
            self.entries.remove_if(&id, |_, c| c.is_expired());
        }
        hit
    }

    pub fn get_by_email(&self, email: &str) -> Option<User> {
        let id = *self.by_email.get(email)?;
        self.get_by_id(id).filter(|u| u.email == email)
    }

    pub fn get_by_refresh_digest(&self, digest: &str) -> Option<User> {
        let id = *self.by_refresh.get(digest)?;
        self.get_by_id(id)
            .filter(|u| u.refresh_digest.as_deref() == Some(digest))
    }

    /// Write-through after a successful store write. All three keys move
    /// together.
    pub fn write(&self, user: &User) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.put(user);
        self.enforce_capacity();
    }

    /// Read-through population. Skipped if any write happened since `seen`.
    pub fn fill(&self, user: &User, seen: u64) {
        let landed = {
            let slot = self.entries.entry(user.id);
            if self.epoch() != seen {
                false
            } else {
                self.link(slot, user);
                true
            }
        };
        if landed {
            self.enforce_capacity();
        } else {
            trace!(user_id = %user.id, "cache fill skipped, concurrent write");
        }
    }

    /// Drop a principal and every alias pointing at it.
    pub fn evict(&self, user: &User) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let removed = self.entries.remove(&user.id).map(|(_, c)| c.user);
        self.unlink_aliases(user);
        if let Some(old) = removed {
            self.unlink_aliases(&old);
        }
    }

    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
        self.by_email.clear();
        self.by_refresh.clear();
    }

    fn put(&self, user: &User) {
        let slot = self.entries.entry(user.id);
        self.link(slot, user);
    }

    /// Install `user` in its slot while holding the slot's shard lock, moving
    /// aliases from the previous value to the new one.
    fn link(&self, slot: Entry<'_, Uuid, CachedUser>, user: &User) {
        let cached = CachedUser {
            user: user.clone(),
            expires_at: Instant::now() + self.config.ttl,
        };
        match slot {
            Entry::Occupied(mut occupied) => {
                let old = occupied.get().user.clone();
                if old.email != user.email {
                    self.by_email.remove_if(&old.email, |_, id| *id == old.id);
                }
                if old.refresh_digest != user.refresh_digest
                    && let Some(digest) = &old.refresh_digest
                {
                    self.by_refresh.remove_if(digest, |_, id| *id == old.id);
                }
                self.link_aliases(user);
                occupied.insert(cached);
            }
            Entry::Vacant(vacant) => {
                self.link_aliases(user);
                vacant.insert(cached);
            }
        }
    }

    fn link_aliases(&self, user: &User) {
        self.by_email.insert(user.email.clone(), user.id);
        if let Some(digest) = &user.refresh_digest {
            self.by_refresh.insert(digest.clone(), user.id);
        }
    }

    fn unlink_aliases(&self, user: &User) {
        self.by_email.remove_if(&user.email, |_, id| *id == user.id);
        if let Some(digest) = &user.refresh_digest {
            self.by_refresh.remove_if(digest, |_, id| *id == user.id);
        }
    }

    /// Keep the cache under capacity: expired entries go first, then an
    /// arbitrary `eviction_percentage` slice.
    fn enforce_capacity(&self) {
        if self.entries.len() <= self.config.capacity {
            return;
        }

        let expired: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|c| c.is_expired())
            .map(|c| *c.key())
            .collect();
        for id in expired {
            self.remove_if_expired(id);
        }

        let len = self.entries.len();
        if len > self.config.capacity {
            let target = (self.config.capacity * self.config.eviction_percentage / 100).max(1);
            let excess = len - self.config.capacity;
            let victims: Vec<Uuid> = self
                .entries
                .iter()
                .take(target.max(excess))
                .map(|c| *c.key())
                .collect();
            for id in victims {
                if let Some((_, c)) = self.entries.remove(&id) {
                    self.unlink_aliases(&c.user);
                }
            }
        }
        self.prune_aliases();
    }

    fn remove_if_expired(&self, id: Uuid) {
        if let Some((_, c)) = self.entries.remove_if(&id, |_, c| c.is_expired()) {
            self.unlink_aliases(&c.user);
        }
    }

    /// Drop alias entries whose target is gone. Collects first so no index
    /// lock is held while another index is consulted.
    fn prune_aliases(&self) {
        for index in [&self.by_email, &self.by_refresh] {
            let aliases: Vec<(String, Uuid)> = index
                .iter()
                .map(|a| (a.key().clone(), *a.value()))
                .collect();
            for (alias, id) in aliases {
                if !self.entries.contains_key(&id) {
                    index.remove_if(&alias, |_, v| *v == id);
                }
            }
        }
    }
}

/// [`UserStore`] decorator adding read-through and write-through caching.
///
/// Writers to the same principal are serialised on a lock stripe, so the
/// order of cache writes matches the order of store writes within the
/// process.
pub struct CachedUserStore<S> {
    inner: S,
    cache: UserCache,
    stripes: Vec<Mutex<()>>,
}

impl<S: UserStore> CachedUserStore<S> {
    pub fn new(inner: S, config: CacheConfig) -> Self {
        Self {
            inner,
            cache: UserCache::new(config),
            stripes: (0..WRITE_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn cache(&self) -> &UserCache {
        &self.cache
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn stripe(&self, id: Uuid) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        &self.stripes[(hasher.finish() as usize) % self.stripes.len()]
    }
}

#[async_trait]
impl<S: UserStore> UserStore for CachedUserStore<S> {
    async fn create(&self, user: &User) -> Result<(), AuthError> {
        let _guard = self.stripe(user.id).lock().await;
        self.inner.create(user).await?;
        self.cache.write(user);
        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), AuthError> {
        let _guard = self.stripe(user.id).lock().await;
        match self.inner.update(user).await {
            Ok(()) => {
                self.cache.write(user);
                Ok(())
            }
            Err(e) => {
                // The stored row is unknown after a failed write.
                self.cache.evict(user);
                Err(e)
            }
        }
    }

    async fn replace_refresh(&self, user: &User, expected: &str) -> Result<bool, AuthError> {
        let _guard = self.stripe(user.id).lock().await;
        let swapped = self.inner.replace_refresh(user, expected).await?;
        if swapped {
            match self.inner.query_by_id(user.id).await {
                Ok(fresh) => self.cache.write(&fresh),
                Err(_) => self.cache.evict(user),
            }
        }
        Ok(swapped)
    }

    async fn delete(&self, user: &User) -> Result<(), AuthError> {
        let _guard = self.stripe(user.id).lock().await;
        let result = self.inner.delete(user).await;
        self.cache.evict(user);
        result
    }

    async fn query_by_id(&self, id: Uuid) -> Result<User, AuthError> {
        if let Some(user) = self.cache.get_by_id(id) {
            return Ok(user);
        }
        let seen = self.cache.epoch();
        let user = self.inner.query_by_id(id).await?;
        self.cache.fill(&user, seen);
        Ok(user)
    }

    async fn query_by_email(&self, email: &str) -> Result<User, AuthError> {
        if let Some(user) = self.cache.get_by_email(email) {
            return Ok(user);
        }
        let seen = self.cache.epoch();
        let user = self.inner.query_by_email(email).await?;
        self.cache.fill(&user, seen);
        Ok(user)
    }

    async fn query_by_refresh_digest(&self, digest: &str) -> Result<User, AuthError> {
        if let Some(user) = self.cache.get_by_refresh_digest(digest) {
            return Ok(user);
        }
        let seen = self.cache.epoch();
        let user = self.inner.query_by_refresh_digest(digest).await?;
        self.cache.fill(&user, seen);
        Ok(user)
    }
}
