//! Test support: a manually driven clock and in-memory repositories.
//!
//! The fakes guard their maps with a `Mutex`, so the conditional
//! updates (rotation claim, lockout counting) keep their atomicity
//! under concurrent test tasks exactly like the SQL statements do.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use tourhub_core::clock::Clock;
use tourhub_core::config::auth::AuthConfig;
use tourhub_core::error::AppError;
use tourhub_core::result::AppResult;
use tourhub_database::repositories::{
    BlacklistRepository, RefreshTokenRepository, StaffRepository,
};
use tourhub_entity::device::DeviceInfo;
use tourhub_entity::principal::PrincipalType;
use tourhub_entity::staff::{LockoutStatus, Staff, StaffRole, StaffStatus};
use tourhub_entity::token::{
    BlacklistEntry, BlacklistKind, IpCreationCount, NewBlacklistEntry, NewRefreshToken,
    PrincipalRevocationCount, RefreshTokenRecord, RevocationReason,
};

use crate::blacklist::TokenBlacklist;
use crate::lockout::LockoutGuard;
use crate::password::PasswordHasher;
use crate::permission::{PermissionCache, StaffPermissionSource};
use crate::refresh::RefreshTokenStore;
use crate::session::SessionLifecycleCoordinator;
use crate::token::{TokenIssuer, TokenVerifier};

/// A clock that only moves when told to.
#[derive(Debug)]
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn starting_now() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }

    pub(crate) fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap() = to;
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// In-memory [`StaffRepository`].
#[derive(Debug, Default)]
pub(crate) struct InMemoryStaffRepository {
    staff: Mutex<HashMap<Uuid, Staff>>,
}

impl InMemoryStaffRepository {
    pub(crate) fn insert(&self, staff: Staff) {
        self.staff.lock().unwrap().insert(staff.id, staff);
    }

    pub(crate) fn get(&self, id: Uuid) -> Option<Staff> {
        self.staff.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn set_status(&self, id: Uuid, status: StaffStatus) {
        if let Some(staff) = self.staff.lock().unwrap().get_mut(&id) {
            staff.status = status;
        }
    }
}

#[async_trait]
impl StaffRepository for InMemoryStaffRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Staff>> {
        Ok(self.staff.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Staff>> {
        Ok(self
            .staff
            .lock()
            .unwrap()
            .values()
            .find(|s| s.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn record_failed_attempt(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        threshold: i32,
        lock_until: DateTime<Utc>,
    ) -> AppResult<LockoutStatus> {
        let mut staff = self.staff.lock().unwrap();
        let staff = staff
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Staff {id} not found")))?;

        let lock_expired = staff.locked_until.is_some_and(|u| u <= now);
        let currently_locked = staff.locked_until.is_some_and(|u| u > now);

        let new_count = if lock_expired {
            1
        } else {
            staff.failed_login_attempts + 1
        };
        staff.failed_login_attempts = new_count;
        staff.locked_until = if currently_locked {
            staff.locked_until
        } else if new_count >= threshold {
            Some(lock_until)
        } else {
            None
        };
        staff.updated_at = now;

        Ok(LockoutStatus {
            failed_attempts: staff.failed_login_attempts,
            locked_until: staff.locked_until,
        })
    }

    async fn clear_lockout(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let mut staff = self.staff.lock().unwrap();
        if let Some(staff) = staff.get_mut(&id) {
            staff.failed_login_attempts = 0;
            staff.locked_until = None;
            staff.last_login_at = Some(now);
            staff.updated_at = now;
        }
        Ok(())
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut staff = self.staff.lock().unwrap();
        let staff = staff
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Staff {id} not found")))?;
        staff.password_hash = password_hash.to_string();
        staff.last_password_change_at = Some(now);
        staff.updated_at = now;
        Ok(())
    }

    async fn update_role(&self, id: Uuid, role: StaffRole) -> AppResult<Staff> {
        let mut staff = self.staff.lock().unwrap();
        let staff = staff
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Staff {id} not found")))?;
        staff.role = role;
        Ok(staff.clone())
    }
}

/// In-memory [`RefreshTokenRepository`].
#[derive(Debug, Default)]
pub(crate) struct InMemoryRefreshTokenRepository {
    records: Mutex<HashMap<Uuid, RefreshTokenRecord>>,
}

impl InMemoryRefreshTokenRepository {
    pub(crate) fn get(&self, id: Uuid) -> Option<RefreshTokenRecord> {
        self.records.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn insert(&self, data: &NewRefreshToken) -> AppResult<RefreshTokenRecord> {
        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            token_hash: data.token_hash.clone(),
            principal_id: data.principal_id,
            principal_type: data.principal_type,
            device_info: data.device_info.clone(),
            ip_address: data.ip_address.clone(),
            expires_at: data.expires_at,
            revoked: false,
            revoked_at: None,
            revoked_reason: None,
            usage_count: 0,
            last_used_at: None,
            created_at: data.created_at,
        };
        self.records
            .lock()
            .unwrap()
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_valid_by_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<RefreshTokenRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| r.token_hash == token_hash && !r.revoked && r.expires_at > now)
            .cloned())
    }

    async fn touch_usage(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        if let Some(record) = self.records.lock().unwrap().get_mut(&id) {
            record.usage_count += 1;
            record.last_used_at = Some(now);
        }
        Ok(())
    }

    async fn revoke(
        &self,
        id: Uuid,
        reason: RevocationReason,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&id) {
            Some(record) if !record.revoked => {
                record.revoked = true;
                record.revoked_at = Some(now);
                record.revoked_reason = Some(reason.as_str().to_string());
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn revoke_all_for_principal(
        &self,
        principal_id: Uuid,
        principal_type: PrincipalType,
        reason: RevocationReason,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut flipped = 0;
        for record in self.records.lock().unwrap().values_mut() {
            if record.principal_id == principal_id
                && record.principal_type == principal_type
                && !record.revoked
            {
                record.revoked = true;
                record.revoked_at = Some(now);
                record.revoked_reason = Some(reason.as_str().to_string());
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn claim_for_rotation(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<RefreshTokenRecord>> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&id) {
            Some(record) if !record.revoked => {
                record.revoked = true;
                record.revoked_at = Some(now);
                record.revoked_reason = Some(RevocationReason::Rotated.as_str().to_string());
                record.usage_count += 1;
                record.last_used_at = Some(now);
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_expired(
        &self,
        now: DateTime<Utc>,
        revoked_before: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, r| {
            !(r.expires_at < now || (r.revoked && r.revoked_at.is_some_and(|at| at < revoked_before)))
        });
        Ok((before - records.len()) as u64)
    }

    async fn creation_hotspots(
        &self,
        since: DateTime<Utc>,
        min_count: i64,
    ) -> AppResult<Vec<IpCreationCount>> {
        let mut counts: HashMap<String, i64> = HashMap::new();
        for record in self.records.lock().unwrap().values() {
            if record.created_at >= since {
                if let Some(ip) = &record.ip_address {
                    *counts.entry(ip.clone()).or_default() += 1;
                }
            }
        }
        Ok(counts
            .into_iter()
            .filter(|(_, created)| *created >= min_count)
            .map(|(ip_address, created)| IpCreationCount {
                ip_address,
                created,
            })
            .collect())
    }

    async fn security_revocation_hotspots(
        &self,
        since: DateTime<Utc>,
        min_count: i64,
    ) -> AppResult<Vec<PrincipalRevocationCount>> {
        let security: Vec<&str> = RevocationReason::SECURITY.iter().map(|r| r.as_str()).collect();
        let mut counts: HashMap<Uuid, i64> = HashMap::new();
        for record in self.records.lock().unwrap().values() {
            if record.revoked_at.is_some_and(|at| at >= since)
                && record
                    .revoked_reason
                    .as_deref()
                    .is_some_and(|r| security.contains(&r))
            {
                *counts.entry(record.principal_id).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .filter(|(_, revoked)| *revoked >= min_count)
            .map(|(principal_id, revoked)| PrincipalRevocationCount {
                principal_id,
                revoked,
            })
            .collect())
    }

    async fn find_high_usage(&self, min_usage: i32) -> AppResult<Vec<RefreshTokenRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.usage_count >= min_usage && !r.revoked)
            .cloned()
            .collect())
    }
}

/// In-memory [`BlacklistRepository`].
#[derive(Debug, Default)]
pub(crate) struct InMemoryBlacklistRepository {
    entries: Mutex<Vec<BlacklistEntry>>,
}

impl InMemoryBlacklistRepository {
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl BlacklistRepository for InMemoryBlacklistRepository {
    async fn insert(&self, entry: &NewBlacklistEntry) -> AppResult<BlacklistEntry> {
        let stored = BlacklistEntry {
            id: Uuid::new_v4(),
            kind: entry.kind,
            token_hash: entry.token_hash.clone(),
            jti: entry.jti,
            principal_id: entry.principal_id,
            principal_type: entry.principal_type,
            expires_at: entry.expires_at,
            reason: entry.reason.clone(),
            created_at: entry.created_at,
        };
        self.entries.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn exists_token_hash(&self, token_hash: &str, now: DateTime<Utc>) -> AppResult<bool> {
        Ok(self.entries.lock().unwrap().iter().any(|e| {
            e.kind == BlacklistKind::Token
                && e.token_hash.as_deref() == Some(token_hash)
                && e.expires_at > now
        }))
    }

    async fn latest_sentinel_at(
        &self,
        principal_id: Uuid,
        principal_type: PrincipalType,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DateTime<Utc>>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                e.kind == BlacklistKind::Sentinel
                    && e.principal_id == principal_id
                    && e.principal_type == principal_type
                    && e.expires_at > now
            })
            .map(|e| e.created_at)
            .max())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.expires_at >= now);
        Ok((before - entries.len()) as u64)
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.created_at >= cutoff);
        Ok((before - entries.len()) as u64)
    }
}

/// Auth configuration used by the tests.
pub(crate) fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-signing-secret".into(),
        jwt_issuer: "tourhub".into(),
        jwt_audience: "tourhub-staff".into(),
        access_token_lifetime: "15m".into(),
        refresh_token_lifetime_days: 30,
        rotate_refresh_tokens: true,
        revoked_retention_days: 7,
        sentinel_ttl_hours: 24,
        max_failed_attempts: 5,
        lockout_duration_minutes: 120,
        permission_cache_ttl_seconds: 300,
        password_min_length: 8,
    }
}

/// Fully wired coordinator over the in-memory fakes.
pub(crate) struct TestHarness {
    pub clock: Arc<ManualClock>,
    pub staff_repo: Arc<InMemoryStaffRepository>,
    pub refresh_repo: Arc<InMemoryRefreshTokenRepository>,
    pub blacklist_repo: Arc<InMemoryBlacklistRepository>,
    pub issuer: Arc<TokenIssuer>,
    pub verifier: Arc<TokenVerifier>,
    pub refresh_store: Arc<RefreshTokenStore>,
    pub blacklist: Arc<TokenBlacklist>,
    pub permissions: Arc<PermissionCache>,
    pub coordinator: SessionLifecycleCoordinator,
    pub hasher: PasswordHasher,
}

impl TestHarness {
    pub(crate) fn new() -> Self {
        Self::with_config(test_config())
    }

    pub(crate) fn with_config(config: AuthConfig) -> Self {
        let clock = Arc::new(ManualClock::starting_now());
        let staff_repo = Arc::new(InMemoryStaffRepository::default());
        let refresh_repo = Arc::new(InMemoryRefreshTokenRepository::default());
        let blacklist_repo = Arc::new(InMemoryBlacklistRepository::default());

        let clock_dyn: Arc<dyn Clock> = clock.clone();
        let issuer = Arc::new(TokenIssuer::new(&config, clock_dyn.clone()).unwrap());
        let blacklist = Arc::new(TokenBlacklist::new(
            blacklist_repo.clone(),
            clock_dyn.clone(),
            &config,
        ));
        let verifier = Arc::new(TokenVerifier::new(&config, blacklist.clone()));
        let refresh_store = Arc::new(RefreshTokenStore::new(
            refresh_repo.clone(),
            clock_dyn.clone(),
            &config,
        ));
        let lockout = Arc::new(LockoutGuard::new(
            staff_repo.clone(),
            clock_dyn.clone(),
            &config,
        ));
        let permissions = Arc::new(PermissionCache::new(
            Arc::new(StaffPermissionSource::new(staff_repo.clone())),
            clock_dyn.clone(),
            config.permission_cache_ttl(),
        ));
        let hasher = PasswordHasher::new();

        let coordinator = SessionLifecycleCoordinator::new(
            staff_repo.clone(),
            issuer.clone(),
            verifier.clone(),
            refresh_store.clone(),
            blacklist.clone(),
            lockout,
            permissions.clone(),
            Arc::new(hasher.clone()),
            clock_dyn,
            &config,
        );

        Self {
            clock,
            staff_repo,
            refresh_repo,
            blacklist_repo,
            issuer,
            verifier,
            refresh_store,
            blacklist,
            permissions,
            coordinator,
            hasher,
        }
    }

    /// Insert an active staff member with the given credentials.
    pub(crate) fn add_staff(&self, email: &str, password: &str, role: StaffRole) -> Staff {
        let now = self.clock.now();
        let staff = Staff {
            id: Uuid::new_v4(),
            email: email.to_string(),
            full_name: "Test Staff".into(),
            password_hash: self.hasher.hash_password(password).unwrap(),
            role,
            status: StaffStatus::Active,
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            last_password_change_at: None,
            created_at: now,
            updated_at: now,
        };
        self.staff_repo.insert(staff.clone());
        staff
    }

    pub(crate) fn device(&self) -> DeviceInfo {
        DeviceInfo {
            user_agent: Some("tests/1.0".into()),
            ip_address: Some("203.0.113.7".into()),
            device_id: None,
            platform: Some("test".into()),
        }
    }
}
