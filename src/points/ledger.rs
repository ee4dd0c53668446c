//! User accounts and the atomic deduction primitive.
//!
//! All balance mutations happen under one mutex: the sufficiency check, the
//! subtraction, and the persist are a single critical section, so two
//! concurrent requests for the same user can never both pass the check.
//! Balances are `u32` — an account can not go negative by construction.
//!
//! The ledger knows nothing about roles beyond storing them; whether a
//! given account should be charged at all is the caller's decision.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::PointsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

/// A user account as exposed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub username: String,
    pub role: Role,
    pub points: u32,
}

/// On-disk record — the username is the map key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAccount {
    role: Role,
    points: u32,
}

/// JSON-persisted account ledger.
pub struct Ledger {
    path: PathBuf,
    inner: Mutex<BTreeMap<String, StoredAccount>>,
}

impl Ledger {
    /// Open the ledger. A missing file means no accounts yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PointsError> {
        let path = path.into();
        let accounts = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            inner: Mutex::new(accounts),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredAccount>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create an account with an initial balance.
    pub fn create(&self, username: &str, role: Role, points: u32) -> Result<Account, PointsError> {
        let mut accounts = self.lock();
        if accounts.contains_key(username) {
            return Err(PointsError::DuplicateUser(username.to_string()));
        }
        let mut next = accounts.clone();
        next.insert(username.to_string(), StoredAccount { role, points });
        persist(&self.path, &next)?;
        *accounts = next;
        info!(username, ?role, points, "account created");
        Ok(Account {
            username: username.to_string(),
            role,
            points,
        })
    }

    pub fn get(&self, username: &str) -> Option<Account> {
        self.lock().get(username).map(|a| Account {
            username: username.to_string(),
            role: a.role,
            points: a.points,
        })
    }

    pub fn list(&self) -> Vec<Account> {
        self.lock()
            .iter()
            .map(|(username, a)| Account {
                username: username.clone(),
                role: a.role,
                points: a.points,
            })
            .collect()
    }

    pub fn balance(&self, username: &str) -> Result<u32, PointsError> {
        self.lock()
            .get(username)
            .map(|a| a.points)
            .ok_or_else(|| PointsError::UnknownUser(username.to_string()))
    }

    /// Deduct `cost` from a balance. Fails without mutation when the balance
    /// is insufficient; returns the remaining balance on success. The whole
    /// check-subtract-persist runs under the ledger lock.
    pub fn deduct(&self, username: &str, cost: u32) -> Result<u32, PointsError> {
        let mut accounts = self.lock();
        let balance = accounts
            .get(username)
            .map(|a| a.points)
            .ok_or_else(|| PointsError::UnknownUser(username.to_string()))?;
        if balance < cost {
            return Err(PointsError::InsufficientPoints {
                username: username.to_string(),
                balance,
                required: cost,
            });
        }
        let mut next = accounts.clone();
        if let Some(a) = next.get_mut(username) {
            a.points = balance - cost;
        }
        persist(&self.path, &next)?;
        *accounts = next;
        let remaining = balance - cost;
        info!(username, cost, remaining, "points deducted");
        Ok(remaining)
    }

    /// Add (or remove) points. The balance clamps at zero on a negative
    /// delta larger than the balance. Returns the new balance.
    pub fn adjust(&self, username: &str, delta: i64) -> Result<u32, PointsError> {
        let mut accounts = self.lock();
        let balance = accounts
            .get(username)
            .map(|a| a.points)
            .ok_or_else(|| PointsError::UnknownUser(username.to_string()))?;
        let updated = (i64::from(balance) + delta).clamp(0, i64::from(u32::MAX)) as u32;
        let mut next = accounts.clone();
        if let Some(a) = next.get_mut(username) {
            a.points = updated;
        }
        persist(&self.path, &next)?;
        *accounts = next;
        Ok(updated)
    }

    /// Overwrite a balance outright.
    pub fn set_points(&self, username: &str, points: u32) -> Result<u32, PointsError> {
        let mut accounts = self.lock();
        if !accounts.contains_key(username) {
            return Err(PointsError::UnknownUser(username.to_string()));
        }
        let mut next = accounts.clone();
        if let Some(a) = next.get_mut(username) {
            a.points = points;
        }
        persist(&self.path, &next)?;
        *accounts = next;
        Ok(points)
    }
}

fn persist(path: &Path, accounts: &BTreeMap<String, StoredAccount>) -> Result<(), PointsError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(accounts)?)?;
    Ok(())
}
