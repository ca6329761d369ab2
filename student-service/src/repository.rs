//! Student repositories
//!
//! Storage boundary for accounts and courses, with in-memory implementations
//! for tests and development.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use thiserror::Error;

use crate::models::{Account, Course};

/// Repository errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Account storage
#[allow(async_fn_in_trait)]
pub trait AccountRepository: Send + Sync {
    /// Find an account by its unique username
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>>;

    /// Find an account by id
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>>;

    /// Insert a new account or update an existing one.
    ///
    /// Fails with [`RepositoryError::Conflict`] when another account already
    /// holds the username.
    async fn save(&self, account: &Account) -> Result<Account>;
}

/// Course storage
#[allow(async_fn_in_trait)]
pub trait CourseRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Course>>;

    async fn find_all(&self) -> Result<Vec<Course>>;

    /// Courses the student is enrolled in
    async fn find_all_by_student_id(&self, student_id: i64) -> Result<Vec<Course>>;

    /// Insert a new course or update an existing one
    async fn save(&self, course: &Course) -> Result<Course>;
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()).into())
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()).into())
}

/// In-memory account repository
pub struct InMemoryAccountRepository {
    accounts: RwLock<Vec<Account>>,
    next_id: AtomicI64,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let accounts = read(&self.accounts)?;
        Ok(accounts.iter().find(|a| a.username == username).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let accounts = read(&self.accounts)?;
        Ok(accounts.iter().find(|a| a.id == Some(id)).cloned())
    }

    async fn save(&self, account: &Account) -> Result<Account> {
        let mut accounts = write(&self.accounts)?;

        if accounts
            .iter()
            .any(|a| a.username == account.username && a.id != account.id)
        {
            return Err(RepositoryError::Conflict(format!("username {}", account.username)).into());
        }

        match account.id {
            Some(id) => {
                let existing = accounts
                    .iter_mut()
                    .find(|a| a.id == Some(id))
                    .ok_or_else(|| RepositoryError::NotFound(format!("Account with id {id}")))?;
                let created_at = existing.created_at;
                *existing = account.clone();
                existing.created_at = created_at;
                Ok(existing.clone())
            }
            None => {
                let mut new_account = account.clone();
                new_account.id = Some(self.next_id.fetch_add(1, Ordering::SeqCst));
                new_account.created_at = Some(chrono::Utc::now());
                accounts.push(new_account.clone());
                Ok(new_account)
            }
        }
    }
}

/// In-memory course repository
pub struct InMemoryCourseRepository {
    courses: RwLock<Vec<Course>>,
    next_id: AtomicI64,
}

impl InMemoryCourseRepository {
    pub fn new() -> Self {
        Self {
            courses: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryCourseRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl CourseRepository for InMemoryCourseRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Course>> {
        let courses = read(&self.courses)?;
        Ok(courses.iter().find(|c| c.id == Some(id)).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Course>> {
        Ok(read(&self.courses)?.clone())
    }

    async fn find_all_by_student_id(&self, student_id: i64) -> Result<Vec<Course>> {
        let courses = read(&self.courses)?;
        Ok(courses
            .iter()
            .filter(|c| c.has_student(student_id))
            .cloned()
            .collect())
    }

    async fn save(&self, course: &Course) -> Result<Course> {
        let mut courses = write(&self.courses)?;
        match course.id {
            Some(id) => {
                let existing = courses
                    .iter_mut()
                    .find(|c| c.id == Some(id))
                    .ok_or_else(|| RepositoryError::NotFound(format!("Course with id {id}")))?;
                *existing = course.clone();
                Ok(existing.clone())
            }
            None => {
                let mut new_course = course.clone();
                new_course.id = Some(self.next_id.fetch_add(1, Ordering::SeqCst));
                courses.push(new_course.clone());
                Ok(new_course)
            }
        }
    }
}
