//! Course service
//!
//! Course creation, listing and enrollment.

use std::sync::Arc;

use chrono::Utc;
use error::AppError;

use crate::models::{Account, Course, CourseView, CreateCourseRequest};
use crate::repository::{AccountRepository, CourseRepository};

/// Course enrollment operations
pub struct CourseService<A, C> {
    accounts: Arc<A>,
    courses: Arc<C>,
}

impl<A: AccountRepository, C: CourseRepository> CourseService<A, C> {
    pub fn new(accounts: Arc<A>, courses: Arc<C>) -> Self {
        Self { accounts, courses }
    }

    /// Create a new course
    pub async fn create_course(&self, request: CreateCourseRequest) -> Result<CourseView, AppError> {
        request.validate_at(Utc::now().naive_utc())?;

        let course = Course::new(request.name, request.description, request.start_date, request.end_date);
        let saved = self.courses.save(&course).await.map_err(repository_error)?;

        tracing::info!(course_id = ?saved.id, name = %saved.name, "Created course");
        self.to_view(saved).await
    }

    /// All courses with their enrolled students
    pub async fn list_courses(&self) -> Result<Vec<CourseView>, AppError> {
        let courses = self.courses.find_all().await.map_err(repository_error)?;

        let mut views = Vec::with_capacity(courses.len());
        for course in courses {
            views.push(self.to_view(course).await?);
        }
        Ok(views)
    }

    /// Enroll a student. Enrolling twice is a no-op.
    pub async fn register_to_course(&self, user_id: i64, course_id: i64) -> Result<(), AppError> {
        self.find_account(user_id).await?;
        let mut course = self.find_course(course_id).await?;

        if !course.add_student(user_id) {
            tracing::debug!(user_id, course_id, "Student already enrolled");
            return Ok(());
        }

        self.courses.save(&course).await.map_err(repository_error)?;
        tracing::info!(user_id, course_id, "Student enrolled");
        Ok(())
    }

    /// Withdraw a student. Withdrawing when not enrolled is a no-op.
    pub async fn cancel_registration(&self, user_id: i64, course_id: i64) -> Result<(), AppError> {
        self.find_account(user_id).await?;
        let mut course = self.find_course(course_id).await?;

        if !course.remove_student(user_id) {
            tracing::debug!(user_id, course_id, "Student was not enrolled");
            return Ok(());
        }

        self.courses.save(&course).await.map_err(repository_error)?;
        tracing::info!(user_id, course_id, "Student withdrawn");
        Ok(())
    }

    /// The student's courses ordered by start date
    pub async fn schedule_for(&self, user_id: i64) -> Result<Vec<Course>, AppError> {
        self.find_account(user_id).await?;

        let mut courses = self
            .courses
            .find_all_by_student_id(user_id)
            .await
            .map_err(repository_error)?;
        courses.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.name.cmp(&b.name)));
        Ok(courses)
    }

    async fn find_account(&self, user_id: i64) -> Result<Account, AppError> {
        self.accounts
            .find_by_id(user_id)
            .await
            .map_err(repository_error)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn find_course(&self, course_id: i64) -> Result<Course, AppError> {
        self.courses
            .find_by_id(course_id)
            .await
            .map_err(repository_error)?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))
    }

    async fn to_view(&self, course: Course) -> Result<CourseView, AppError> {
        let mut students = Vec::with_capacity(course.student_ids.len());
        for id in &course.student_ids {
            match self.accounts.find_by_id(*id).await.map_err(repository_error)? {
                Some(account) => students.push(account.profile()),
                None => tracing::warn!(student_id = id, course_id = ?course.id, "Enrolled student has no account"),
            }
        }

        Ok(CourseView {
            id: course.id,
            name: course.name,
            description: course.description,
            start_date: course.start_date,
            end_date: course.end_date,
            students,
        })
    }
}

fn repository_error(e: anyhow::Error) -> AppError {
    AppError::Repository(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_ROLE;
    use crate::repository::{InMemoryAccountRepository, InMemoryCourseRepository};
    use chrono::Duration;

    type Service = CourseService<InMemoryAccountRepository, InMemoryCourseRepository>;

    async fn setup() -> (Service, i64) {
        let accounts = Arc::new(InMemoryAccountRepository::new());
        let student = accounts
            .save(&Account {
                id: None,
                username: "testuser".to_string(),
                email: "test@example.com".to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                password_hash: "hash".to_string(),
                date_of_birth: None,
                phone_number: None,
                address: None,
                roles: vec![DEFAULT_ROLE.to_string()],
                created_at: None,
            })
            .await
            .unwrap();

        let service = CourseService::new(accounts, Arc::new(InMemoryCourseRepository::new()));
        (service, student.id.unwrap())
    }

    fn request(name: &str, starts_in_days: i64) -> CreateCourseRequest {
        let now = Utc::now().naive_utc();
        CreateCourseRequest {
            name: name.to_string(),
            description: format!("{name} fundamentals"),
            start_date: now + Duration::days(starts_in_days),
            end_date: now + Duration::days(starts_in_days + 30),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (service, _) = setup().await;

        let created = service.create_course(request("Rust", 1)).await.unwrap();
        assert!(created.id.is_some());
        assert!(created.students.is_empty());

        let courses = service.list_courses().await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].name, "Rust");
    }

    #[tokio::test]
    async fn test_create_rejects_past_start() {
        let (service, _) = setup().await;

        let result = service.create_course(request("History", -2)).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_and_cancel() {
        let (service, student_id) = setup().await;
        let course_id = service.create_course(request("Rust", 1)).await.unwrap().id.unwrap();

        service.register_to_course(student_id, course_id).await.unwrap();
        service.register_to_course(student_id, course_id).await.unwrap();

        let courses = service.list_courses().await.unwrap();
        assert_eq!(courses[0].students.len(), 1);
        assert_eq!(courses[0].students[0].username, "testuser");

        service.cancel_registration(student_id, course_id).await.unwrap();
        let courses = service.list_courses().await.unwrap();
        assert!(courses[0].students.is_empty());
    }

    #[tokio::test]
    async fn test_register_unknown_user_or_course() {
        let (service, student_id) = setup().await;
        let course_id = service.create_course(request("Rust", 1)).await.unwrap().id.unwrap();

        match service.register_to_course(999, course_id).await {
            Err(AppError::NotFound(message)) => assert_eq!(message, "User not found"),
            other => panic!("expected not found, got {other:?}"),
        }
        match service.register_to_course(student_id, 999).await {
            Err(AppError::NotFound(message)) => assert_eq!(message, "Course not found"),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_schedule_is_ordered_by_start_date() {
        let (service, student_id) = setup().await;
        let later = service.create_course(request("Compilers", 20)).await.unwrap().id.unwrap();
        let sooner = service.create_course(request("Algorithms", 2)).await.unwrap().id.unwrap();
        service.create_course(request("Networks", 5)).await.unwrap();

        service.register_to_course(student_id, later).await.unwrap();
        service.register_to_course(student_id, sooner).await.unwrap();

        let schedule = service.schedule_for(student_id).await.unwrap();
        let names: Vec<&str> = schedule.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Algorithms", "Compilers"]);
    }
}
