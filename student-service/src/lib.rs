//! Student Service
//!
//! Student accounts, authentication and course enrollment behind session
//! tokens. Exposed as in-process calls through [`ServiceRouter`].

pub mod authentication;
pub mod config;
pub mod course;
pub mod identity;
pub mod models;
pub mod password;
pub mod repository;
pub mod router;

pub use authentication::AuthenticationService;
pub use config::StudentServiceConfig;
pub use course::CourseService;
pub use identity::AccountIdentityResolver;
pub use models::{
    Account, AuthenticationResponse, Course, CourseView, CreateCourseRequest, LoginRequest,
    RegisterRequest, StudentProfile,
};
pub use password::{Argon2PasswordEncoder, PasswordEncoder};
pub use repository::{
    AccountRepository, CourseRepository, InMemoryAccountRepository, InMemoryCourseRepository,
    RepositoryError,
};
pub use router::ServiceRouter;
