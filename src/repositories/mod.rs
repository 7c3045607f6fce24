pub mod artifact_filesystem_repository;
pub mod authentication_jwt_repository;
pub mod job_postgres_repository;
pub mod usage_postgres_repository;
