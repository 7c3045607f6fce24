pub mod artifact_repository;
pub mod image_transformer;
pub mod job_repository;
pub mod usage_recorder;
