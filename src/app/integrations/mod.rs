mod github;
mod s3;

pub use github::{GithubController, GithubControllerApi, GithubWebhook};
pub use s3::{S3Controller, S3ControllerApi};
