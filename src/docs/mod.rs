use utoipa::OpenApi;

use crate::app::controller::{ApiControllerApi, SiteControllerApi, UserControllerApi};
use crate::app::integrations::{GithubControllerApi, S3ControllerApi};

#[derive(OpenApi)]
#[openapi(info(title = "goodtables.io", description = "Tabular data validation as a service"))]
pub struct MainApiDoc;

/// OpenAPI document covering every route group.
pub fn api_doc() -> utoipa::openapi::OpenApi {
    let mut doc = MainApiDoc::openapi();
    doc.merge(ApiControllerApi::openapi());
    doc.merge(SiteControllerApi::openapi());
    doc.merge(UserControllerApi::openapi());
    doc.merge(GithubControllerApi::openapi());
    doc.merge(S3ControllerApi::openapi());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_prefixed_paths() {
        let doc = api_doc();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        assert!(paths.iter().any(|p| p.as_str() == "/api/job"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/job/{job_id}"));
        assert!(paths.iter().any(|p| p.as_str() == "/github/hook"));
        assert!(paths.iter().any(|p| p.as_str() == "/s3/hook"));
    }
}
