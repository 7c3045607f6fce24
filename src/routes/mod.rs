pub mod download;
pub mod get_job;
pub mod health_check;
pub mod job_summary;
pub mod my_jobs;
pub mod submit_jobs;
pub mod track_usage;

pub use download::*;
pub use get_job::*;
pub use health_check::*;
pub use job_summary::*;
pub use my_jobs::*;
pub use submit_jobs::*;
pub use track_usage::*;

use actix_web::{http, HttpRequest};

/// Best-effort client metadata (user agent, ip) attached to usage records.
pub(crate) fn client_metadata(request: &HttpRequest) -> (Option<String>, Option<String>) {
    let user_agent = request
        .headers()
        .get(http::header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.to_string());

    let ip_address = request
        .connection_info()
        .realip_remote_addr()
        .map(|ip| ip.to_string());

    (user_agent, ip_address)
}
