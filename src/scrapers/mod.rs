//! Network access to the elections authority's site.

mod http_client;

pub use http_client::{
    random_user_agent, resolve_user_agent, HttpClient, IMPERSONATE, IMPERSONATE_USER_AGENTS,
};
