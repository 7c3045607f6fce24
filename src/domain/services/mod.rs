pub mod download_token;
pub mod entitlement;
