// handlers/protected/mod.rs - endpoints behind jwt_auth_middleware
//
// Every handler receives the caller as `Extension<AuthUser>` and passes its
// id down so services only ever touch that user's rows.

pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod invoices;
pub mod profile;
pub mod projects;
pub mod tasks;
pub mod time_entries;
