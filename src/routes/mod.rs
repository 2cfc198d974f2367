pub mod admin;
pub mod auth;
pub mod auth_otp_routes;
pub mod certificates;
pub mod courses;
pub mod tickets;
pub mod updates;
pub mod user_profile;
