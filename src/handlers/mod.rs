pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod auth_otp;
pub(crate) mod certificates;
pub(crate) mod courses;
pub(crate) mod tickets;
pub(crate) mod updates;
pub(crate) mod upload;
pub(crate) mod user_profile;
