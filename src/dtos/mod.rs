pub mod auth_dtos;
pub mod profile_dtos;
