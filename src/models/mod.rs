pub mod certificate;
pub mod course;
pub mod otp;
pub mod ticket;
pub mod update;
pub mod user;
