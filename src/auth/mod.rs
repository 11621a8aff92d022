pub mod csrf;
pub mod guard;
pub mod jwt;
