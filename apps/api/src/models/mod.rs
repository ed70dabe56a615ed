pub mod ai_config;
pub mod template;
pub mod user;
pub mod vibecode;
pub mod website;
