pub mod auth;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod i18n;
pub mod mail;
