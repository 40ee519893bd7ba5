pub mod auth;
pub mod client;
pub mod demo;
pub mod drafts;
pub mod fetcher;
pub mod message;
pub mod rules;
