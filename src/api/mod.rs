pub mod admin;
pub mod auth;
pub mod chat;
pub mod google;
pub mod health;
pub mod index;
pub mod maintenance;
pub mod swagger;
pub mod tire;
