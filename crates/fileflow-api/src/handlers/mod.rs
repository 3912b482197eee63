pub mod activity;
pub mod health;
pub mod jobs;
pub mod push;
pub mod rules;
pub mod upload;
