pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;
pub mod web;

pub use domain::entities;
pub use domain::errors;
