//! HTTP controllers and routes.

pub mod decision;
pub mod sys;
