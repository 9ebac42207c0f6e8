//! Comments module - free-text notes on applications.

mod comments_model;
mod comments_service;

pub use comments_model::{Comment, CommentView, NewComment};
pub use comments_service::CommentService;
