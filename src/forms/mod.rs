pub mod user;
pub mod post;
pub mod tag;
pub mod comment;
pub mod admin;

pub use self::user::*;
