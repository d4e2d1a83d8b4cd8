pub mod util;

mod user;
pub mod post;
pub mod tag;
mod comment;
pub use self::{
  user::*,
  post::PostService,
  tag::TagService,
  comment::*,
};

mod service;
pub use service::*;
