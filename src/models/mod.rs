pub mod user;
pub mod post;
pub mod tag;
pub mod comment;

pub use self::{
  user::*,
  post::*,
  tag::*,
  comment::*,
};
