pub mod jwt;
pub mod pass;

pub use self::jwt::AuthData;
