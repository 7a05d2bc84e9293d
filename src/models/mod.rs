mod notification;
mod package;
mod return_request;
mod user;

pub use notification::*;
pub use package::*;
pub use return_request::*;
pub use user::*;
