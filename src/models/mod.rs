pub mod chat;
pub mod maintenance;
pub mod tire;
pub mod user;

pub use chat::*;
pub use maintenance::*;
pub use tire::*;
pub use user::*;
