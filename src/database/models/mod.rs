pub mod channel;
pub mod chat;
pub mod member;
pub mod team;

pub use channel::Channel;
pub use chat::Chat;
pub use member::{Member, MemberRole};
pub use team::Team;
