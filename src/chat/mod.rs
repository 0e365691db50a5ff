pub mod session;

pub use session::{ChatScope, ChatSession};
