pub mod protocol;
pub mod items;
pub mod skills;
pub mod spells;

pub use protocol::*;
pub use items::*;
pub use skills::*;
pub use spells::*;
