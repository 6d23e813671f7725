pub mod bus;
pub mod types;

pub use bus::{CommandBus, CommandReceiver, CommandSender};
pub use types::{Command, GridKind};
