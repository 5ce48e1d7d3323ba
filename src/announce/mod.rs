pub mod announcer;
pub mod template;

pub use announcer::{Announcer, BatchOutcome};
pub use template::AnnounceTemplate;
