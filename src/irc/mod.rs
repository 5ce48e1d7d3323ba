pub mod machine;
pub mod message;
pub mod sender;
pub mod session;
pub mod transport;

pub use machine::{SessionMachine, SessionState, Step};
pub use message::{Command, Inbound};
pub use sender::LineSender;
pub use session::Session;
pub use transport::{Connection, Connector, LineReader, LineWriter, TcpConnector};
