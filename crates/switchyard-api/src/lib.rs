// switchyard-api: Southbound protocol clients for industrial switch fleets

pub mod error;
pub mod protocol;
pub mod restful;
pub mod southbound;
pub mod transport;

pub use error::Error;
pub use protocol::Protocol;
pub use restful::{RestfulClient, RestfulConfig};
pub use southbound::{ActionCall, SouthboundClient, Target};
pub use transport::{TlsMode, TransportConfig};
