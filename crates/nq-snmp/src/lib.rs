pub mod client;
pub mod error;
pub mod mock;
pub mod pool;
pub mod session;
pub mod snmp2_session;
pub mod types;

pub use client::{DeviceClient, WalkMode, Walker};
pub use error::{DeviceError, DeviceResult, TransportError};
pub use mock::{MockAgent, MockConnector};
pub use pool::{PooledSession, SessionPool};
pub use session::{SessionFactory, SnmpSession};
pub use snmp2_session::Snmp2Connector;
pub use types::{ClientConfig, PduRequest, SessionBinding, SnmpVersion};
