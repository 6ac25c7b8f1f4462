pub mod client;
pub mod config;
pub mod deserializer;
pub mod error;
pub mod node;
pub mod serializer;
pub mod transport;
pub mod units;
pub mod value;

pub use client::Client;
pub use config::ClientConfig;
pub use deserializer::{decode, loads, loads_optional};
pub use error::{PathwireError, Result};
pub use node::{Payload, WireNode};
pub use serializer::{Serializer, dump, encode};
pub use units::{Quantity, Unit, convert_to_quantity};
pub use value::{Documented, Encodable, EnumMember, Shape, Value};
