use serde_json::json;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::deserializer::loads_optional;
use crate::error::Result;
use crate::serializer::Serializer;
use crate::transport::{LineTransport, Transport};
use crate::value::{Encodable, Shape, Value};

/// Keyword arguments of a remote method call, in call order.
pub type Kwargs<'a> = [(&'a str, &'a dyn Encodable)];

struct KwargsView<'a>(&'a Kwargs<'a>);

impl Encodable for KwargsView<'_> {
    fn shape(&self) -> Shape<'_> {
        Shape::Dict(self.0.to_vec())
    }
}

/// Reads, writes and calls into a remote object tree by access path.
///
/// The client is connected for its whole lifetime and disconnects when
/// dropped.
pub struct Client<T: Transport = LineTransport> {
    transport: T,
    serializer: Serializer,
}

impl Client<LineTransport> {
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        Self::with_serializer(
            LineTransport::from_config(config),
            Serializer::with_max_depth(config.max_depth),
        )
    }
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Result<Self> {
        Self::with_serializer(transport, Serializer::default())
    }

    pub fn with_serializer(mut transport: T, serializer: Serializer) -> Result<Self> {
        transport.connect()?;
        Ok(Self {
            transport,
            serializer,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn reconnect(&mut self) -> Result<()> {
        self.transport.connect()
    }

    pub fn disconnect(&mut self) -> Result<()> {
        self.transport.disconnect()
    }

    /// Fetches and decodes the value at `full_access_path`.
    pub fn get_value(&mut self, full_access_path: &str) -> Result<Value> {
        debug!(access_path = full_access_path, "get_value");
        let result = self.transport.call("get_value", json!(full_access_path))?;
        loads_optional(result)
    }

    /// Replaces the value at `full_access_path` with `new_value`.
    pub fn set_value(&mut self, full_access_path: &str, new_value: &dyn Encodable) -> Result<Value> {
        debug!(access_path = full_access_path, "update_value");
        let value = self.serializer.serialize_object(new_value, "")?;
        let payload = json!({
            "access_path": full_access_path,
            "value": serde_json::to_value(&value)?,
        });
        let result = self.transport.call("update_value", payload)?;
        loads_optional(result)
    }

    /// Calls the remote method at `full_access_path` and decodes its return
    /// value.
    pub fn trigger_method(
        &mut self,
        full_access_path: &str,
        args: &[&dyn Encodable],
        kwargs: &Kwargs<'_>,
    ) -> Result<Value> {
        debug!(access_path = full_access_path, "trigger_method");
        let args = self.serializer.serialize_object(&args, "")?;
        let kwargs = self.serializer.serialize_object(&KwargsView(kwargs), "")?;
        let payload = json!({
            "access_path": full_access_path,
            "args": serde_json::to_value(&args)?,
            "kwargs": serde_json::to_value(&kwargs)?,
        });
        let result = self.transport.call("trigger_method", payload)?;
        loads_optional(result)
    }
}

impl<T: Transport> Drop for Client<T> {
    fn drop(&mut self) {
        if let Err(e) = self.transport.disconnect() {
            warn!("Failed to disconnect: {}", e);
        }
    }
}
