//! The two datagrams exchanged during discovery.
//!
//! | Direction                  | Message             | Fields                                   |
//! |----------------------------|---------------------|------------------------------------------|
//! | broadcaster → coordinator  | [`Announcement`]    | device-id: string, type: u32, name: string |
//! | coordinator → broadcaster  | [`RendezvousOffer`] | rendezvous-uri: string                   |
//!
//! Both are encoded as [`Caps`](super::caps::Caps) payloads.  Decoders accept
//! extra trailing fields so that a newer peer can append information without
//! breaking older ones.

use thiserror::Error;

use crate::domain::device::{DeviceId, DeviceInfo};
use crate::protocol::caps::{Caps, CapsError};

/// Errors that can occur while encoding or decoding a protocol message.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The datagram is not a valid caps payload.
    #[error("received data invalid: not caps format: {0}")]
    NotCaps(#[source] CapsError),

    /// A required field is missing or has the wrong type.
    #[error("received data invalid: {field}: {source}")]
    BadField {
        field: &'static str,
        #[source]
        source: CapsError,
    },

    /// The message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[source] CapsError),
}

/// Identity announcement broadcast by a joining device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Unique id the device chose for itself.
    pub device_id: DeviceId,
    /// Static attributes of the device.
    pub info: DeviceInfo,
}

impl Announcement {
    /// Creates an announcement for `device_id`.
    pub fn new(device_id: impl Into<DeviceId>, info: DeviceInfo) -> Self {
        Self {
            device_id: device_id.into(),
            info,
        }
    }

    /// Encodes the announcement as `[device-id, device-type, device-name]`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if a field is too large for the wire.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut caps = Caps::new();
        caps.write_string(self.device_id.as_str())
            .write_u32(self.info.device_type)
            .write_string(self.info.name.as_str());
        caps.serialize().map_err(ProtocolError::Encode)
    }

    /// Decodes an announcement datagram.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the bytes are not caps or a field is
    /// missing or mistyped.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let caps = Caps::parse(bytes).map_err(ProtocolError::NotCaps)?;
        let mut reader = caps.reader();
        let device_id = reader.read_string().map_err(bad_field("no device id"))?;
        let device_type = reader.read_u32().map_err(bad_field("no device type"))?;
        let name = reader.read_string().map_err(bad_field("no device name"))?;
        Ok(Self {
            device_id: device_id.to_owned(),
            info: DeviceInfo::new(device_type, name),
        })
    }
}

/// Offer of the rendezvous URI sent back to a candidate device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendezvousOffer {
    /// URI of the long-lived messaging channel.
    pub uri: String,
}

impl RendezvousOffer {
    /// Creates an offer for `uri`.
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    /// Encodes the offer as `[rendezvous-uri]`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if the URI is too large for the wire.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut caps = Caps::new();
        caps.write_string(self.uri.as_str());
        caps.serialize().map_err(ProtocolError::Encode)
    }

    /// Decodes an offer datagram.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the bytes are not caps or carry no URI.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let caps = Caps::parse(bytes).map_err(ProtocolError::NotCaps)?;
        let uri = caps.reader().read_string().map_err(bad_field("no uri"))?;
        Ok(Self::new(uri))
    }

    /// Returns the URI the device should connect to: the offered URI with
    /// `#<device_id>` appended as fragment.
    ///
    /// ```rust
    /// use autonet_core::RendezvousOffer;
    ///
    /// let offer = RendezvousOffer::new("flora://svc");
    /// assert_eq!(offer.device_uri("dev1"), "flora://svc#dev1");
    /// ```
    pub fn device_uri(&self, device_id: &str) -> String {
        let mut uri = String::with_capacity(self.uri.len() + 1 + device_id.len());
        uri.push_str(&self.uri);
        uri.push('#');
        uri.push_str(device_id);
        uri
    }
}

fn bad_field(field: &'static str) -> impl Fn(CapsError) -> ProtocolError {
    move |source| ProtocolError::BadField { field, source }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
