//! Typed bus destination for one player instance
//!
//! Layered setups run several players side by side; each one registers its own
//! bus name. The name is resolved once when the destination is created.

use std::fmt;

/// Control bus destination of a player instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    layer: Option<u32>,
    bus_name: String,
}

impl Destination {
    /// Bus name used by a player started without a layer
    pub const DEFAULT_BUS_NAME: &'static str = "org.mpris.MediaPlayer2.omxplayer";

    /// Resolve the destination for an optional layer (layer 0 counts as none)
    pub fn new(layer: Option<u32>) -> Self {
        let layer = layer.filter(|l| *l > 0);
        let bus_name = match layer {
            Some(layer) => format!("{}_layer{}", Self::DEFAULT_BUS_NAME, layer),
            None => Self::DEFAULT_BUS_NAME.to_string(),
        };
        Self { layer, bus_name }
    }

    /// Explicitly configured layer, if any
    pub fn configured_layer(&self) -> Option<u32> {
        self.layer
    }

    /// Layer number reported to the host (1 when unlayered)
    pub fn layer(&self) -> u32 {
        self.layer.unwrap_or(1)
    }

    /// Resolved bus name
    pub fn bus_name(&self) -> &str {
        &self.bus_name
    }
}

impl Default for Destination {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.bus_name)
    }
}
