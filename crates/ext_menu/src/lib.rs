//! ext_menu - Declarative menu composition
//!
//! Turns the server's function descriptors into a synthetic "Registered"
//! navigation group and mounts it into the statically authored navigation
//! tree. Composition is pure and idempotent: merging into an already merged
//! tree changes nothing, and any failure leaves the static tree as it was.
//!
//! Error codes: 9200-9299

pub mod compose;
pub mod descriptor;
pub mod node;

pub use compose::{
    build_grouped_menu, compose_navigation, menu_items, merge_into_tree, MenuItem, MenuLayout,
};
pub use descriptor::{
    decode_descriptors, DescriptorSource, DisplayName, FunctionDescriptor, HttpDescriptorSource,
    MenuMeta,
};
pub use node::{count_nodes, NavNode};

/// Error codes for menu composition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MenuErrorCode {
    /// Descriptor catalog could not be fetched
    DescriptorFetch = 9200,
    /// Navigation data could not be decoded
    Decode = 9201,
}

#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("[{code}] Descriptor catalog unavailable: {message}")]
    DescriptorFetch { code: u32, message: String },

    #[error("[{code}] Decode error: {message}")]
    Decode { code: u32, message: String },
}

impl MenuError {
    pub fn descriptor_fetch(message: impl Into<String>) -> Self {
        Self::DescriptorFetch {
            code: MenuErrorCode::DescriptorFetch as u32,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            code: MenuErrorCode::Decode as u32,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for MenuError {
    fn from(e: serde_json::Error) -> Self {
        Self::decode(e.to_string())
    }
}
