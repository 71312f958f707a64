//! Published identity profile (schema.org `Person`).

use serde::{Deserialize, Serialize};

use crate::storage::ContentHash;

/// Avatar reference inside a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageObject {
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
    #[serde(rename = "contentURL")]
    pub content_url: String,
}

impl ImageObject {
    pub fn avatar(image: &ContentHash) -> Self {
        Self {
            kind: "ImageObject".to_string(),
            name: "avatar".to_string(),
            content_url: format!("/ipfs/{image}"),
        }
    }
}

/// Profile document stored in the content store and linked from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
    /// MNID of the identity contract.
    pub address: String,
    /// Hex SEC1 public key of the controlling account.
    #[serde(rename = "publicKey", default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageObject>,
}

impl Profile {
    pub fn person(name: impl Into<String>, mnid: String, network: impl Into<String>) -> Self {
        Self {
            context: "http://schema.org".to_string(),
            kind: "Person".to_string(),
            name: name.into(),
            address: mnid,
            public_key: None,
            network: network.into(),
            image: None,
        }
    }

    pub fn with_public_key(mut self, public_key: String) -> Self {
        self.public_key = Some(public_key);
        self
    }

    pub fn with_avatar(mut self, image: &ContentHash) -> Self {
        self.image = Some(ImageObject::avatar(image));
        self
    }
}
