//! Serde support: every type travels as its text form, so JSON snapshots
//! stay readable and amounts never lose precision in JavaScript tooling.

use crate::{Address, Ed25519PublicKey, Ed25519Signature, Hash, U256};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

macro_rules! serde_as_text {
    ($($name:ty),+ $(,)?) => {
        $(
            impl Serialize for $name {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.collect_str(self)
                }
            }

            impl<'de> Deserialize<'de> for $name {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let text = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
                    text.parse().map_err(de::Error::custom)
                }
            }
        )+
    };
}

serde_as_text!(U256, Address, Hash, Ed25519PublicKey, Ed25519Signature);
