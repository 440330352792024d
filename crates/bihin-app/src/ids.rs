// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(CategoryId);
entity_id!(LocationId);
entity_id!(EquipmentId);

#[cfg(test)]
mod tests {
    use super::{CategoryId, EquipmentId};

    #[test]
    fn ids_serialize_as_bare_integers() {
        let json = serde_json::to_string(&EquipmentId::new(42)).expect("serialize id");
        assert_eq!(json, "42");

        let parsed: CategoryId = serde_json::from_str("7").expect("deserialize id");
        assert_eq!(parsed.get(), 7);
        assert_eq!(parsed.to_string(), "7");
    }
}
