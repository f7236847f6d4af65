//! Opaque identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declare a string-backed identifier with the usual conversions.
macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(
    /// A flight, e.g. `"PS-101"`.
    FlightId
);

opaque_id!(
    /// An aircraft, as registered with air traffic.
    AircraftId
);

opaque_id!(
    /// A passenger as known to airport security.
    PassengerId
);

opaque_id!(
    /// An IATA airport code, e.g. `"HRK"`.
    AirportCode
);
