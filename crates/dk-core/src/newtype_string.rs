//! Macro for non-empty string newtypes.

/// Define a newtype over a `String` that is never empty.
///
/// The derived `Ord` compares the underlying bytes. Deserializing an empty
/// string is an error, so values read back from reports keep the invariant.
macro_rules! define_newtype_string {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        #[serde(transparent)]
        $vis struct $Name(String);

        impl<'de> serde::Deserialize<'de> for $Name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                $Name::try_new(raw).ok_or_else(|| {
                    serde::de::Error::custom(concat!(stringify!($Name), " cannot be empty"))
                })
            }
        }

        impl $Name {
            /// Wrap `name`. Panics if it is empty; use [`try_new`](Self::try_new)
            /// for names read from disk or a store.
            pub fn new(name: impl Into<String>) -> Self {
                let name = name.into();
                assert!(!name.is_empty(), concat!(stringify!($Name), " cannot be empty"));
                Self(name)
            }

            /// `None` for an empty name
            pub fn try_new(name: impl Into<String>) -> Option<Self> {
                let name = name.into();
                (!name.is_empty()).then_some(Self(name))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::ops::Deref for $Name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $Name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

pub(crate) use define_newtype_string;
