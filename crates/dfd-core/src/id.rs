use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for element and flow IDs.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Reserved parent ID for elements that sit on the top-level diagram.
pub const ROOT: &str = "root";

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string as an ID, or return the existing one.
            pub fn intern(s: &str) -> Self {
                Self(INTERNER.get_or_intern(s))
            }

            /// The ID for `s` if it was interned before. Unknown strings are
            /// not added to the interner.
            pub fn try_existing(s: &str) -> Option<Self> {
                INTERNER.get(s).map(Self)
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(Self::intern(&s))
            }
        }
    };
}

interned_id! {
    /// Identifier of a diagram element (`p1`, `e3`, `s2`) or the `root` sentinel.
    /// Internally a `Spur` index: 4 bytes, `Copy`, O(1) comparison.
    ElementId
}

interned_id! {
    /// Identifier of a data flow (`flow7`).
    FlowId
}

impl ElementId {
    /// The sentinel parent of top-level elements.
    pub fn root() -> Self {
        Self::intern(ROOT)
    }

    pub fn is_root(&self) -> bool {
        self.as_str() == ROOT
    }
}

/// Split an ID of the form `<tag><counter>` into its tag character and
/// numeric suffix. Leading digits after the tag are read; anything after
/// them is ignored (`p12a` → `('p', 12)`). Returns `None` when the tag is not
/// followed by at least one digit.
pub fn split_counter(id: &str) -> Option<(char, u32)> {
    let mut chars = id.chars();
    let tag = chars.next()?;
    let rest = chars.as_str();
    let digits_end = rest
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(rest.len(), |(i, _)| i);
    if digits_end == 0 {
        return None;
    }
    rest[..digits_end].parse().ok().map(|n| (tag, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = ElementId::intern("p1");
        let b = ElementId::intern("p1");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "p1");
        assert_eq!(a.to_string(), "p1");
    }

    #[test]
    fn lookup_does_not_intern() {
        assert_eq!(ElementId::try_existing("never-interned-element"), None);
        assert_eq!(ElementId::try_existing("never-interned-element"), None);

        let p = ElementId::intern("p4242");
        assert_eq!(ElementId::try_existing("p4242"), Some(p));
        assert_eq!(FlowId::try_existing("never-interned-flow"), None);
    }

    #[test]
    fn root_sentinel() {
        assert!(ElementId::root().is_root());
        assert!(!ElementId::intern("p1").is_root());
    }

    #[test]
    fn split_counter_reads_tag_and_suffix() {
        assert_eq!(split_counter("p7"), Some(('p', 7)));
        assert_eq!(split_counter("s12"), Some(('s', 12)));
        assert_eq!(split_counter("e3x"), Some(('e', 3)));
        assert_eq!(split_counter("flow"), None);
        assert_eq!(split_counter("p"), None);
        assert_eq!(split_counter(""), None);
    }
}
