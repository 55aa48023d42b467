//! Helper macro to create a newtype over a primitive that behaves like an open enum:
//! known values get names, but constructing or matching an unrecognized value is not a
//! bug, just a variant nobody gave a name to yet.
#![doc(html_logo_url = "https://scuffle.cloud/favicon.svg")]
#![doc(html_favicon_url = "https://scuffle.cloud/favicon.svg")]

/// Declares a tuple struct wrapping a primitive integer, with named associated
/// constants for the values worth naming.
///
/// Unlike a `#[repr(u8)] enum`, constructing the type from an unrecognized value never
/// fails: `MyType(7)` is always valid, it just doesn't match any of the named consts.
/// This matters for wire formats where unknown values must be preserved and re-emitted
/// rather than rejected.
///
/// ```
/// nutype_enum::nutype_enum! {
///     pub enum Format(u8) {
///         Zero = 0,
///         One = 1,
///     }
/// }
///
/// assert_eq!(Format::Zero.0, 0);
/// assert_eq!(Format(5).0, 5);
/// assert!(matches!(Format(1), Format::One));
/// ```
#[macro_export]
macro_rules! nutype_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident($repr:ty) {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis struct $name(pub $repr);

        #[allow(non_upper_case_globals)]
        impl $name {
            $(
                $(#[$variant_meta])*
                pub const $variant: $name = $name($value);
            )*
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #[allow(unreachable_patterns)]
                match *self {
                    $(
                        $name::$variant => write!(f, concat!(stringify!($name), "::", stringify!($variant))),
                    )*
                    $name(value) => write!(f, concat!(stringify!($name), "({:?})"), value),
                }
            }
        }

        impl ::std::convert::From<$repr> for $name {
            fn from(value: $repr) -> Self {
                $name(value)
            }
        }

        impl ::std::convert::From<$name> for $repr {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}
