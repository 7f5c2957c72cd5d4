//! Row identifiers.
//!
//! Users and notes are both keyed by `SERIAL` columns. Giving each its own
//! type keeps a note id from being passed where an owner id is expected,
//! which every owner-scoped note query relies on.

/// Declare one or more `i32` identifier newtypes.
///
/// Each type serializes as the bare number, displays as the bare number,
/// converts to and from `i32`, and (with the `postgres` feature) binds as
/// an `INTEGER`.
///
/// ```rust
/// # use duenotes_core::define_id;
/// define_id!(ProjectId, TagId);
///
/// let project = ProjectId::new(3);
/// assert_eq!(project.get(), 3);
/// assert_eq!(TagId::from(9).to_string(), "9");
/// ```
#[macro_export]
macro_rules! define_id {
    ($($name:ident),+ $(,)?) => {$(
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type), sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(raw: i32) -> Self {
                Self(raw)
            }

            #[must_use]
            pub const fn get(self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::convert::From<i32> for $name {
            fn from(raw: i32) -> Self {
                Self(raw)
            }
        }

        impl ::core::convert::From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    )+};
}

define_id!(UserId, NoteId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_bare_number() {
        assert_eq!(NoteId::new(42).to_string(), "42");
        assert_eq!(format!("/notes/edit/{}", NoteId::new(5)), "/notes/edit/5");
    }

    #[test]
    fn test_json_is_bare_number() {
        assert_eq!(serde_json::to_string(&UserId::new(7)).unwrap(), "7");

        let parsed: NoteId = serde_json::from_str("13").unwrap();
        assert_eq!(parsed.get(), 13);
    }

    #[test]
    fn test_i32_conversions() {
        let id = UserId::from(5);
        assert_eq!(i32::from(id), 5);
        assert!(UserId::new(1) < UserId::new(2));
    }
}
