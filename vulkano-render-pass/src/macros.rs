// Copyright (c) 2025 The vulkano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

/// Declares a set of flags backed by one of Ash's flag types.
///
/// Only the listed flags can be represented. Bits of the Ash value that name no listed flag are
/// dropped when converting.
macro_rules! vulkan_bitflags {
    {
        $(#[doc = $ty_doc:literal])*
        $ty:ident
        $( impl { $($impls:item)* } )?
        = $ty_ffi:ident($repr:ty);

        $(
            $(#[doc = $flag_doc:literal])*
            $flag_name:ident = $flag_name_ffi:ident,
        )+
    } => {
        $(#[doc = $ty_doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $ty($repr);

        impl $ty {
            $(
                $(#[doc = $flag_doc])*
                pub const $flag_name: Self = Self(ash::vk::$ty_ffi::$flag_name_ffi.as_raw());
            )*

            /// The name of every flag, in declaration order.
            const NAMED: &'static [(&'static str, $ty)] = &[
                $((stringify!($flag_name), Self::$flag_name),)*
            ];

            const ALL_BITS: $repr = 0 $(| ash::vk::$ty_ffi::$flag_name_ffi.as_raw())*;

            /// Returns the set with no flags.
            #[inline]
            pub const fn empty() -> Self {
                Self(0)
            }

            /// Returns the set with every flag.
            #[inline]
            pub const fn all() -> Self {
                Self(Self::ALL_BITS)
            }

            /// Returns how many flags are set.
            #[inline]
            pub const fn count(self) -> u32 {
                self.0.count_ones()
            }

            #[inline]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Returns whether `self` and `other` have at least one flag in common.
            #[inline]
            pub const fn intersects(self, other: Self) -> bool {
                (self.0 & other.0) != 0
            }

            /// Returns whether every flag of `other` is also in `self`.
            #[inline]
            pub const fn contains(self, other: Self) -> bool {
                (self.0 & other.0) == other.0
            }

            #[inline]
            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            #[inline]
            pub const fn intersection(self, other: Self) -> Self {
                Self(self.0 & other.0)
            }

            /// Returns the flags of `self` that are not in `other`.
            #[inline]
            pub const fn difference(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }

            /// Returns the known flags that are not in `self`.
            #[inline]
            pub const fn complement(self) -> Self {
                Self(Self::ALL_BITS & !self.0)
            }

            /// Iterates over the flags of `self` one at a time, lowest bit first.
            #[allow(dead_code)]
            #[inline]
            pub fn iter(self) -> impl Iterator<Item = Self> {
                let mut remaining = self.0;

                std::iter::from_fn(move || {
                    (remaining != 0).then(|| {
                        let lowest = remaining & remaining.wrapping_neg();
                        remaining ^= lowest;

                        Self(lowest)
                    })
                })
            }

            $( $($impls)* )?
        }

        impl Default for $ty {
            #[inline]
            fn default() -> Self {
                Self::empty()
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut names = Self::NAMED
                    .iter()
                    .filter(|(_, flag)| self.intersects(*flag))
                    .map(|(name, _)| *name);

                match names.next() {
                    None => f.write_str("empty()"),
                    Some(first) => {
                        f.write_str(first)?;
                        names.try_for_each(|name| write!(f, " | {}", name))
                    }
                }
            }
        }

        impl From<$ty> for ash::vk::$ty_ffi {
            #[inline]
            fn from(val: $ty) -> Self {
                Self::from_raw(val.0)
            }
        }

        impl From<ash::vk::$ty_ffi> for $ty {
            #[inline]
            fn from(val: ash::vk::$ty_ffi) -> Self {
                Self(val.as_raw() & Self::ALL_BITS)
            }
        }

        flag_operator!($ty, BitAnd::bitand, BitAndAssign::bitand_assign, intersection);
        flag_operator!($ty, BitOr::bitor, BitOrAssign::bitor_assign, union);
        flag_operator!($ty, Sub::sub, SubAssign::sub_assign, difference);

        impl std::ops::Not for $ty {
            type Output = Self;

            #[inline]
            fn not(self) -> Self {
                self.complement()
            }
        }
    };
}

/// Implements a binary operator and its assigning form on a flag type, in terms of one of its
/// set operations.
macro_rules! flag_operator {
    ($ty:ident, $op:ident::$op_fn:ident, $assign:ident::$assign_fn:ident, $set_fn:ident) => {
        impl std::ops::$op for $ty {
            type Output = Self;

            #[inline]
            fn $op_fn(self, rhs: Self) -> Self {
                self.$set_fn(rhs)
            }
        }

        impl std::ops::$assign for $ty {
            #[inline]
            fn $assign_fn(&mut self, rhs: Self) {
                *self = self.$set_fn(rhs);
            }
        }
    };
}

/// Declares a fieldless enum whose variants are a subset of one of Ash's enum types, with the
/// same raw values.
macro_rules! vulkan_enum {
    {
        $(#[$attr:meta])*
        $ty:ident
        $( impl { $($impls:item)* } )?
        = $ty_ffi:ident($repr:ty);

        $(
            $(#[doc = $variant_doc:literal])*
            $variant:ident = $variant_ffi:ident,
        )+
    } => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr($repr)]
        pub enum $ty {
            $(
                $(#[doc = $variant_doc])*
                $variant = ash::vk::$ty_ffi::$variant_ffi.as_raw(),
            )+
        }

        $(
            impl $ty {
                $($impls)*
            }
        )?

        impl From<$ty> for ash::vk::$ty_ffi {
            #[inline]
            fn from(val: $ty) -> Self {
                Self::from_raw(val as $repr)
            }
        }

        /// Fails for values that have no variant.
        impl TryFrom<ash::vk::$ty_ffi> for $ty {
            type Error = ();

            fn try_from(val: ash::vk::$ty_ffi) -> Result<Self, ()> {
                [$($ty::$variant),+]
                    .into_iter()
                    .find(|variant| *variant as $repr == val.as_raw())
                    .ok_or(())
            }
        }
    };
}
