//! Conversions between Rust types and packed register fields.
//!
//! Registers on the ADuCM302x mix single-bit enables, key fields and status
//! flags in one word.  The macros here generate typed getters and builders
//! for those fields so that driver code reads like
//! `r.with_bnk1en(true).with_bnk2en(false)` instead of shifting by hand.

#![macro_use]

/// Construct `Self` from a field for which every bit pattern is meaningful.
pub trait FromBitsTotal {
    fn from_bits_total(bits: u32) -> Self;
}

impl FromBitsTotal for bool {
    fn from_bits_total(bits: u32) -> Self {
        bits != 0
    }
}

impl FromBitsTotal for u32 {
    fn from_bits_total(bits: u32) -> Self {
        bits
    }
}

/// Converts `self` into the bits stored in a register field.
pub trait IntoBits {
    fn into_bits(self) -> u32;
}

impl IntoBits for bool {
    fn into_bits(self) -> u32 {
        u32::from(self)
    }
}

impl IntoBits for u32 {
    fn into_bits(self) -> u32 {
        self
    }
}

/// Associates a typed register value with its raw representation.
pub trait BitsWrapper {
    /// Underlying bitwise type (usually `u32`).
    type Raw;

    fn from_raw(v: Self::Raw) -> Self;
}

#[inline(always)]
fn field_mask(hi: usize, lo: usize) -> u32 {
    let width = hi - lo + 1;
    if width < 32 {
        (1 << width) - 1
    } else {
        !0
    }
}

/// Given a value `v`, extracts bits `hi` through `lo` (inclusive).
#[inline(always)]
pub fn bitfield_extract(v: u32, hi: usize, lo: usize) -> u32 {
    (v >> lo) & field_mask(hi, lo)
}

/// Given a value `orig`, replaces bits `hi` through `lo` (inclusive) with the
/// same number of low-order bits from `new`.
#[inline(always)]
pub fn bitfield_replace(orig: u32, hi: usize, lo: usize, new: u32) -> u32 {
    let mask = field_mask(hi, lo);
    (orig & !(mask << lo)) | ((new & mask) << lo)
}

/// Declares typed register values.  A declaration looks like a newtype
/// around an integer:
///
/// ```ignore
/// bit_wrappers! {
///     pub struct Sramret(pub u32);
/// }
/// ```
///
/// The generated type derives `Copy`, `Clone`, `Debug`, `Eq`, `PartialEq`
/// and implements `BitsWrapper`.
macro_rules! bit_wrappers {
    () => {};
    ($(#[$m:meta])* pub struct $name:ident(pub $ty:ty); $($rest:tt)*) => {
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        $(#[$m])*
        pub struct $name(pub $ty);

        impl $crate::bits::BitsWrapper for $name {
            type Raw = $ty;

            fn from_raw(v: Self::Raw) -> Self {
                $name(v)
            }
        }

        bit_wrappers!{$($rest)*}
    };
}

/// Declares accessors for packed bitfields inside an `impl` block for a
/// `BitsWrapper` type.
///
/// ```ignore
/// pub total [31] get_instren / with_instren: bool,
/// pub total [29:7] get_tbloff / with_tbloff: u32,
/// ```
///
/// Every field declared this way is `total`: each bit pattern it can hold
/// means something, so getters return `T` directly.
macro_rules! bitfield_accessors {
    () => {};

    (
        $(#[$m:meta])*
        pub total [$bit:tt] $get:ident / $with:ident : $ty:ty,
        $($rest:tt)*
    ) => {
        bitfield_accessors! {
            @_impl
            $(#[$m])*
            [$bit : $bit] $get / $with : $ty
        }

        bitfield_accessors!{ $($rest)* }
    };

    (
        $(#[$m:meta])*
        pub total [$hi:tt : $lo:tt] $get:ident / $with:ident : $ty:ty,
        $($rest:tt)*
    ) => {
        bitfield_accessors! {
            @_impl
            $(#[$m])*
            [$hi : $lo] $get / $with : $ty
        }

        bitfield_accessors!{ $($rest)* }
    };

    (
        @_impl
        $(#[$m:meta])*
        [$hi:tt : $lo:tt]
        $get:ident / $with:ident : $ty:ty
    ) => {
        $(#[$m])*
        #[inline]
        pub fn $get(self) -> $ty {
            <$ty as $crate::bits::FromBitsTotal>::from_bits_total(
                $crate::bits::bitfield_extract(self.0, $hi, $lo))
        }

        $(#[$m])*
        #[inline]
        pub fn $with(self, v: $ty) -> Self {
            $crate::bits::BitsWrapper::from_raw(
                $crate::bits::bitfield_replace(
                    self.0, $hi, $lo,
                    <$ty as $crate::bits::IntoBits>::into_bits(v)))
        }
    };
}
