//! Support for memory-mapped registers of various sizes.

use core::cell::UnsafeCell;
use core::ptr;

/// A register whose contents can be represented as `T`.  The contents are
/// accessed using `volatile` operations only, ensuring that apparently dead
/// loads and stores are not optimized away.
///
/// Memory-mapped registers are the ultimate ambient authority, and are
/// inherently shared.  Thus, registers (like cells) can be mutated through a
/// shared reference `&`.  Transitively, the same applies to structs that group
/// registers together, as in a memory-mapped peripheral.
///
/// A `Reg` is also just memory, which is how the host-side tests stand in for
/// a peripheral: they allocate a register block and point a driver at it.
#[repr(transparent)]
pub struct Reg<T> {
    value: UnsafeCell<T>,
}

impl<T: Copy> Reg<T> {
    /// Creates a register cell holding `value`.  Real registers are never
    /// constructed; they are reached through a fixed address.
    pub const fn new(value: T) -> Self {
        Reg { value: UnsafeCell::new(value) }
    }

    /// Reads the contents of the register using a volatile load.
    #[inline]
    pub fn get(&self) -> T {
        unsafe { ptr::read_volatile(self.value.get()) }
    }

    /// Replaces the contents of the register using a volatile store.
    #[inline]
    pub fn set(&self, value: T) {
        unsafe { ptr::write_volatile(self.value.get(), value) }
    }

    #[inline]
    pub fn update<F: FnOnce(T) -> T>(&self, f: F) {
        self.set(f(self.get()))
    }
}

/// Generates `read_*`, `write_*` and `update_*` methods for a register that
/// holds a `bit_wrappers!` type.  The surrounding `impl` must provide
/// `fn reg(&self) -> &Registers`.
macro_rules! reg_accessors {
    ($name:ident, $ty:ident, $read:ident, $write:ident, $update:ident) => {
        pub fn $read(&self) -> $ty {
            $ty(self.reg().$name.get())
        }

        pub fn $write(&self, v: $ty) {
            self.reg().$name.set(v.0)
        }

        pub fn $update<F: FnOnce($ty) -> $ty>(&self, f: F) {
            self.$write(f(self.$read()))
        }
    };
}

pub(crate) use reg_accessors;
