//! The complete ADuCM302x vector table, how it gets built, and its optional
//! copy in SRAM.
//!
//! A table is assembled in a `const` initializer:
//!
//! ```ignore
//! #[export_name = "__vector_table"]
//! #[link_section = ".isr_vector"]
//! static VECTORS: VectorTable =
//!     VectorTableBuilder::new(&raw const __STACK_BASE, aducm_reset_vector)
//!         .interrupt(Interrupt::Uart, uart_isr)
//!         .build();
//! ```
//!
//! Every slot starts out bound to its default handler.  A slot may be bound
//! to something else exactly once; a second binding of the same slot fails
//! const evaluation, so the mistake never makes it into an image.

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::mem::{align_of, size_of, MaybeUninit};
use core::ptr;

use crate::arm_m::data_synchronization_barrier;
use crate::arm_m::exc::{Exception, ExceptionTable, Handler, ResetHandler};
use crate::arm_m::nvic::Nvic;
use crate::arm_m::with_interrupts_masked;

use super::irq::{Interrupt, InterruptTable, IrqHandler, NvicExt, INTERRUPT_COUNT};

/// Number of words in the table: the initial stack pointer, fifteen system
/// exception slots, and the programmable interrupts.
pub const VECTOR_COUNT: usize = 16 + INTERRUPT_COUNT;

const WORD: usize = size_of::<usize>();

/// Size of the table in bytes.
pub const TABLE_BYTES: usize = VECTOR_COUNT * WORD;

/// The table as the processor reads it: the architectural exception table
/// immediately followed by the interrupt vectors.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct VectorTable {
    exceptions: ExceptionTable,
    interrupts: InterruptTable,
}

const _: () = assert!(size_of::<VectorTable>() == VECTOR_COUNT * WORD);
const _: () = assert!(size_of::<ExceptionTable>() == 16 * WORD);

impl VectorTable {
    pub const fn exceptions(&self) -> &ExceptionTable {
        &self.exceptions
    }

    pub const fn interrupts(&self) -> &InterruptTable {
        &self.interrupts
    }

    /// The table viewed as raw words, in the order the processor indexes
    /// them.
    pub fn words(&self) -> &[usize; VECTOR_COUNT] {
        // Every field is a pointer-sized word and the size is asserted above.
        unsafe { &*(self as *const VectorTable as *const [usize; VECTOR_COUNT]) }
    }
}

/// Bitmask with one bit per table slot that has been bound.
const fn claim(bound: u128, slot: usize) -> u128 {
    let bit = 1u128 << slot;
    if bound & bit != 0 {
        panic!("vector table slot bound twice");
    }
    bound | bit
}

/// Builds a `VectorTable` in a `const` context.
///
/// Starts from a table where every exception and interrupt has its default
/// handler.  Each `exception`/`interrupt` call overrides one slot; binding
/// the same slot twice panics, which in a `static` initializer is a build
/// error.  The reserved slots have no name and can't be bound.
#[must_use]
pub struct VectorTableBuilder {
    table: VectorTable,
    bound: u128,
}

impl VectorTableBuilder {
    pub const fn new(initial_stack: *const u32,
                     reset: ResetHandler) -> VectorTableBuilder {
        VectorTableBuilder {
            table: VectorTable {
                exceptions: ExceptionTable::new(initial_stack, reset),
                interrupts: InterruptTable::new(),
            },
            bound: 0,
        }
    }

    /// Binds a system exception.
    pub const fn exception(mut self, exc: Exception, handler: Handler) -> Self {
        self.bound = claim(self.bound, exc.slot());
        self.table.exceptions = self.table.exceptions.with(exc, handler);
        self
    }

    /// Binds a programmable interrupt.
    pub const fn interrupt(mut self, irq: Interrupt, handler: IrqHandler) -> Self {
        self.bound = claim(self.bound, irq.slot());
        self.table.interrupts = self.table.interrupts.with(irq, handler);
        self
    }

    pub const fn build(self) -> VectorTable {
        self.table
    }
}

/// Where the linker places the relocated table: the base of SRAM bank 0.
pub const RELOCATION_ADDRESS: usize = 0x2000_0000;

/// Size of the relocated table's storage, and its alignment.  VTOR requires
/// a table to be aligned to its size rounded up to a power of two.
pub const RELOCATION_SIZE: usize = (VECTOR_COUNT * WORD).next_power_of_two();

const RELOCATION_WORDS: usize = RELOCATION_SIZE / WORD;

/// Storage for a copy of the vector table in RAM.
///
/// On the target this lives in `.relocated_ivt`, which is `NOLOAD` and sits
/// outside `.data`/`.bss`: reset neither copies nor zeroes it, so its
/// contents are whatever `populate` last wrote.
#[cfg_attr(target_pointer_width = "32", repr(C, align(512)))]
#[cfg_attr(target_pointer_width = "64", repr(C, align(1024)))]
pub struct RelocatedTable {
    words: UnsafeCell<[MaybeUninit<usize>; RELOCATION_WORDS]>,
}

const _: () = assert!(align_of::<RelocatedTable>() == RELOCATION_SIZE);
const _: () = assert!(size_of::<RelocatedTable>() == RELOCATION_SIZE);

unsafe impl Sync for RelocatedTable {}

impl RelocatedTable {
    pub const fn new() -> RelocatedTable {
        RelocatedTable {
            words: UnsafeCell::new([MaybeUninit::uninit(); RELOCATION_WORDS]),
        }
    }

    /// Copies `source` into this storage, one volatile word at a time, and
    /// returns the handle through which the copy may be patched.
    ///
    /// # Safety
    ///
    /// Nothing may be reading this table concurrently: either the processor
    /// is not dispatching through it yet, or every interrupt is masked.
    pub unsafe fn populate(&self, source: &VectorTable) -> RelocatedVectors<'_> {
        let dst = self.words.get() as *mut usize;
        for (i, &w) in source.words().iter().enumerate() {
            ptr::write_volatile(dst.add(i), w);
        }
        data_synchronization_barrier();
        RelocatedVectors { table: self, _not_send: PhantomData }
    }

    /// Produces a handle to a table populated earlier in this boot.
    ///
    /// # Safety
    ///
    /// `populate` must already have run on this storage since reset.
    pub unsafe fn assume_populated(&self) -> RelocatedVectors<'_> {
        RelocatedVectors { table: self, _not_send: PhantomData }
    }
}

impl Default for RelocatedTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A populated `RelocatedTable`.  Holding one is the only way to patch
/// vectors, so patching an unpopulated copy can't be written down.
#[derive(Copy, Clone)]
pub struct RelocatedVectors<'a> {
    table: &'a RelocatedTable,
    _not_send: PhantomData<*const ()>,
}

impl<'a> RelocatedVectors<'a> {
    /// Address of the first word, for `Scb::set_vector_table`.
    pub fn base(&self) -> usize {
        self.table.words.get() as usize
    }

    /// Reads slot `index` of the copy.
    pub fn word(&self, index: usize) -> usize {
        assert!(index < VECTOR_COUNT);
        unsafe { ptr::read_volatile(self.slot_ptr(index)) }
    }

    fn slot_ptr(&self, index: usize) -> *mut usize {
        unsafe { (self.table.words.get() as *mut usize).add(index) }
    }

    fn write(&self, index: usize, value: usize) {
        unsafe { ptr::write_volatile(self.slot_ptr(index), value) }
        data_synchronization_barrier()
    }

    /// Replaces the handler for `irq`.
    ///
    /// # Safety
    ///
    /// If the processor dispatches through this copy, `irq` must not fire
    /// while the word is being replaced.  `patch_interrupt_masked` arranges
    /// that.
    pub unsafe fn patch_interrupt(&self, irq: Interrupt, handler: IrqHandler) {
        self.write(irq.slot(), handler as usize)
    }

    /// Replaces the handler for a system exception.
    ///
    /// # Safety
    ///
    /// As for `patch_interrupt`; most system exceptions can't be disabled, so
    /// this is usually done before the copy is installed.
    pub unsafe fn patch_exception(&self, exc: Exception, handler: Handler) {
        self.write(exc.slot(), handler as usize)
    }

    /// Replaces the handler for `irq` with the line disabled in `nvic` and
    /// interrupts masked, then restores the line's previous enable state.
    pub fn patch_interrupt_masked(&self, nvic: &Nvic, irq: Interrupt, handler: IrqHandler) {
        with_interrupts_masked(|| {
            let was_enabled = nvic.is_enabled(irq);
            nvic.disable_irq(irq);
            unsafe { self.patch_interrupt(irq, handler) }
            if was_enabled {
                nvic.enable_irq(irq)
            }
        });
        log::debug!("vector for {:?} patched", irq);
    }
}
