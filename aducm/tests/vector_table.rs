//! Building vector tables through the public API, and dispatching through
//! them the way the processor would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use aducm::aducm302x::irq::{self, Interrupt, IrqHandler, RESERVED_INTERRUPTS};
use aducm::aducm302x::vectors::{RelocatedTable, VectorTable, VectorTableBuilder,
                                RELOCATION_SIZE, VECTOR_COUNT};
use aducm::arm_m::exc::{self, Exception, Handler, RESERVED_SLOTS};

/// Index of the most recently run marker.
static LAST: AtomicUsize = AtomicUsize::new(usize::MAX);

/// Serializes the tests that run markers and read `LAST`.
static DISPATCH: Mutex<()> = Mutex::new(());

#[cfg(not(feature = "rtos"))]
extern "C" fn marker<const N: usize>() {
    LAST.store(N, Ordering::SeqCst)
}

#[cfg(feature = "rtos")]
extern "C" fn marker<const N: usize>(_iid: u32, _arg: *mut core::ffi::c_void) {
    LAST.store(N, Ordering::SeqCst)
}

extern "C" fn exc_marker<const N: usize>() {
    LAST.store(1000 + N, Ordering::SeqCst)
}

/// Calls the interrupt handler stored in a table word.
fn take_interrupt(word: usize) {
    let h: IrqHandler = unsafe { core::mem::transmute(word) };
    #[cfg(not(feature = "rtos"))]
    h();
    #[cfg(feature = "rtos")]
    h(0, core::ptr::null_mut());
}

fn take_exception(word: usize) {
    let h: Handler = unsafe { core::mem::transmute(word) };
    h()
}

macro_rules! with_markers {
    ($($n:literal)*) => {
        const MARKERS: [IrqHandler; 55] = [$(marker::<$n>),*];

        const fn bind_all(b: VectorTableBuilder) -> VectorTableBuilder {
            b $(.interrupt(Interrupt::ALL[$n], marker::<$n>))*
        }
    };
}

with_markers!(
    0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17 18 19 20 21 22 23 24 25 26
    27 28 29 30 31 32 33 34 35 36 37 38 39 40 41 42 43 44 45 46 47 48 49 50
    51 52 53 54
);

unsafe extern "C" fn no_reset() -> ! {
    aducm::arm_m::startup::halt()
}

static STACK_TOP: u32 = 0;

fn builder() -> VectorTableBuilder {
    VectorTableBuilder::new(&STACK_TOP, no_reset)
}

const fn bind_exceptions(b: VectorTableBuilder) -> VectorTableBuilder {
    b.exception(Exception::Nmi, exc_marker::<0>)
        .exception(Exception::HardFault, exc_marker::<1>)
        .exception(Exception::MemManage, exc_marker::<2>)
        .exception(Exception::BusFault, exc_marker::<3>)
        .exception(Exception::UsageFault, exc_marker::<4>)
        .exception(Exception::SvCall, exc_marker::<5>)
        .exception(Exception::DebugMonitor, exc_marker::<6>)
        .exception(Exception::PendSv, exc_marker::<7>)
        .exception(Exception::SysTick, exc_marker::<8>)
}

static FULL: VectorTable =
    bind_exceptions(bind_all(VectorTableBuilder::new(&STACK_TOP, no_reset))).build();

#[test]
fn stack_and_reset_come_first() {
    let w = FULL.words();
    assert_eq!(w[0], &STACK_TOP as *const u32 as usize);
    assert_eq!(w[1], no_reset as usize);
}

#[test]
fn every_interrupt_slot_dispatches_to_its_binding() {
    let _g = DISPATCH.lock().unwrap();
    let w = FULL.words();
    for (i, irq) in Interrupt::ALL.iter().enumerate() {
        let slot = 16 + *irq as usize;
        assert_eq!(w[slot], MARKERS[i] as usize, "{:?}", irq);
        take_interrupt(w[slot]);
        assert_eq!(LAST.load(Ordering::SeqCst), i, "{:?}", irq);
    }
}

#[test]
fn every_exception_slot_dispatches_to_its_binding() {
    let _g = DISPATCH.lock().unwrap();
    for (i, exc) in Exception::ALL.iter().enumerate() {
        let slot = (*exc as i32 + 16) as usize;
        take_exception(FULL.words()[slot]);
        assert_eq!(LAST.load(Ordering::SeqCst), 1000 + i, "{:?}", exc);
    }
}

#[test]
fn reserved_slots_keep_placeholders() {
    let w = FULL.words();
    for s in RESERVED_SLOTS {
        assert_eq!(w[s], exc::reserved_vector as usize, "slot {}", s);
    }
    for n in RESERVED_INTERRUPTS {
        assert_eq!(w[16 + n as usize], irq::reserved_interrupt as usize, "IRQ {}", n);
    }
}

#[test]
fn unbound_slots_keep_defaults() {
    let t = builder().interrupt(Interrupt::Adc, marker::<0>).build();
    let w = t.words();
    assert_eq!(w[16 + Interrupt::Uart as usize], irq::unbound_interrupt as usize);
    assert_eq!(w[Exception::HardFault.slot()], exc::default_hard_fault as usize);
    assert_eq!(w[16 + Interrupt::Adc as usize], marker::<0> as IrqHandler as usize);
}

#[test]
#[should_panic(expected = "bound twice")]
fn interrupt_bound_twice() {
    let _ = builder()
        .interrupt(Interrupt::Spi0, marker::<1>)
        .interrupt(Interrupt::Spi0, marker::<2>);
}

#[test]
#[should_panic(expected = "bound twice")]
fn exception_bound_twice() {
    let _ = builder()
        .exception(Exception::SysTick, exc_marker::<0>)
        .exception(Exception::SysTick, exc_marker::<0>);
}

#[test]
fn relocated_copy_matches_and_patches() {
    let _g = DISPATCH.lock().unwrap();
    let storage = Box::new(RelocatedTable::new());
    let copy = unsafe { storage.populate(&FULL) };

    assert_eq!(copy.base() % RELOCATION_SIZE, 0);
    for i in 0..VECTOR_COUNT {
        assert_eq!(copy.word(i), FULL.words()[i], "slot {}", i);
    }

    let target = Interrupt::DmaSip3;
    unsafe { copy.patch_interrupt(target, marker::<40>) };
    take_interrupt(copy.word(target.slot()));
    assert_eq!(LAST.load(Ordering::SeqCst), 40);
    // The ROM table stays as built.
    let index = Interrupt::ALL.iter().position(|&i| i == target).unwrap();
    assert_eq!(FULL.words()[target.slot()], MARKERS[index] as usize);

    unsafe { copy.patch_exception(Exception::PendSv, exc_marker::<3>) };
    take_exception(copy.word(Exception::PendSv.slot()));
    assert_eq!(LAST.load(Ordering::SeqCst), 1003);
}
