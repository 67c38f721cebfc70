//! The architectural half of the vector table.

use super::startup::halt;

/// ARMvx-M exception handlers are merely functions conforming to the C ABI.
pub type Handler = extern "C" fn();

/// The reset vector is special: it must not return.  We can model this nicely
/// in Rust's type system as a diverging function.  We additionally mark the
/// reset handler as `unsafe` because it must do scary stuff, including zeroing
/// BSS.  Allowing a safe program to call it directly would be bad.
pub type ResetHandler = unsafe extern "C" fn() -> !;

/// The system exceptions a table entry can be bound to, numbered as the NVIC
/// numbers them (`IRQn`, negative for system exceptions).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Exception {
    Nmi = -14,
    HardFault = -13,
    MemManage = -12,
    BusFault = -11,
    UsageFault = -10,
    SvCall = -5,
    DebugMonitor = -4,
    PendSv = -2,
    SysTick = -1,
}

impl Exception {
    pub const ALL: [Exception; 9] = [
        Exception::Nmi,
        Exception::HardFault,
        Exception::MemManage,
        Exception::BusFault,
        Exception::UsageFault,
        Exception::SvCall,
        Exception::DebugMonitor,
        Exception::PendSv,
        Exception::SysTick,
    ];

    /// Index of this exception's word in the vector table.
    pub const fn slot(self) -> usize {
        (self as i32 + 16) as usize
    }
}

/// Table indices of the architecturally reserved exception entries.
pub const RESERVED_SLOTS: [usize; 5] = [7, 8, 9, 10, 13];

/// Represents an ARMv7-M exception table: the first sixteen words of every
/// vector table, followed on real parts by the vendor interrupt vectors.
///
/// Every entry is populated; there is no "empty" vector.  Unused faults go to
/// a handler that spins, which gives a debugger somewhere stable to find the
/// processor.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct ExceptionTable {
    /// ARMvx-M processors load their initial stack pointer from the first word
    /// of the vector table.  ARM uses a "full descending" stack, so this
    /// usually points just past the end of RAM; it is modeled as a `const`
    /// pointer to discourage dereferencing it.
    pub initial_stack: *const u32,

    /// Reset vector.  At reset, the processor loads its stack pointer from
    /// `initial_stack` (above) and then enters this function using the ARM
    /// AAPCS C ABI.
    pub reset: ResetHandler,

    /// Non-Maskable Interrupt handler.
    pub nmi:          Handler,
    /// Hard Fault handler.
    pub hard_fault:   Handler,
    /// Memory Management Fault handler.
    pub mm_fault:     Handler,
    /// Bus Fault handler.
    pub bus_fault:    Handler,
    /// Usage Fault handler.
    pub usage_fault:  Handler,
    _reserved0:       Handler,
    _reserved1:       Handler,
    _reserved2:       Handler,
    _reserved3:       Handler,
    /// Supervisor Call (`SVC`) handler.
    pub sv_call:      Handler,
    /// Debug Monitor handler.
    pub debug_mon:    Handler,
    _reserved4:       Handler,
    /// PendSV handler.
    pub pend_sv:      Handler,
    /// SysTick handler.
    pub sys_tick:     Handler,
}

impl ExceptionTable {
    /// An exception table with every system exception bound to its default.
    /// This works in a system that is willing to lock up at any fault.
    pub const fn new(initial_stack: *const u32,
                     reset: ResetHandler) -> ExceptionTable {
        ExceptionTable {
            initial_stack,
            reset,

            nmi: default_nmi,
            hard_fault: default_hard_fault,
            mm_fault: default_mm_fault,
            bus_fault: default_bus_fault,
            usage_fault: default_usage_fault,
            _reserved0: reserved_vector,
            _reserved1: reserved_vector,
            _reserved2: reserved_vector,
            _reserved3: reserved_vector,
            sv_call: default_sv_call,
            debug_mon: default_debug_mon,
            _reserved4: reserved_vector,
            pend_sv: default_pend_sv,
            sys_tick: default_sys_tick,
        }
    }

    /// Returns this table with `exc` bound to `handler`.
    pub const fn with(mut self, exc: Exception, handler: Handler) -> Self {
        match exc {
            Exception::Nmi => self.nmi = handler,
            Exception::HardFault => self.hard_fault = handler,
            Exception::MemManage => self.mm_fault = handler,
            Exception::BusFault => self.bus_fault = handler,
            Exception::UsageFault => self.usage_fault = handler,
            Exception::SvCall => self.sv_call = handler,
            Exception::DebugMonitor => self.debug_mon = handler,
            Exception::PendSv => self.pend_sv = handler,
            Exception::SysTick => self.sys_tick = handler,
        }
        self
    }

    /// The handler currently bound to `exc`.
    pub const fn handler(&self, exc: Exception) -> Handler {
        match exc {
            Exception::Nmi => self.nmi,
            Exception::HardFault => self.hard_fault,
            Exception::MemManage => self.mm_fault,
            Exception::BusFault => self.bus_fault,
            Exception::UsageFault => self.usage_fault,
            Exception::SvCall => self.sv_call,
            Exception::DebugMonitor => self.debug_mon,
            Exception::PendSv => self.pend_sv,
            Exception::SysTick => self.sys_tick,
        }
    }
}

/// Most programs will have at least one `ExceptionTable` inside a `static`:
/// the one that gets deposited into ROM and read at processor startup.  The
/// only thing keeping the type from being `Sync` is the raw `initial_stack`
/// pointer, which is never dereferenced.
unsafe impl Sync for ExceptionTable {}

macro_rules! fatal_defaults {
    ($($(#[$m:meta])* $name:ident,)*) => {
        $(
            $(#[$m])*
            #[inline(never)]
            pub extern "C" fn $name() {
                halt()
            }
        )*
    };
}

fatal_defaults! {
    /// Default NMI handler.  Spins.
    default_nmi,
    /// Default hard fault handler.  Spins.
    default_hard_fault,
    /// Default memory management fault handler.  Spins.
    default_mm_fault,
    /// Default bus fault handler.  Spins.
    default_bus_fault,
    /// Default usage fault handler.  Spins.
    default_usage_fault,
    default_sv_call,
    default_debug_mon,
    default_pend_sv,
    default_sys_tick,
    /// Occupies the architecturally reserved entries.  Taking it means the
    /// table or the core is badly broken.
    reserved_vector,
}
