/// Invoked on `panic!`.  Applications can supply their own handler by enabling
/// the `app_panic_handler` feature.
#[cfg(all(target_os = "none", not(feature = "app_panic_handler")))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    crate::arm_m::startup::halt()
}
