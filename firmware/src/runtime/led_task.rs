use embassy_stm32::gpio::Output;
use embassy_time::Timer;

use crate::status::{self, led_pattern};

#[embassy_executor::task]
pub async fn run(mut led: Output<'static>) -> ! {
    loop {
        let pattern = led_pattern(&status::snapshot());

        if pattern.on_ms > 0 {
            led.set_high();
            Timer::after_millis(u64::from(pattern.on_ms)).await;
        }
        if pattern.off_ms > 0 {
            led.set_low();
            Timer::after_millis(u64::from(pattern.off_ms)).await;
        }
    }
}
