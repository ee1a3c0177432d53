use embassy_stm32::exti::ExtiInput;
use embassy_time::Instant;

use super::INPUTS;
use crate::input::{Button, classify, map_gesture};
use crate::status;

/// Watches one active-low button and forwards the mapped input.
#[embassy_executor::task(pool_size = 2)]
pub async fn run(mut pin: ExtiInput<'static>, button: Button) -> ! {
    let inputs = INPUTS.sender();

    loop {
        pin.wait_for_falling_edge().await;
        let pressed_at = Instant::now();
        pin.wait_for_rising_edge().await;

        let held = core::time::Duration::from_micros(pressed_at.elapsed().as_micros());
        let Some(gesture) = classify(held) else {
            continue;
        };

        let snapshot = status::snapshot();
        let Some(input) = map_gesture(button, gesture, snapshot.lifecycle, snapshot.sos) else {
            continue;
        };

        if inputs.try_send(input).is_err() {
            defmt::warn!("button: input queue full, dropped {}", input.as_str());
        }
    }
}
