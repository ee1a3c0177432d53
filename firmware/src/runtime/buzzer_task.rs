use embassy_stm32::peripherals::TIM3;
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::simple_pwm::SimplePwm;
use embassy_time::{Duration, Instant, Timer};

use super::BUZZER_NOTES;
use crate::buzzer::{BuzzerNote, ENVELOPE_STEP};

/// Plays queued notes on the piezo.
///
/// A note with a zero start offset begins a new alert; later notes are placed
/// relative to that origin so a siren keeps its cadence even if the queue
/// drains late.
#[embassy_executor::task]
pub async fn run(mut pwm: SimplePwm<'static, TIM3>) -> ! {
    let notes = BUZZER_NOTES.receiver();
    let mut origin = Instant::now();

    pwm.ch1().set_duty_cycle_fully_off();
    pwm.ch1().enable();

    loop {
        let note = notes.receive().await;
        if note.start_offset.is_zero() {
            origin = Instant::now();
        }

        let start = origin + embassy(note.start_offset);
        Timer::at(start).await;
        play(&mut pwm, &note, start).await;
    }
}

async fn play(pwm: &mut SimplePwm<'static, TIM3>, note: &BuzzerNote, start: Instant) {
    pwm.set_frequency(Hertz(note.frequency.rounded_hertz()));
    let step = embassy(ENVELOPE_STEP);
    let end = start + embassy(note.duration);

    let mut at = start;
    while at < end {
        let elapsed = core::time::Duration::from_micros(at.duration_since(start).as_micros());
        pwm.ch1()
            .set_duty_cycle_fraction(note.duty_permille_at(elapsed), 1_000);
        at += step;
        Timer::at(at.min(end)).await;
    }

    pwm.ch1().set_duty_cycle_fully_off();
}

fn embassy(duration: core::time::Duration) -> Duration {
    Duration::from_micros(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX))
}
