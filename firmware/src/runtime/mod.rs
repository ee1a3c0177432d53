use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, OutputType, Pull, Speed};
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use static_cell::StaticCell;
use trip_core::dispatch::MockResponders;
use trip_core::random::SeededRandom;
use trip_core::session::{RideSession, SessionConfig};

use crate::buzzer::{BuzzerBackend, NoteChannel};
use crate::clock::BeaconInstant;
use crate::input::{BeaconInput, Button};
use crate::usb;

mod button_task;
mod buzzer_task;
mod led_task;
mod trip_task;
mod usb_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// Inputs waiting for the trip task.
pub const INPUT_QUEUE_DEPTH: usize = 8;

pub type InputChannel = Channel<CriticalSectionRawMutex, BeaconInput, INPUT_QUEUE_DEPTH>;

pub type BeaconSession = RideSession<
    BeaconInstant,
    SeededRandom,
    BuzzerBackend<&'static NoteChannel>,
    MockResponders<SeededRandom>,
>;

pub(crate) static INPUTS: InputChannel = Channel::new();
pub(crate) static BUZZER_NOTES: NoteChannel = Channel::new();
pub(crate) static USB_STORAGE: StaticCell<usb::UsbDeviceStorage> = StaticCell::new();

/// Folds the 96-bit device id into a non-zero generator seed.
fn seed_from_uid(uid: &[u8; 12]) -> u64 {
    uid.chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .fold(trip_core::random::DEFAULT_SEED, |seed, word| {
            seed.rotate_left(21) ^ u64::from(word)
        })
}

/// Seed for the session that replaces a torn-down one.
pub(crate) const fn next_ride_seed(seed: u64) -> u64 {
    seed.rotate_left(17) ^ trip_core::random::DEFAULT_SEED
}

/// Builds an idle passenger session on the shared buzzer queue.
pub(crate) fn beacon_session(seed: u64) -> BeaconSession {
    RideSession::new(
        SessionConfig::PASSENGER,
        SeededRandom::new(seed),
        BuzzerBackend::new(&BUZZER_NOTES),
        MockResponders::new(SeededRandom::new(seed.rotate_left(32))),
    )
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA0,
        PA1,
        PA5,
        PA6,
        PA11,
        PA12,
        EXTI0,
        EXTI1,
        TIM3,
        USB,
        ..
    } = hal::init(config);

    let seed = seed_from_uid(hal::uid::uid());
    defmt::info!("beacon: boot seed={:#x}", seed);

    let buzzer = SimplePwm::new(
        TIM3,
        Some(PwmPin::new(PA6, OutputType::PushPull)),
        None,
        None,
        None,
        Hertz(880),
        CountingMode::EdgeAlignedUp,
    );

    spawner
        .spawn(trip_task::run(seed))
        .expect("failed to spawn trip task");
    spawner
        .spawn(buzzer_task::run(buzzer))
        .expect("failed to spawn buzzer task");
    spawner
        .spawn(button_task::run(
            ExtiInput::new(PA0, EXTI0, Pull::Up),
            Button::Sos,
        ))
        .expect("failed to spawn SOS button task");
    spawner
        .spawn(button_task::run(
            ExtiInput::new(PA1, EXTI1, Pull::Up),
            Button::Ride,
        ))
        .expect("failed to spawn ride button task");
    spawner
        .spawn(led_task::run(Output::new(PA5, Level::Low, Speed::Low)))
        .expect("failed to spawn LED task");

    spawner
        .spawn(usb_task::run(USB, PA12, PA11))
        .expect("failed to spawn USB task");

    core::future::pending::<()>().await;
}
