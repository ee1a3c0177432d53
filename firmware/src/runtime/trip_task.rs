use embassy_futures::select::{Either, select};
use embassy_time::Timer;
use trip_core::repl::commands::SessionControl;

use super::{INPUTS, beacon_session, next_ride_seed};
use crate::clock::BeaconInstant;
use crate::input;
use crate::log::{EventMirror, log_input};
use crate::status;

/// Owns the ride session: sleeps until the next timer or input, applies it,
/// then republishes status and mirrors new events. A torn-down session is
/// replaced by a fresh one so the next ride and SOS still work.
#[embassy_executor::task]
pub async fn run(seed: u64) -> ! {
    let inputs = INPUTS.receiver();
    let mut mirror = EventMirror::new();
    let mut seed = seed;
    let mut session = beacon_session(seed);

    loop {
        status::publish(&SessionControl::status(&session));
        mirror.flush(session.events());

        let wake = match session.next_deadline() {
            Some(deadline) => select(Timer::at(deadline.into_embassy()), inputs.receive()).await,
            None => Either::Second(inputs.receive().await),
        };

        let now = BeaconInstant::now();
        session.drive(now);

        if let Either::Second(received) = wake {
            match input::apply(&mut session, received, now) {
                Ok(()) => log_input(received, None),
                Err(reason) => log_input(received, Some(&reason)),
            }
        }

        mirror.flush(session.events());
        let renewed = input::renew_if_torn_down(&mut session, || {
            seed = next_ride_seed(seed);
            beacon_session(seed)
        });
        if renewed {
            mirror.reset();
        }
    }
}
