use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use trip_core::random::DEFAULT_SEED;

use session::{Profile, Session};

fn main() -> io::Result<()> {
    record_trip()?;
    record_sos()?;
    record_teardown()?;
    Ok(())
}

/// Full ride: phases, the deviation warning, acknowledgement and completion.
fn record_trip() -> io::Result<()> {
    let mut session = Session::new(Profile::Passenger, DEFAULT_SEED, "trip")?;
    session.handle_completion("st", 2)?;
    session.handle_completion("adv", 3)?;
    session.handle_completion("advance ", "advance ".len())?;

    for line in [
        "start",
        "advance 3s",
        "status",
        "advance 3s",
        "advance 10s",
        "status",
        "ack",
        "advance 15s",
        "status",
    ] {
        session.handle_command(line)?;
    }
    Ok(())
}

fn record_sos() -> io::Result<()> {
    let mut session = Session::new(Profile::Driver, DEFAULT_SEED, "sos")?;
    session.handle_completion("sos ", "sos ".len())?;
    session.handle_completion("sos c", "sos c".len())?;

    for line in [
        "start",
        "sos",
        "sos cancel",
        "sos press",
        "sos confirm",
        "sos confirm",
        "status",
        "advance 3s",
        "status",
        "probe",
        "roadside tyre",
        "roadside mechanic",
    ] {
        session.handle_command(line)?;
    }
    Ok(())
}

fn record_teardown() -> io::Result<()> {
    let mut session = Session::new(Profile::Passenger, DEFAULT_SEED, "teardown")?;
    for line in [
        "start",
        "advance 6s",
        "teardown",
        "advance 30s",
        "ack",
        "sos",
        "teardown",
        "help",
        "help sos",
        "help reboot",
    ] {
        session.handle_command(line)?;
    }
    Ok(())
}
