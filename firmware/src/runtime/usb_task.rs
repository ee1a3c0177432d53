use embassy_futures::join::join;
use embassy_futures::select::{Either, select};
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender as ChannelSender;
use embassy_usb::class::cdc_acm::{ControlChanged, Sender};
use embassy_usb::driver::{Driver, EndpointError};
use heapless::String;
use trip_core::repl::status::StatusSnapshot;

use super::{INPUT_QUEUE_DEPTH, INPUTS, USB_STORAGE};
use crate::console::{Console, ConsoleBusy, ConsoleHost};
use crate::input::BeaconInput;
use crate::status;
use crate::usb::{self, ConsolePort, UsbDeviceStrings};

embassy_stm32::bind_interrupts!(struct UsbIrqs {
    USB_UCPD1_2 => embassy_stm32::usb::InterruptHandler<hal::peripherals::USB>;
});

/// Console output gathered while handling one packet.
const OUTPUT_CAPACITY: usize = 1024;

#[embassy_executor::task]
pub async fn run(
    usb: Peri<'static, hal::peripherals::USB>,
    dp: Peri<'static, hal::peripherals::PA12>,
    dm: Peri<'static, hal::peripherals::PA11>,
) -> ! {
    let storage = USB_STORAGE.init(usb::UsbDeviceStorage::new());
    let driver = embassy_stm32::usb::Driver::new(usb, UsbIrqs, dp, dm);
    let (mut device, port) = usb::build(driver, storage, UsbDeviceStrings::default());

    join(device.run(), run_console(port)).await;
    loop {
        core::future::pending::<()>().await;
    }
}

struct FirmwareHost {
    inputs: ChannelSender<'static, CriticalSectionRawMutex, BeaconInput, INPUT_QUEUE_DEPTH>,
}

impl ConsoleHost for FirmwareHost {
    fn submit(&mut self, input: BeaconInput) -> Result<(), ConsoleBusy> {
        self.inputs.try_send(input).map_err(|_| ConsoleBusy)
    }

    fn status(&self) -> StatusSnapshot {
        status::snapshot()
    }
}

async fn run_console<D: Driver<'static>>(port: ConsolePort<D>) -> ! {
    let ConsolePort {
        mut sender,
        mut receiver,
        control,
    } = port;
    let mut host = FirmwareHost {
        inputs: INPUTS.sender(),
    };
    let mut console = Console::new();
    let mut ingress = [0u8; usb::PACKET_LEN];
    let mut output: String<OUTPUT_CAPACITY> = String::new();

    loop {
        join(receiver.wait_connection(), sender.wait_connection()).await;
        wait_for_dtr(&control, &mut sender).await;
        defmt::info!("usb: console connected");

        output.clear();
        if console.on_connect(&mut output).is_err()
            || write_all(&mut sender, &output).await.is_err()
        {
            continue;
        }

        loop {
            match select(receiver.read_packet(&mut ingress), control.control_changed()).await {
                Either::First(Ok(count)) => {
                    output.clear();
                    for &byte in &ingress[..count] {
                        if console.ingest(byte, &mut host, &mut output).is_err() {
                            defmt::warn!("usb: console response truncated");
                        }
                    }
                    if let Err(EndpointError::Disabled) = write_all(&mut sender, &output).await {
                        defmt::warn!("usb: console write disabled");
                        break;
                    }
                }
                Either::First(Err(EndpointError::Disabled)) => {
                    defmt::warn!("usb: console interface disabled");
                    break;
                }
                Either::First(Err(EndpointError::BufferOverflow)) => {
                    defmt::warn!("usb: console read overflow");
                }
                Either::Second(()) => {
                    if !sender.dtr() {
                        defmt::warn!("usb: console host dropped DTR");
                        break;
                    }
                }
            }
        }

        console.on_disconnect();
    }
}

async fn write_all<D: Driver<'static>>(
    sender: &mut Sender<'static, D>,
    text: &str,
) -> Result<(), EndpointError> {
    for chunk in text.as_bytes().chunks(usb::PACKET_LEN) {
        sender.write_packet(chunk).await?;
    }
    // A full final packet needs a zero-length packet to end the transfer.
    if !text.is_empty() && text.len() % usb::PACKET_LEN == 0 {
        sender.write_packet(&[]).await?;
    }
    Ok(())
}

async fn wait_for_dtr<D: Driver<'static>>(
    control: &ControlChanged<'static>,
    sender: &mut Sender<'static, D>,
) {
    while !sender.dtr() {
        control.control_changed().await;
    }
}
