use anyhow::Context;
use log::debug;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use crate::config::SerialArgs;

/// Open the bus interface. IBus runs 8E1.
pub fn open(args: &SerialArgs) -> anyhow::Result<SerialStream> {
    debug!("opening {} at {} baud", args.port, args.baud);
    tokio_serial::new(args.port.as_str(), args.baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::Even)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(args.read_timeout())
        .open_native_async()
        .with_context(|| format!("couldn't open serial port {}", args.port))
}
