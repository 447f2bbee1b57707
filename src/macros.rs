//! Helper macros.

/// Generate debug formatting code for a [`SerialPort`](serialport::SerialPort)
/// like struct.
macro_rules! debug_fmt_serialport {
    ($name:expr, $port:ident, $f:ident) => {
        $f.debug_tuple($name)
            .field(&$port.name())
            .field(&$port.baud_rate())
            .field(&$port.data_bits())
            .field(&$port.stop_bits())
            .field(&$port.parity())
            .field(&$port.flow_control())
            .field(&$port.timeout())
    };
}
