//! Serial port pool for COM-port barcode scanners.
//!
//! Each opened port gets a UUID handle; the scanner reader references
//! ports by handle rather than raw COM name, and closing a handle removes
//! it from the pool.

use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Global pool of open serial ports, keyed by UUID handle.
static PORT_POOL: Mutex<Option<HashMap<String, Box<dyn serialport::SerialPort>>>> =
    Mutex::new(None);

fn pool() -> std::sync::MutexGuard<'static, Option<HashMap<String, Box<dyn serialport::SerialPort>>>>
{
    PORT_POOL.lock().unwrap_or_else(|e| e.into_inner())
}

/// List available serial/COM ports on this system.
pub fn list_ports() -> Result<Vec<Value>, String> {
    let ports = serialport::available_ports().map_err(|e| format!("Failed to list ports: {e}"))?;

    Ok(ports
        .iter()
        .map(|p| {
            let port_type = match &p.port_type {
                serialport::SerialPortType::UsbPort(_) => "usb",
                serialport::SerialPortType::BluetoothPort => "bluetooth",
                serialport::SerialPortType::PciPort => "pci",
                serialport::SerialPortType::Unknown => "unknown",
            };
            let mut obj = serde_json::json!({
                "name": p.port_name,
                "portType": port_type,
            });
            if let serialport::SerialPortType::UsbPort(usb) = &p.port_type {
                if let Some(ref product) = usb.product {
                    obj["product"] = product.clone().into();
                }
            }
            obj
        })
        .collect())
}

/// Open a serial port (e.g. "COM3", "/dev/ttyUSB0") and return its handle.
pub fn open_port(port: &str, baud_rate: u32, timeout_ms: u64) -> Result<String, String> {
    let serial = serialport::new(port, baud_rate)
        .timeout(Duration::from_millis(timeout_ms))
        .open()
        .map_err(|e| format!("Failed to open {port} @ {baud_rate}: {e}"))?;

    let handle = Uuid::new_v4().to_string();
    {
        let mut guard = pool();
        let map = guard.get_or_insert_with(HashMap::new);
        map.insert(handle.clone(), serial);
    }

    info!(port = port, baud = baud_rate, handle = %handle, "Serial port opened");
    Ok(handle)
}

/// Read up to `max_bytes` from an open port as lossy UTF-8 text. A read
/// timeout yields an empty string.
pub fn read_port(handle: &str, max_bytes: usize) -> Result<String, String> {
    let mut guard = pool();
    let map = guard.get_or_insert_with(HashMap::new);
    let port = map
        .get_mut(handle)
        .ok_or_else(|| format!("No open port with handle {handle}"))?;

    let mut buf = vec![0u8; max_bytes.min(4096)];
    match port.read(&mut buf) {
        Ok(n) => {
            buf.truncate(n);
            Ok(String::from_utf8_lossy(&buf).to_string())
        }
        Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(String::new()),
        Err(e) => Err(format!("Serial read failed: {e}")),
    }
}

/// Close an open serial port. Returns whether a port was actually closed.
pub fn close_port(handle: &str) -> bool {
    let mut guard = pool();
    let map = guard.get_or_insert_with(HashMap::new);
    if map.remove(handle).is_some() {
        info!(handle = handle, "Serial port closed");
        true
    } else {
        warn!(handle = handle, "Close called on unknown handle");
        false
    }
}
