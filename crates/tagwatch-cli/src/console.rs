//! Console-driven tag input for development hosts.
//!
//! Each line on stdin presents one tag to the mock reader. A line is either
//! the raw UID as colon-separated hex bytes in reader order (`2C:28:C6:3D`)
//! or the decimal card number (`1036396588`). Blank lines are ignored.
//!
//! Input is read on a dedicated OS thread, not on the runtime: a read that
//! never completes must not hold up runtime shutdown after Ctrl-C.

use anyhow::{Context, Result, bail};
use std::io::BufRead;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use tagwatch_core::constants::MAX_UID_LENGTH;
use tagwatch_hardware::mock::MockReaderHandle;

/// Shortest UID a real transceiver reports.
const MIN_REPORTED_UID: usize = 4;

/// Parse one console line into raw UID bytes.
pub fn parse_uid(line: &str) -> Result<Vec<u8>> {
    let line = line.trim();
    if line.is_empty() {
        bail!("empty input");
    }

    let uid = if line.contains(':') {
        line.split(':')
            .map(|byte| {
                u8::from_str_radix(byte.trim(), 16)
                    .with_context(|| format!("{byte:?} is not a hex byte"))
            })
            .collect::<Result<Vec<u8>>>()?
    } else {
        let id: u128 = line
            .parse()
            .with_context(|| format!("{line:?} is neither a card number nor a hex UID"))?;
        let bytes = id.to_le_bytes();
        let used = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        bytes[..used.max(MIN_REPORTED_UID)].to_vec()
    };

    if uid.len() > MAX_UID_LENGTH {
        bail!("UID has {} bytes, at most {MAX_UID_LENGTH} allowed", uid.len());
    }
    Ok(uid)
}

/// Start reading tags from stdin in the background.
pub fn spawn_stdin(handle: MockReaderHandle) -> Result<JoinHandle<()>> {
    info!("Reading tags from stdin (hex UID like 2C:28:C6:3D, or a card number)");
    spawn(std::io::BufReader::new(std::io::stdin()), handle)
}

/// Feed `input` into the reader from a detached thread.
///
/// The thread ends at end of input or once the reader is dropped. Nothing
/// waits for it, so the process can exit while a read is still pending.
pub fn spawn<R>(input: R, handle: MockReaderHandle) -> Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            if let Err(e) = feed(input, &handle) {
                warn!("Console input failed: {:#}", e);
            }
        })
        .context("Failed to start console reader")
}

/// Feed lines from `input` into the reader behind `handle`.
pub fn feed<R: BufRead>(input: R, handle: &MockReaderHandle) -> Result<()> {
    for line in input.lines() {
        let line = line.context("Failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_uid(&line) {
            Ok(uid) => {
                debug!(?uid, "Presenting tag");
                if handle.present_uid(uid).is_err() {
                    debug!("Reader gone, console input stopped");
                    return Ok(());
                }
            }
            Err(e) => warn!("Ignoring input: {:#}", e),
        }
    }
    debug!("Console input closed");
    Ok(())
}
