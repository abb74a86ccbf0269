// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `log` backend that writes one line per record to a byte sink, usually
//! stderr.

use core::cell::{OnceCell, RefCell};
use critical_section::Mutex;
use log::{Level, Metadata, Record};
use std::io::Write;

type Sink = Box<dyn Write + Send>;

static LOGGER: IoWriteLogger = IoWriteLogger::new();
struct IoWriteLogger {
    writer: Mutex<RefCell<Option<Sink>>>,
    level: Mutex<OnceCell<Level>>,
}
impl IoWriteLogger {
    const fn new() -> Self {
        IoWriteLogger {
            writer: Mutex::new(RefCell::new(None)),
            level: Mutex::new(OnceCell::new()),
        }
    }
}

impl log::Log for IoWriteLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        critical_section::with(|cs| {
            metadata.level() <= self.level.borrow(cs).get().cloned().unwrap_or(Level::Info)
        })
    }
    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            critical_section::with(|cs| {
                if let Some(sink) = self.writer.borrow(cs).borrow_mut().as_mut() {
                    let _ = writeln!(
                        sink,
                        "[{}] - {}: {}",
                        record.level(),
                        record.target(),
                        record.args()
                    );
                }
            });
        }
    }
    fn flush(&self) {
        critical_section::with(|cs| {
            if let Some(sink) = self.writer.borrow(cs).borrow_mut().as_mut() {
                let _ = sink.flush();
            }
        });
    }
}

/// Installs the logger. Records above `level` are dropped.
///
/// Only the first call takes effect; later calls report
/// `SetLoggerError`.
pub fn init<W>(sink: W, level: Level) -> Result<(), log::SetLoggerError>
where
    W: Write + Send + 'static,
{
    log::set_logger(&LOGGER)?;
    critical_section::with(|cs| {
        LOGGER.writer.borrow(cs).replace(Some(Box::new(sink)));
        LOGGER.level.borrow(cs).set(level).ok();
    });
    log::set_max_level(level.to_level_filter());
    Ok(())
}
