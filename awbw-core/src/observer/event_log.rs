//! Board events as JSON lines, one per event, to any `Write` destination.
//!
//! ```json
//! {"turn":0,"action":2,"day":1,"event":{"type":"unit_removed","id":17}}
//! ```

use super::{BoardEvent, ObserverError, ReplayObserver, Snapshot};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

#[derive(Serialize)]
struct LogLine<'a> {
    turn: usize,
    action: i32,
    day: u32,
    event: &'a BoardEvent,
}

pub struct EventLogObserver {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl EventLogObserver {
    pub fn stdout() -> Self {
        Self::new(Box::new(BufWriter::new(std::io::stdout())))
    }

    pub fn file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl ReplayObserver for EventLogObserver {
    fn on_step(&self, snapshot: &Snapshot, events: &[BoardEvent]) -> Result<(), ObserverError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| ObserverError::Render("event log writer poisoned".into()))?;
        for event in events {
            let line = LogLine {
                turn: snapshot.cursor.turn,
                action: snapshot.cursor.action,
                day: snapshot.state.day,
                event,
            };
            serde_json::to_writer(&mut *writer, &line)?;
            writeln!(writer)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "EventLog"
    }

    fn on_shutdown(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            if let Err(e) = writer.flush() {
                log::warn!("Failed to flush event log: {}", e);
            }
        }
    }
}
