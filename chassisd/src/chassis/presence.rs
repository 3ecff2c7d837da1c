//! Transceiver insertion/removal watch.

use std::collections::BTreeMap;
use std::time::Duration;

use strum::{Display, IntoStaticStr};
use tokio::time::{Instant, sleep};

use super::Chassis;
use crate::tracing::prelude::*;

/// Change observed on one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum PortEvent {
    #[strum(serialize = "1")]
    Inserted,
    #[strum(serialize = "0")]
    Removed,
}

impl PortEvent {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Blank or unreadable EEPROM right after insertion means the module has not
/// really come up yet.
fn is_blank(data: &[u8]) -> bool {
    data.iter().all(|&b| b == 0xff) || data.iter().all(|&b| b == 0x00)
}

impl Chassis {
    /// Poll every port until at least one genuinely changes presence.
    ///
    /// A zero `timeout` waits forever. Otherwise `(false, {})` comes back
    /// once `timeout` has elapsed without a change. On a reported change all
    /// ports are reinitialised.
    pub async fn wait_for_change(&mut self, timeout: Duration) -> (bool, BTreeMap<usize, PortEvent>) {
        let start = Instant::now();

        loop {
            let events = self.poll_presence();
            if !events.is_empty() {
                for port in &mut self.transceivers {
                    port.reinit();
                }
                info!(changes = ?events, "Transceiver presence changed");
                return (true, events);
            }

            let wait = if timeout.is_zero() {
                self.tick
            } else {
                let elapsed = start.elapsed();
                if elapsed >= timeout {
                    return (false, BTreeMap::new());
                }
                (timeout - elapsed).min(self.tick)
            };
            sleep(wait).await;
        }
    }

    fn poll_presence(&mut self) -> BTreeMap<usize, PortEvent> {
        let mut events = BTreeMap::new();

        for (index, port) in self.transceivers.iter_mut().enumerate() {
            let present = port.presence();
            if present == self.presence[index] {
                continue;
            }
            self.presence.set(index, present);

            if !present {
                port.clear_eeprom_buffer();
                events.insert(index, PortEvent::Removed);
                continue;
            }

            match port.read_eeprom(0, 1) {
                Some(data) if !is_blank(&data) => {
                    events.insert(index, PortEvent::Inserted);
                }
                data => {
                    debug!(
                        port = index,
                        eeprom = %hex::encode(data.unwrap_or_default()),
                        "Ignoring insertion with blank EEPROM"
                    );
                    port.clear_eeprom_buffer();
                    self.presence.set(index, false);
                }
            }
        }

        events
    }
}
