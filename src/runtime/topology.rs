use crossbeam_channel::{Receiver, Sender};

use crate::controller::events::RunEvent;

pub struct RuntimeTopology {
    pub run_event_tx: Sender<RunEvent>,
    pub run_event_rx: Receiver<RunEvent>,
}

impl RuntimeTopology {
    pub fn new() -> Self {
        let (run_event_tx, run_event_rx) = crossbeam_channel::unbounded();

        Self {
            run_event_tx,
            run_event_rx,
        }
    }
}

impl Default for RuntimeTopology {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::RuntimeTopology;
    use crate::controller::events::RunEvent;

    #[test]
    fn channels_round_trip_messages() {
        let topology = RuntimeTopology::new();

        topology
            .run_event_tx
            .send(RunEvent::Reset)
            .expect("send event");
        let event = topology.run_event_rx.recv().expect("recv event");
        assert!(matches!(event, RunEvent::Reset));
    }
}
