//! Response dispatcher
//!
//! One operation gets one background listener. The listener decodes every
//! inbound datagram, classifies each frame against the armed operation, and
//! delivers the first terminal outcome through a one-shot channel. The
//! channel's sender moves out of its slot on delivery, so a second terminal
//! frame has nothing left to deliver through; duplicates are logged and
//! dropped rather than double-reported.
//!
//! Arm the dispatcher *before* sending the request. The kernel can answer
//! faster than the sender returns, and a reply that arrives unarmed would
//! be lost.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use hwsim_proto::wire::MessageIter;
use hwsim_proto::{classify_reply, Classified, OperationKind, Outcome};

use crate::link::LinkRx;

/// A listener armed for exactly one in-flight operation
pub struct ArmedDispatcher {
    outcome: oneshot::Receiver<Outcome>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Spawn the listener for the operation sent under `seq`.
pub fn arm(rx: Box<dyn LinkRx>, kind: OperationKind, seq: u32) -> ArmedDispatcher {
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(listen(rx, kind, seq, outcome_tx, shutdown_rx));
    ArmedDispatcher {
        outcome: outcome_rx,
        shutdown: shutdown_tx,
        task,
    }
}

async fn listen(
    mut rx: Box<dyn LinkRx>,
    kind: OperationKind,
    seq: u32,
    outcome: oneshot::Sender<Outcome>,
    mut shutdown: oneshot::Receiver<()>,
) {
    // The sender moves out of the slot on first delivery; once taken,
    // nothing can deliver again.
    let mut slot = Some(outcome);
    loop {
        let datagram = tokio::select! {
            _ = &mut shutdown => return,
            received = rx.recv_frame() => match received {
                Ok(datagram) => datagram,
                Err(e) => {
                    warn!("Control channel failed while listening: {}", e);
                    return;
                }
            },
        };
        trace!("Received {} byte datagram", datagram.len());
        for message in MessageIter::new(&datagram) {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    warn!("Skipping malformed frame: {}", e);
                    break;
                }
            };
            match classify_reply(&message, kind, seq) {
                Classified::Terminal(result) => match slot.take() {
                    Some(sender) => {
                        // the receiver may already be gone if the deadline passed
                        let _ = sender.send(result);
                    }
                    None => debug!("Dropping duplicate terminal frame: {:?}", result),
                },
                Classified::Ignored(reason) => debug!("Ignoring frame: {}", reason),
            }
        }
        if slot.is_none() {
            return;
        }
    }
}

impl ArmedDispatcher {
    /// Wait for the terminal outcome, reporting [`Outcome::TimedOut`] if
    /// none arrives within `deadline`.
    ///
    /// Stops and joins the listener on every path, so no listener outlives
    /// the operation it was armed for. A timeout leaves the request's fate
    /// unknown; whatever the kernel did stays done.
    pub async fn settle(self, deadline: Duration) -> Outcome {
        let ArmedDispatcher {
            outcome,
            shutdown,
            task,
        } = self;
        match tokio::time::timeout(deadline, outcome).await {
            Ok(Ok(result)) => {
                join_listener(task).await;
                result
            }
            Ok(Err(_)) => {
                warn!("Listener stopped before any terminal frame");
                join_listener(task).await;
                Outcome::TimedOut
            }
            Err(_) => {
                debug!("No terminal frame within {:?}", deadline);
                let _ = shutdown.send(());
                join_listener(task).await;
                Outcome::TimedOut
            }
        }
    }
}

async fn join_listener(task: JoinHandle<()>) {
    if let Err(e) = task.await {
        warn!("Listener task failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use tokio::sync::mpsc;

    use hwsim_proto::wire::{build_status_frame, NlHeader, NLM_F_ACK, NLM_F_REQUEST};

    struct ScriptedRx {
        frames: mpsc::Receiver<io::Result<Vec<u8>>>,
    }

    #[async_trait::async_trait]
    impl LinkRx for ScriptedRx {
        async fn recv_frame(&mut self) -> io::Result<Vec<u8>> {
            match self.frames.recv().await {
                Some(result) => result,
                None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "script over")),
            }
        }
    }

    fn scripted() -> (mpsc::Sender<io::Result<Vec<u8>>>, Box<ScriptedRx>) {
        let (tx, rx) = mpsc::channel(8);
        (tx, Box::new(ScriptedRx { frames: rx }))
    }

    fn status_frame(code: i32, seq: u32) -> Vec<u8> {
        let request = NlHeader {
            len: 0,
            ty: 0x21,
            flags: NLM_F_REQUEST | NLM_F_ACK,
            seq,
            pid: 0,
        };
        build_status_frame(code, &request)
    }

    #[tokio::test]
    async fn first_terminal_frame_settles_the_operation() {
        let (tx, rx) = scripted();
        let armed = arm(rx, OperationKind::Delete, 2);
        tx.send(Ok(status_frame(0, 2))).await.unwrap();

        let outcome = armed.settle(Duration::from_secs(1)).await;
        assert_eq!(outcome, Outcome::Deleted);
    }

    #[tokio::test]
    async fn duplicate_frames_in_one_datagram_deliver_once() {
        let (tx, rx) = scripted();
        let armed = arm(rx, OperationKind::Delete, 2);

        let mut datagram = status_frame(0, 2);
        datagram.extend_from_slice(&status_frame(-19, 2));
        tx.send(Ok(datagram)).await.unwrap();

        let outcome = armed.settle(Duration::from_secs(1)).await;
        assert_eq!(outcome, Outcome::Deleted);
    }

    #[tokio::test]
    async fn foreign_frames_do_not_settle() {
        let (tx, rx) = scripted();
        let armed = arm(rx, OperationKind::Delete, 2);

        tx.send(Ok(status_frame(0, 9))).await.unwrap();
        tx.send(Ok(status_frame(-19, 2))).await.unwrap();

        let outcome = armed.settle(Duration::from_secs(1)).await;
        assert_eq!(
            outcome,
            Outcome::Failed {
                kernel_error_code: -19
            }
        );
    }

    #[tokio::test]
    async fn silence_until_the_deadline_times_out() {
        let (tx, rx) = scripted();
        let armed = arm(rx, OperationKind::SetSignal, 2);

        let outcome = armed.settle(Duration::from_millis(50)).await;
        assert_eq!(outcome, Outcome::TimedOut);

        // the listener is gone; a late frame has nowhere to go
        assert!(tx.send(Ok(status_frame(0, 2))).await.is_err());
    }

    #[tokio::test]
    async fn channel_failure_leaves_the_fate_unknown() {
        let (tx, rx) = scripted();
        let armed = arm(rx, OperationKind::Create, 2);
        tx.send(Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")))
            .await
            .unwrap();

        let outcome = armed.settle(Duration::from_secs(5)).await;
        assert_eq!(outcome, Outcome::TimedOut);
    }
}
