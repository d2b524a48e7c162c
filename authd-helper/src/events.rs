//! The helper's single inbound queue. Two background threads feed it: one
//! blocks on `Framed::receive` over stdin, the other blocks on `waitpid` for
//! whichever session process is currently running. The main thread is the
//! only consumer, and the only one that ever calls `Framed::send` — so
//! there is exactly one writer and exactly one waiter of any given pid,
//! even though stdin reads and child reaping both block.

use std::sync::mpsc::Sender;
use std::thread;

use authproto::{sync::Framed, FramedMessage, ProtocolError};

pub enum HelperEvent {
    Message(FramedMessage),
    ChannelClosed,
    SessionExited,
}

/// Reads messages from stdin for as long as the broker keeps the pipe open.
pub fn spawn_reader(tx: Sender<HelperEvent>) {
    thread::spawn(move || {
        let mut framed = Framed::new(std::io::stdin());
        loop {
            match framed.receive() {
                Ok(msg) => {
                    if tx.send(HelperEvent::Message(msg)).is_err() {
                        return;
                    }
                }
                Err(ProtocolError::ChannelClosed) => {
                    let _ = tx.send(HelperEvent::ChannelClosed);
                    return;
                }
                Err(e) => {
                    log::warn!("protocol error reading from broker: {}", e);
                }
            }
        }
    });
}

/// Blocks on `waitpid(pid)` and reports back once, regardless of how the
/// child exited. The only thread allowed to reap `pid` — `End` handling
/// sends signals but never waits directly, to avoid two threads racing on
/// the same pid's exit status.
pub fn spawn_waiter(pid: i32, tx: Sender<HelperEvent>) {
    thread::spawn(move || {
        use nix::sys::wait::waitpid;
        use nix::unistd::Pid;
        loop {
            match waitpid(Pid::from_raw(pid), None) {
                Ok(_) => {
                    let _ = tx.send(HelperEvent::SessionExited);
                    return;
                }
                Err(nix::Error::Sys(nix::errno::Errno::EINTR)) => continue,
                Err(e) => {
                    log::warn!("waitpid({}) failed: {}", pid, e);
                    let _ = tx.send(HelperEvent::SessionExited);
                    return;
                }
            }
        }
    });
}
