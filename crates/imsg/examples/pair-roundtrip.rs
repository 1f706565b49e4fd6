//! Parent/child round trip over a socket pair.
//!
//! Run with:
//!   cargo run --example pair-roundtrip

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::thread;

    use imsg::{pair, Conn};

    const MSG_PING: u32 = 1;
    const MSG_PONG: u32 = 2;

    let (parent, child) = pair()?;
    let mut parent = Conn::new(parent);
    let mut child = Conn::new(child);

    // Worker side: answer every ping until the parent hangs up.
    let worker = thread::spawn(move || -> imsg::frame::Result<u32> {
        let mut answered = 0;
        loop {
            let msg = match child.recv() {
                Ok(msg) => msg,
                Err(imsg::ImsgError::ConnectionClosed) => return Ok(answered),
                Err(err) => return Err(err),
            };
            if msg.msg_type() == MSG_PING {
                child.send(MSG_PONG, 0, msg.peer_id(), &msg.payload)?;
                answered += 1;
            }
        }
    });

    for peer_id in 0..3u32 {
        let body = format!("ping #{peer_id}");
        parent.send(MSG_PING, 0, peer_id, body.as_bytes())?;

        let reply = parent.recv()?;
        eprintln!(
            "type={} peer_id={} pid={} payload={:?}",
            reply.msg_type(),
            reply.peer_id(),
            reply.pid(),
            String::from_utf8_lossy(&reply.payload)
        );
    }

    drop(parent);
    let answered = worker.join().map_err(|_| "worker panicked")??;
    eprintln!("worker answered {answered} pings");
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("pair-roundtrip needs Unix domain sockets");
}
