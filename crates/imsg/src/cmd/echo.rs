use imsg_frame::{Conn, ImsgError};
use imsg_transport::UnixDomainSocket;

use crate::cmd::{install_ctrlc_handler, EchoArgs};
use crate::exit::{imsg_error, transport_error, CliError, CliResult};

enum RecvErrorDisposition {
    Disconnect,
    Fatal(CliError),
}

pub fn run(args: EchoArgs) -> CliResult<i32> {
    install_ctrlc_handler(args.path.clone())?;
    let listener =
        UnixDomainSocket::bind(&args.path).map_err(|err| transport_error("bind failed", err))?;

    loop {
        let stream = listener
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        let mut conn = Conn::new(stream);

        loop {
            let msg = match conn.recv() {
                Ok(msg) => msg,
                Err(err) => match classify_recv_error(err) {
                    RecvErrorDisposition::Disconnect => break,
                    RecvErrorDisposition::Fatal(cli_err) => return Err(cli_err),
                },
            };

            tracing::info!(
                msg_type = msg.msg_type(),
                peer_id = msg.peer_id(),
                pid = msg.pid(),
                size = msg.payload.len(),
                "echoing message"
            );

            let sent = conn.send(msg.msg_type(), msg.flags(), msg.peer_id(), &msg.payload);
            if let Err(err) = sent {
                tracing::warn!(error = %err, "echo send failed; dropping connection");
                break;
            }
        }
    }
}

/// A misbehaving client loses its connection; the server keeps accepting.
fn classify_recv_error(err: ImsgError) -> RecvErrorDisposition {
    match err {
        ImsgError::ConnectionClosed => RecvErrorDisposition::Disconnect,
        ImsgError::Truncated { .. }
        | ImsgError::InvalidLength { .. }
        | ImsgError::Format { .. } => {
            tracing::warn!(error = %err, "dropping connection");
            RecvErrorDisposition::Disconnect
        }
        other => RecvErrorDisposition::Fatal(imsg_error("receive failed", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_connection_disconnects() {
        let disposition = classify_recv_error(ImsgError::ConnectionClosed);
        assert!(matches!(disposition, RecvErrorDisposition::Disconnect));
    }

    #[test]
    fn malformed_frame_disconnects() {
        let disposition = classify_recv_error(ImsgError::InvalidLength { length: 3 });
        assert!(matches!(disposition, RecvErrorDisposition::Disconnect));

        let disposition = classify_recv_error(ImsgError::Truncated {
            expected: 20,
            received: 16,
        });
        assert!(matches!(disposition, RecvErrorDisposition::Disconnect));
    }

    #[test]
    fn stream_error_is_fatal() {
        let disposition = classify_recv_error(ImsgError::Io(std::io::Error::from(
            std::io::ErrorKind::PermissionDenied,
        )));
        assert!(matches!(
            disposition,
            RecvErrorDisposition::Fatal(CliError { code: crate::exit::PERMISSION_DENIED, .. })
        ));
    }
}
