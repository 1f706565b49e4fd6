use imsg_frame::{Conn, ImsgError};
use imsg_transport::UnixDomainSocket;

use crate::cmd::{install_ctrlc_handler, ListenArgs};
use crate::exit::{imsg_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    install_ctrlc_handler(args.path.clone())?;
    let listener =
        UnixDomainSocket::bind(&args.path).map_err(|err| transport_error("bind failed", err))?;

    let mut printed = 0usize;

    loop {
        let stream = listener
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        let mut conn = Conn::new(stream);
        if let Some((uid, gid, pid)) = conn.peer_credentials() {
            tracing::info!(uid, gid, pid, "peer connected");
        }

        loop {
            let msg = match conn.recv() {
                Ok(msg) => msg,
                Err(ImsgError::ConnectionClosed) => break,
                Err(err) => return Err(imsg_error("receive failed", err)),
            };

            if !wanted(args.types.as_deref(), msg.msg_type()) {
                continue;
            }

            print_message(&msg, format);
            printed = printed.saturating_add(1);

            if args.count.is_some_and(|count| printed >= count) {
                return Ok(SUCCESS);
            }
        }
    }
}

fn wanted(types: Option<&[u32]>, msg_type: u32) -> bool {
    types.is_none_or(|types| types.contains(&msg_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_filter_accepts_everything() {
        assert!(wanted(None, 0));
        assert!(wanted(None, u32::MAX));
    }

    #[test]
    fn filter_limits_types() {
        let types = [1, 5];
        assert!(wanted(Some(&types), 5));
        assert!(!wanted(Some(&types), 2));
    }
}
