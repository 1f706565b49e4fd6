use std::fs;

use imsg_frame::{Conn, ConnConfig};
use imsg_transport::UnixDomainSocket;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{imsg_error, io_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;

    let stream = UnixDomainSocket::connect(&args.path)
        .map_err(|err| transport_error("connect failed", err))?;
    let config = ConnConfig {
        read_timeout: args.wait.then_some(wait_timeout),
        ..ConnConfig::default()
    };
    let mut conn =
        Conn::with_config_ipc(stream, config).map_err(|err| imsg_error("connect failed", err))?;

    conn.send(args.msg_type, args.flags, args.peer_id, &payload)
        .map_err(|err| imsg_error("send failed", err))?;
    tracing::debug!(
        msg_type = args.msg_type,
        size = payload.len(),
        "message sent"
    );

    if args.wait {
        let reply = conn.recv().map_err(|err| imsg_error("receive failed", err))?;
        print_message(&reply, format);
    }

    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.as_bytes().to_vec());
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}
