use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use imsg_frame::Message;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput {
    msg_type: u32,
    length: u16,
    flags: u16,
    peer_id: u32,
    pid: u32,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

impl From<&Message> for MessageOutput {
    fn from(msg: &Message) -> Self {
        Self {
            msg_type: msg.msg_type(),
            length: msg.header.length,
            flags: msg.flags(),
            peer_id: msg.peer_id(),
            pid: msg.pid(),
            payload_size: msg.payload.len(),
            payload: payload_preview(msg.payload.as_ref()),
            timestamp: now_unix_seconds(),
        }
    }
}

pub fn print_message(msg: &Message, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput::from(msg);
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "FLAGS", "PEER", "PID", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    msg.msg_type().to_string(),
                    format!("{:#06x}", msg.flags()),
                    msg.peer_id().to_string(),
                    msg.pid().to_string(),
                    msg.payload.len().to_string(),
                    payload_preview(msg.payload.as_ref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "type={} flags={:#06x} peer={} pid={} size={} payload={}",
                msg.msg_type(),
                msg.flags(),
                msg.peer_id(),
                msg.pid(),
                msg.payload.len(),
                payload_preview(msg.payload.as_ref())
            );
        }
        OutputFormat::Raw => {
            let mut out = std::io::stdout();
            let _ = out.write_all(msg.payload.as_ref());
            let _ = out.flush();
        }
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
