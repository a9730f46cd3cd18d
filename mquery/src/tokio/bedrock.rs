//! Unconnected ping/pong exchange.

use std::time::{SystemTime, UNIX_EPOCH};

use super::Transport;
use crate::{BedrockResponse, Error, bedrock::OFFLINE_MESSAGE_DATA_ID};

const UNCONNECTED_PING_ID: u8 = 0x01;
const UNCONNECTED_PONG_ID: u8 = 0x1c;

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since| i64::try_from(since.as_millis()).unwrap_or(i64::MAX))
}

/// Sends one unconnected ping and parses the pong that answers it.
///
/// The caller owns closing the transport.
pub(crate) async fn exchange<T: Transport>(
    transport: &mut T,
    client_guid: u64,
) -> Result<BedrockResponse, Error> {
    transport.write_u8(UNCONNECTED_PING_ID);
    transport.write_i64(now_millis());
    transport.write_bytes(OFFLINE_MESSAGE_DATA_ID);
    transport.write_u64(client_guid);
    transport.flush().await?;

    let id = transport.read_u8().await?;
    if id != UNCONNECTED_PONG_ID {
        return Err(Error::InvalidPacket {
            expected: UNCONNECTED_PONG_ID.into(),
            received: id.into(),
        });
    }
    let _ping_time = transport.read_i64().await?;
    let server_guid = transport.read_u64().await?;
    let _magic = transport.read_bytes(OFFLINE_MESSAGE_DATA_ID.len()).await?;
    let len = transport.read_u16().await?;
    let payload = transport.read_string_exact(len.into()).await?;
    trace!(server_guid, %payload, "unconnected pong");
    Ok(BedrockResponse::extract(&payload, server_guid))
}
