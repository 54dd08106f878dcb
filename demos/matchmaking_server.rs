//! Matchmaking server - in-process dispatch example.
//!
//! This example demonstrates:
//! - Building a dispatcher from protocol builders
//! - Decoding a gathering out of an `AnyDataHolder` at the connection's version
//! - Answering calls, and `Core::NotImplemented` for methods left unset
//!
//! The transport engine is simulated: request frames are pushed into the
//! dispatcher's frame channel and responses are read back from the writer.
//!
//! ```text
//! cargo run --example matchmaking_server
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};

use nex_rmc::codec::{StreamOut, VersionContext};
use nex_rmc::handler::ClientHandle;
use nex_rmc::protocol::{build_request, ResponseBody};
use nex_rmc::protocols::matchmaking::{self, MatchmakingProtocol};
use nex_rmc::protocols::{AnyDataHolder, Gathering, GatheringKind, MatchmakeSession, NintendoManagementProtocol};
use nex_rmc::writer::ResponseWriter;
use nex_rmc::{Connection, DispatcherBuilder};

type Gatherings = Arc<Mutex<HashMap<u32, GatheringKind>>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let gatherings: Gatherings = Arc::new(Mutex::new(HashMap::new()));
    let store = gatherings.clone();

    let dispatcher = DispatcherBuilder::new()
        .protocol(MatchmakingProtocol::new().register_gathering(move |params, ctx| {
            let store = store.clone();
            async move {
                let params = match params {
                    Ok(p) => p,
                    Err(rejected) => {
                        println!("RegisterGathering rejected: {}", rejected.error);
                        return ctx.respond_error(0x0001_0001).await;
                    }
                };

                let gathering = match params.gathering.decode_gathering(ctx.version()) {
                    Ok(g) => g,
                    Err(e) => {
                        println!("bad gathering: {e}");
                        return ctx.respond_error(0x0001_0001).await;
                    }
                };

                let mut store = store.lock().await;
                let id = store.len() as u32 + 1;
                println!("registered gathering {id}: {:?}", gathering.gathering().description);
                store.insert(id, gathering);

                let mut out = StreamOut::new();
                out.write_u32(id);
                ctx.respond(out.freeze()).await
            }
        }))
        // Registered so its methods exist, but every handler is left unset.
        .protocol(NintendoManagementProtocol::new())
        .build();

    let (writer, mut responses) = ResponseWriter::channel(64);
    let conn = Connection::new(ClientHandle::new(1).with_pid(1001), VersionContext::new(3, 5, 0), writer);

    let (frames_tx, frames_rx) = mpsc::channel(16);
    let server = tokio::spawn(Arc::new(dispatcher).serve(frames_rx, conn));

    // A client registers a matchmake session.
    let session = MatchmakeSession {
        gathering: Gathering {
            owner_pid: 1001,
            host_pid: 1001,
            minimum_participants: 1,
            maximum_participants: 4,
            description: "friday setlist".to_string(),
            ..Gathering::default()
        },
        game_mode: 2,
        session_key: Bytes::from_static(b"demo-session-key"),
        ..MatchmakeSession::default()
    };
    let mut payload = StreamOut::new();
    payload.write_structure(&session, VersionContext::new(3, 5, 0));
    let mut params = StreamOut::new();
    AnyDataHolder::new("MatchmakeSession", payload.freeze()).write(&mut params);

    frames_tx
        .send(Bytes::from(build_request(
            matchmaking::PROTOCOL_ID,
            matchmaking::methods::REGISTER_GATHERING,
            1,
            &params.to_vec(),
        )))
        .await?;

    // Declared but unset: answered with Core::NotImplemented.
    frames_tx
        .send(Bytes::from(build_request(0x53, 2, 2, &[1, 2, 3, 4, 5, 6, 7])))
        .await?;

    drop(frames_tx);
    server.await?;

    for _ in 0..2 {
        let Some(response) = responses.recv().await else {
            break;
        };
        match response.body {
            ResponseBody::Success { method_id, data } => {
                println!("call {} ok (method {method_id:#x}, {} bytes)", response.call_id, data.len());
            }
            ResponseBody::Error { code } => {
                println!("call {} failed with {code:#010x}", response.call_id);
            }
        }
    }

    println!("{} gathering(s) stored", gatherings.lock().await.len());
    Ok(())
}
