//! Shared fixtures for integration tests
//!
//! Stand-ins for the external tools: `cat` replays a dependency stream as if
//! it were the parser, and a one-shot TCP server plays the frame tagger.

#![allow(dead_code)]

use annograph::config::{SocketConfig, StreamingConfig};
use std::io::Write;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// "Troops attacked the city", dependent first, one sentence
pub const ATTACK_STREAM: &str = "\
troop|Troops|0|6|_|_|noun(de,count,pl)|hd/su|attack|attacked|7|15|_|_|verb(past)|1
city|city|20|24|_|_|noun(de,count,sg)|hd/obj1|attack|attacked|7|15|_|_|verb(past)|1
";

/// Tagger output for the sentence above: an Attack frame on "attacked"
pub const ATTACK_RECORD: &str = r#"{"frames":[{"target":{"name":"Attack","spans":[{"start":1,"end":2,"text":"attacked"}]},"annotationSets":[{"rank":0,"score":12.5,"frameElements":[]}]}],"tokens":["Troops","attacked","city"]}"#;

/// A parser that echoes its input
pub fn replay_parser() -> StreamingConfig {
    StreamingConfig {
        command: "cat".to_string(),
    }
}

/// One-shot tagger: returns its config and a handle yielding the request it received.
pub async fn fake_tagger(reply: &'static str) -> (SocketConfig, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = String::new();
        socket.read_to_string(&mut request).await.unwrap();
        socket.write_all(reply.as_bytes()).await.unwrap();
        socket.write_all(b"\n").await.unwrap();
        request
    });

    let config = SocketConfig {
        host: "127.0.0.1".to_string(),
        port,
        timeout_secs: 5,
    };
    (config, server)
}

/// Write `content` to a temp file whose name ends in `suffix`.
pub fn temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}
