//! # Renderer Bridge
//!
//! Line-delimited JSON over stdin/stdout. Each inbound line is either a renderer call
//! or a control message from the window system; every outbound line is a reply or an
//! event. Inbound lines are handled concurrently, so a lifecycle acknowledgment can
//! arrive while a suspend is still waiting for it.

use crate::headless::HeadlessShell;
use serde::Deserialize;
use serde_json::{Value, json};
use shub_boundary::{Boundary, BoundaryError, IpcValue, RendererSurface, ResourceType, ResponseHeaders};
use shub_vault::Keystore;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const OUTBOUND_CAPACITY: usize = 256;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Inbound {
    Call {
        id: Value,
        channel: String,
        #[serde(default)]
        args: Vec<Value>,
        #[serde(default)]
        sync: bool,
    },
    Host(HostControl),
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "host", rename_all = "kebab-case")]
pub(crate) enum HostControl {
    Navigate {
        url: String,
        #[serde(default)]
        resource: Option<String>,
    },
    Suspend,
    Resume,
    Quit,
}

/// Queues protocol lines for the stdout writer.
#[derive(Debug, Clone)]
pub(crate) struct Outbox {
    tx: mpsc::Sender<Value>,
}

impl Outbox {
    /// Waits for queue space; lines are dropped only once the writer has stopped.
    async fn push(&self, line: Value) {
        if self.tx.send(line).await.is_err() {
            warn!("Stdout writer stopped; outbound line dropped");
        }
    }
}

/// Delivers lifecycle requests as `{"event": <channel>, "payload": ...}` lines.
#[derive(Debug)]
pub(crate) struct StdoutSurface {
    outbox: Outbox,
}

impl RendererSurface for StdoutSurface {
    fn send(&self, channel: &str, payload: Value) -> Result<(), BoundaryError> {
        self.outbox
            .tx
            .try_send(json!({ "event": channel, "payload": payload }))
            .map_err(|e| BoundaryError::host(format!("renderer unreachable: {e}")))
    }
}

/// Starts the stdout writer and returns its outbox.
pub(crate) fn spawn_writer() -> Outbox {
    let (tx, mut rx) = mpsc::channel::<Value>(OUTBOUND_CAPACITY);
    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            let mut bytes = line.to_string().into_bytes();
            bytes.push(b'\n');
            if let Err(e) = stdout.write_all(&bytes).await.and(stdout.flush().await) {
                error!(error = %e, "Failed to write to stdout");
                break;
            }
        }
    });
    Outbox { tx }
}

pub(crate) fn surface(outbox: &Outbox) -> Arc<dyn RendererSurface> {
    Arc::new(StdoutSurface { outbox: outbox.clone() })
}

/// Serves stdin until it closes or the renderer asks to quit.
pub(crate) async fn serve<K: Keystore>(
    boundary: Arc<Boundary<K, HeadlessShell>>,
    outbox: Outbox,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shell = Arc::clone(boundary.host());

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = shell.exit_requested() => {
                info!("Exit requested");
                break;
            }
        };
        let Some(line) = line else {
            info!("Renderer bridge closed");
            boundary.detach_renderer();
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let boundary = Arc::clone(&boundary);
        let outbox = outbox.clone();
        tokio::spawn(async move { dispatch(&boundary, &outbox, &line).await });
    }
    Ok(())
}

async fn dispatch<K: Keystore>(boundary: &Boundary<K, HeadlessShell>, outbox: &Outbox, line: &str) {
    let inbound = match serde_json::from_str::<Inbound>(line) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!(error = %e, "Malformed bridge line");
            outbox
                .push(json!({ "id": Value::Null, "ok": false, "error": format!("malformed message: {e}") }))
                .await;
            return;
        },
    };

    match inbound {
        Inbound::Call { id, channel, args, sync } => {
            let args: Vec<IpcValue> = args.into_iter().map(IpcValue::from_wire).collect();
            let reply = if sync {
                Ok(boundary.invoke_sync(&channel, &args))
            } else {
                boundary.invoke(&channel, &args).await
            };
            let line = match reply {
                Ok(result) => json!({ "id": id, "ok": true, "result": result }),
                Err(e) => json!({ "id": id, "ok": false, "error": e.to_string() }),
            };
            outbox.push(line).await;
        },
        Inbound::Host(control) => host_control(boundary, outbox, control).await,
    }
}

async fn host_control<K: Keystore>(
    boundary: &Boundary<K, HeadlessShell>,
    outbox: &Outbox,
    control: HostControl,
) {
    debug!(?control, "Host control message");
    match control {
        HostControl::Navigate { url, resource } => {
            if let Err(e) = boundary.on_navigation_start() {
                error!(error = %e, "Nonce rotation failed; keeping the previous nonce");
            }
            let resource = ResourceType::parse(resource.as_deref().unwrap_or("main-frame"));
            let mut headers = ResponseHeaders::new();
            match boundary.intercept_response(&url, resource, &mut headers) {
                Ok(true) => {
                    outbox.push(json!({ "event": "response-headers", "url": url, "headers": headers })).await;
                },
                Ok(false) => {},
                Err(e) => error!(error = %e, %url, "Content security policy could not be built"),
            }
        },
        HostControl::Suspend => {
            boundary.suspend().await;
        },
        HostControl::Resume => {
            boundary.resume().await;
        },
        HostControl::Quit => {
            boundary.before_quit().await;
            boundary.host().request_exit();
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_lines_parse() {
        let line = r#"{"id":7,"channel":"store-get","args":["app.theme"]}"#;
        match serde_json::from_str::<Inbound>(line).unwrap() {
            Inbound::Call { id, channel, args, sync } => {
                assert_eq!(id, json!(7));
                assert_eq!(channel, "store-get");
                assert_eq!(args, vec![json!("app.theme")]);
                assert!(!sync);
            },
            Inbound::Host(other) => panic!("parsed as host control: {other:?}"),
        }
    }

    #[test]
    fn test_host_lines_parse() {
        let parse = |line: &str| match serde_json::from_str::<Inbound>(line).unwrap() {
            Inbound::Host(control) => control,
            Inbound::Call { .. } => panic!("parsed as a call"),
        };
        assert_eq!(parse(r#"{"host":"suspend"}"#), HostControl::Suspend);
        assert_eq!(
            parse(r#"{"host":"navigate","url":"app://index.html"}"#),
            HostControl::Navigate { url: "app://index.html".into(), resource: None }
        );
    }

    #[test]
    fn test_unknown_host_message_is_rejected() {
        assert!(serde_json::from_str::<Inbound>(r#"{"host":"format-disk"}"#).is_err());
    }

    #[tokio::test]
    async fn test_full_outbox_holds_replies_until_drained() {
        let (tx, mut rx) = mpsc::channel(1);
        let outbox = Outbox { tx };
        let pending = tokio::spawn({
            let outbox = outbox.clone();
            async move {
                for id in 0..3 {
                    outbox.push(json!({ "id": id, "ok": true, "result": true })).await;
                }
            }
        });

        for id in 0..3 {
            assert_eq!(rx.recv().await.unwrap()["id"], json!(id));
        }
        pending.await.unwrap();
    }

    #[tokio::test]
    async fn test_surface_emits_event_lines() {
        let (tx, mut rx) = mpsc::channel(4);
        let surface = StdoutSurface { outbox: Outbox { tx } };
        surface.send("system-lifecycle", json!({"action": "resume"})).unwrap();
        assert_eq!(rx.recv().await.unwrap(), json!({"event": "system-lifecycle", "payload": {"action": "resume"}}));
    }
}
