//! Stub upstream servers for exercising the HTTP clients against real sockets.

use axum::Router;
use tokio::{net::TcpListener, task::JoinHandle};

/// A stub upstream server running on a random local port.
///
/// The server is shut down when this is dropped.
pub(crate) struct StubUpstream {
    /// The base URL of the server, e.g. "http://127.0.0.1:51234".
    pub base_url: String,
    task: JoinHandle<()>,
}

impl Drop for StubUpstream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serve `router` on a random port on the loopback interface.
pub(crate) async fn spawn_stub_upstream(router: Router) -> StubUpstream {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Could not bind stub upstream listener");
    let addr = listener
        .local_addr()
        .expect("Could not get stub upstream address");

    let task = tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Stub upstream server failed");
    });

    StubUpstream {
        base_url: format!("http://{addr}"),
        task,
    }
}

/// A URL on the loopback interface that nothing is listening on.
pub(crate) async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Could not bind listener");
    let addr = listener.local_addr().expect("Could not get address");
    drop(listener);

    format!("http://{addr}")
}
