//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises every client
//! operation over real HTTP through `UreqTransport`, including the failure
//! paths: error statuses, bad credentials, oversized bodies and unreadable
//! upload files.

use std::io::Write;
use std::net::SocketAddr;

use neogities_core::{
    ApiError, ClientConfig, Credentials, ErrorKind, NeocitiesClient, TransportError, UploadFile,
};

/// Start the mock server on a random port and return its address.
fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });
    addr
}

fn client_for(addr: SocketAddr) -> NeocitiesClient {
    NeocitiesClient::new(&format!("http://{addr}"))
}

fn key() -> Credentials {
    Credentials::new(mock_server::TEST_API_KEY)
}

#[test]
fn info_for_named_site() {
    let client = client_for(start_server());

    let info = client.info(Some(mock_server::OWNER_SITE)).unwrap();
    assert_eq!(info.sitename.as_deref(), Some("youpi"));
    assert_eq!(info.hits, 5072);
    assert_eq!(info.domain, None);
    assert_eq!(info.tags, vec!["art", "music"]);

    let neighbour = client.info(Some(mock_server::PUBLIC_SITE)).unwrap();
    assert_eq!(neighbour.domain.as_deref(), Some("neighbour.example"));
    assert!(neighbour.tags.is_empty());
}

#[test]
fn info_for_unknown_site_is_status_error() {
    let client = client_for(start_server());
    let err = client.info(Some("nobody-here")).unwrap_err();
    assert!(matches!(err, ApiError::Transport(TransportError::Status { status: 404 })));
}

#[test]
fn wrong_key_is_rejected_by_server() {
    let client = client_for(start_server());
    let err = client.list(Some(&Credentials::new("wrong")), None).unwrap_err();
    assert_eq!(err.http_status(), Some(403));
}

#[test]
fn upload_list_delete_lifecycle() {
    let client = client_for(start_server());

    // Step 1: list the seeded site.
    let list = client.list(Some(&key()), None).unwrap();
    assert_eq!(list.paths, vec!["images", "images/cat.png", "index.html", "not_found.html"]);

    // Step 2: upload two files, one into a directory with a space in its name.
    let mut page = tempfile::NamedTempFile::new().unwrap();
    page.write_all(b"<p>about</p>").unwrap();
    let mut notes = tempfile::NamedTempFile::new().unwrap();
    notes.write_all(b"hello notes").unwrap();

    let files = [
        UploadFile::new(page.path(), "about.html"),
        UploadFile::new(notes.path(), "docs/my notes.txt"),
    ];
    let text = client.upload(Some(&key()), &files).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["result"], "success");

    // Step 3: the files show up, and the path filter works.
    let list = client.list(Some(&key()), Some("docs")).unwrap();
    assert_eq!(list.paths, vec!["docs/my notes.txt"]);
    assert_eq!(list.count(), 1);

    // Step 4: delete them; the space in the name must survive encoding.
    let text = client
        .delete(Some(&key()), &["about.html", "docs/my notes.txt"])
        .unwrap();
    assert!(text.contains("file(s) have been deleted"), "{text}");

    // Step 5: deleting again fails with the server's 400.
    let err = client.delete(Some(&key()), &["about.html"]).unwrap_err();
    assert_eq!(err.http_status(), Some(400));

    // Step 6: back to the seeded listing.
    let list = client.list(Some(&key()), None).unwrap();
    assert_eq!(list.count(), 4);
}

#[test]
fn upload_of_missing_file_fails_locally() {
    let client = client_for(start_server());
    let files = [UploadFile::new("/no/such/file.html", "file.html")];
    let err = client.upload(Some(&key()), &files).unwrap_err();
    assert!(matches!(err, ApiError::Transport(TransportError::LocalFile { .. })));
}

#[test]
fn oversized_body_is_out_of_memory() {
    let addr = start_server();
    let client = NeocitiesClient::with_config(
        ClientConfig::new(&format!("http://{addr}")).with_max_response_bytes(16),
    );
    let err = client.list(Some(&key()), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfMemory);
}

#[test]
fn missing_credentials_fail_before_connecting() {
    // Nothing listens on this address; an auth error proves no connection was tried.
    let client = NeocitiesClient::new("http://127.0.0.1:9");
    let files = [UploadFile::new("/tmp/x", "x")];
    assert_eq!(client.upload(None, &files).unwrap_err().kind(), ErrorKind::Auth);
    assert_eq!(client.list(None, None).unwrap_err().kind(), ErrorKind::Auth);
    assert_eq!(
        client.delete(Some(&Credentials::new("")), &["x"]).unwrap_err().kind(),
        ErrorKind::Auth
    );
    assert_eq!(
        client.list(Some(&Credentials::new("clé")), None).unwrap_err().kind(),
        ErrorKind::Auth
    );
}
