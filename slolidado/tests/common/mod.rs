//! Serveur HTTP minimal pour les tests de téléchargement

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Réponse associée à un chemin
#[derive(Clone)]
pub enum Route {
    /// 200 avec ce corps
    Body(Vec<u8>),
    /// Code d'erreur sans corps
    Status(u16),
    /// Annonce `declared` octets, envoie `body` puis ferme
    Truncated { body: Vec<u8>, declared: usize },
    /// Envoie les en-têtes et un début de corps, puis ne répond plus
    Stall { head: Vec<u8>, declared: usize },
    /// N'envoie jamais de réponse
    Hang,
}

pub struct TestServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&str, Route)>) -> Self {
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_string(), route))
                .collect(),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    handle_connection(stream, &routes, &recorded).await;
                });
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    /// URL absolue d'un chemin du serveur
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Chemins demandés, dans l'ordre d'arrivée
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    routes: &HashMap<String, Route>,
    requests: &Mutex<Vec<String>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&buf);
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    requests.lock().unwrap().push(path.clone());

    let route = routes.get(&path).cloned().unwrap_or(Route::Status(404));
    match route {
        Route::Body(body) => {
            write_head(&mut stream, 200, body.len()).await;
            let _ = stream.write_all(&body).await;
        }
        Route::Status(code) => {
            write_head(&mut stream, code, 0).await;
        }
        Route::Truncated { body, declared } => {
            write_head(&mut stream, 200, declared).await;
            let _ = stream.write_all(&body).await;
        }
        Route::Stall { head, declared } => {
            write_head(&mut stream, 200, declared).await;
            let _ = stream.write_all(&head).await;
            let _ = stream.flush().await;
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Route::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
    let _ = stream.shutdown().await;
}

async fn write_head(stream: &mut TcpStream, code: u16, length: usize) {
    let reason = match code {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        code, reason, length
    );
    let _ = stream.write_all(head.as_bytes()).await;
}

/// Grille de test : deux dalles 10x10, `{1,A}` et `{1,B}`, en EPSG:3794
pub const GRID: &str = r#"{
    "type": "FeatureCollection",
    "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3794"}},
    "features": [
        {"type": "Feature", "properties": {"BLOK": 1, "NAME": "A"},
         "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
        {"type": "Feature", "properties": {"BLOK": 1, "NAME": "B"},
         "geometry": {"type": "Polygon", "coordinates": [[[10,0],[20,0],[20,10],[10,10],[10,0]]]}}
    ]
}"#;

/// Zone en EPSG:3794 avec un seul polygone
pub fn area(x0: f64, y0: f64, x1: f64, y1: f64) -> String {
    format!(
        r#"{{
    "type": "FeatureCollection",
    "crs": {{"type": "name", "properties": {{"name": "EPSG:3794"}}}},
    "features": [
        {{"type": "Feature", "properties": {{"id": 1}},
         "geometry": {{"type": "Polygon", "coordinates": [[[{x0},{y0}],[{x1},{y0}],[{x1},{y1}],[{x0},{y1}],[{x0},{y0}]]]}}}}
    ]
}}"#
    )
}
