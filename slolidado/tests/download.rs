//! Tests d'intégration du téléchargement contre un serveur HTTP local

mod common;

use std::path::Path;
use std::time::Duration;

use common::{area, Route, TestServer, GRID};
use slolidado::download::build_client;
use slolidado::{
    BatchDownloader, Config, DownloadError, DownloadOutcome, DownloadRequest, DownloadStatus,
    LidarDataDownloader, LidarDataType, LidarError, ProjectionRegistry, SloProjection, TileQuery,
};
use tokio_util::sync::CancellationToken;

const TILE_A: &str = "/lidar/dmr1/1/D96TM/TM1_A.txt";
const TILE_B: &str = "/lidar/dmr1/1/D96TM/TM1_B.txt";

/// Dossier de travail : grille, zones et dossier de sortie
struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("grid.geojson"), GRID).unwrap();
        std::fs::write(dir.path().join("area_a.geojson"), area(2.0, 2.0, 5.0, 5.0)).unwrap();
        std::fs::write(dir.path().join("area_ab.geojson"), area(5.0, 2.0, 15.0, 5.0)).unwrap();
        std::fs::write(dir.path().join("area_far.geojson"), area(500.0, 500.0, 600.0, 600.0)).unwrap();
        std::fs::create_dir(dir.path().join("out")).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }

    fn out(&self) -> std::path::PathBuf {
        self.path("out")
    }

    fn downloader(&self, server: &TestServer) -> LidarDataDownloader {
        let config = Config {
            base_url: server.url("/lidar"),
            fishnet_dir: self.path("fishnet"),
            jobs: 2,
            timeout_secs: 10,
            connect_timeout_secs: 5,
            ..Default::default()
        };
        LidarDataDownloader::new(config)
            .unwrap()
            .with_registry(
                ProjectionRegistry::new(&self.path("fishnet"))
                    .with_grid(SloProjection::D96TM, self.path("grid.geojson")),
            )
    }

    fn request(&self, area: &str) -> DownloadRequest {
        DownloadRequest::new(TileQuery::new(self.path(area)), self.out())
            .data_type(LidarDataType::DTM)
    }

    fn out_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.out())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn batch(server_timeout: Duration) -> BatchDownloader {
    let client = build_client(server_timeout, Duration::from_secs(5), "slolidado-test").unwrap();
    BatchDownloader::new(client)
}

#[tokio::test]
async fn test_download_single_tile() {
    let server = TestServer::start(vec![(TILE_A, Route::Body(b"dtm A".to_vec()))]).await;
    let ws = Workspace::new();

    let report = ws.downloader(&server).download(&ws.request("area_a.geojson")).await.unwrap();

    assert_eq!(server.requests(), [TILE_A]);
    assert_eq!(report.tiles, 1);
    assert_eq!(report.written, 1);
    assert_eq!(report.bytes, 5);
    assert_eq!(report.status, DownloadStatus::Success);
    assert_eq!(std::fs::read_to_string(ws.out().join("TM1_A.txt")).unwrap(), "dtm A");
    assert_eq!(ws.out_files(), ["TM1_A.txt"]);
}

#[tokio::test]
async fn test_empty_selection_makes_no_request() {
    let server = TestServer::start(vec![]).await;
    let ws = Workspace::new();

    let report = ws.downloader(&server).download(&ws.request("area_far.geojson")).await.unwrap();

    assert!(server.requests().is_empty());
    assert_eq!(report.status, DownloadStatus::NoTiles);
    assert!(ws.out_files().is_empty());
}

#[tokio::test]
async fn test_second_run_skips_existing_files() {
    let server = TestServer::start(vec![
        (TILE_A, Route::Body(b"A".to_vec())),
        (TILE_B, Route::Body(b"B".to_vec())),
    ])
    .await;
    let ws = Workspace::new();
    let downloader = ws.downloader(&server);
    let request = ws.request("area_ab.geojson");

    let first = downloader.download(&request).await.unwrap();
    assert_eq!(first.written, 2);
    assert_eq!(server.requests().len(), 2);

    let second = downloader.download(&request).await.unwrap();
    assert_eq!(second.skipped, 2);
    assert_eq!(second.written, 0);
    assert_eq!(second.status, DownloadStatus::Success);
    // Aucune nouvelle requête
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_overwrite_replaces_existing_file() {
    let server = TestServer::start(vec![(TILE_A, Route::Body(b"fresh".to_vec()))]).await;
    let ws = Workspace::new();
    std::fs::write(ws.out().join("TM1_A.txt"), "stale").unwrap();

    let request = ws.request("area_a.geojson").overwrite(true);
    let report = ws.downloader(&server).download(&request).await.unwrap();

    assert_eq!(report.written, 1);
    assert_eq!(server.requests(), [TILE_A]);
    assert_eq!(std::fs::read_to_string(ws.out().join("TM1_A.txt")).unwrap(), "fresh");
}

#[tokio::test]
async fn test_failed_url_does_not_block_others() {
    let server = TestServer::start(vec![
        ("/a/TM1_A.txt", Route::Body(b"A".to_vec())),
        ("/a/TM1_C.txt", Route::Body(b"C".to_vec())),
    ])
    .await;
    let ws = Workspace::new();
    let urls = vec![
        server.url("/a/TM1_A.txt"),
        server.url("/a/TM1_B.txt"),
        server.url("/a/TM1_C.txt"),
    ];

    let outcomes = batch(Duration::from_secs(10))
        .with_jobs(3)
        .download_all(&urls, &ws.out(), false)
        .await;

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(&outcomes[0], DownloadOutcome::Written { path, .. } if path.ends_with("TM1_A.txt")));
    match &outcomes[1] {
        DownloadOutcome::Failed {
            url,
            error: DownloadError::Status(status),
        } => {
            assert_eq!(url, &urls[1]);
            assert_eq!(status.as_u16(), 404);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(matches!(&outcomes[2], DownloadOutcome::Written { bytes: 1, .. }));
    assert_eq!(ws.out_files(), ["TM1_A.txt", "TM1_C.txt"]);
}

#[tokio::test]
async fn test_failure_is_reported_as_partial_success() {
    let server = TestServer::start(vec![
        (TILE_A, Route::Body(b"A".to_vec())),
        (TILE_B, Route::Status(500)),
    ])
    .await;
    let ws = Workspace::new();

    let report = ws.downloader(&server).download(&ws.request("area_ab.geojson")).await.unwrap();

    assert_eq!(report.status, DownloadStatus::PartialSuccess);
    assert_eq!(report.failed_urls(), [server.url(TILE_B)]);
    assert!(report.has_failures());
}

#[tokio::test]
async fn test_urls_sharing_a_file_name_run_in_order() {
    let server = TestServer::start(vec![
        ("/1/D96TM/TM1_A.txt", Route::Body(vec![b'A'; 10])),
        ("/2/D96TM/TM1_A.txt", Route::Body(vec![b'B'; 20])),
    ])
    .await;
    let ws = Workspace::new();
    let urls = vec![server.url("/1/D96TM/TM1_A.txt"), server.url("/2/D96TM/TM1_A.txt")];
    let downloader = batch(Duration::from_secs(10)).with_jobs(2);

    // Sans écrasement, la seconde URL trouve le fichier de la première
    let outcomes = downloader.download_all(&urls, &ws.out(), false).await;
    assert!(matches!(&outcomes[0], DownloadOutcome::Written { bytes: 10, .. }));
    assert!(matches!(&outcomes[1], DownloadOutcome::SkippedExisting { path } if path.ends_with("TM1_A.txt")));
    assert_eq!(server.requests(), ["/1/D96TM/TM1_A.txt"]);
    assert_eq!(std::fs::read(ws.out().join("TM1_A.txt")).unwrap(), vec![b'A'; 10]);

    // Avec écrasement, la dernière URL de la liste l'emporte
    let outcomes = downloader.download_all(&urls, &ws.out(), true).await;
    assert!(matches!(&outcomes[0], DownloadOutcome::Written { bytes: 10, .. }));
    assert!(matches!(&outcomes[1], DownloadOutcome::Written { bytes: 20, .. }));
    assert_eq!(
        server.requests(),
        ["/1/D96TM/TM1_A.txt", "/1/D96TM/TM1_A.txt", "/2/D96TM/TM1_A.txt"]
    );
    assert_eq!(std::fs::read(ws.out().join("TM1_A.txt")).unwrap(), vec![b'B'; 20]);
    assert_eq!(ws.out_files(), ["TM1_A.txt"]);
}

#[tokio::test]
async fn test_truncated_body_leaves_no_file() {
    let server = TestServer::start(vec![(
        "/a/TM1_A.txt",
        Route::Truncated {
            body: b"half".to_vec(),
            declared: 1000,
        },
    )])
    .await;
    let ws = Workspace::new();

    let outcomes = batch(Duration::from_secs(10))
        .download_all(&[server.url("/a/TM1_A.txt")], &ws.out(), false)
        .await;

    assert!(matches!(
        &outcomes[0],
        DownloadOutcome::Failed {
            error: DownloadError::Http(_),
            ..
        }
    ));
    assert!(ws.out_files().is_empty(), "{:?}", ws.out_files());
}

#[tokio::test]
async fn test_timeout_is_a_failed_outcome() {
    let server = TestServer::start(vec![("/a/TM1_A.txt", Route::Hang)]).await;
    let ws = Workspace::new();

    let outcomes = batch(Duration::from_millis(300))
        .download_all(&[server.url("/a/TM1_A.txt")], &ws.out(), false)
        .await;

    match &outcomes[0] {
        DownloadOutcome::Failed { error, .. } => assert!(error.is_timeout(), "{}", error),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(ws.out_files().is_empty());
}

#[tokio::test]
async fn test_cancel_removes_partial_file() {
    let server = TestServer::start(vec![(
        "/a/TM1_A.txt",
        Route::Stall {
            head: vec![b'x'; 64],
            declared: 4096,
        },
    )])
    .await;
    let ws = Workspace::new();
    let cancel = CancellationToken::new();
    let downloader = batch(Duration::from_secs(60)).with_cancellation(cancel.clone());

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let urls = vec![server.url("/a/TM1_A.txt"), server.url("/a/TM1_B.txt")];
    let outcomes = downloader.download_all(&urls, &ws.out(), false).await;

    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert!(outcome.is_failed());
        assert!(matches!(
            outcome,
            DownloadOutcome::Failed {
                error: DownloadError::Cancelled,
                ..
            }
        ));
    }
    // La seconde URL n'a jamais été demandée
    assert_eq!(server.requests(), ["/a/TM1_A.txt"]);
    assert!(ws.out_files().is_empty(), "{:?}", ws.out_files());
}

#[tokio::test]
async fn test_validation_happens_before_any_request() {
    let server = TestServer::start(vec![(TILE_A, Route::Body(b"A".to_vec()))]).await;
    let ws = Workspace::new();
    let downloader = ws.downloader(&server);

    let missing_output = DownloadRequest::new(
        TileQuery::new(ws.path("area_a.geojson")),
        ws.path("does-not-exist"),
    );
    let err = downloader.download(&missing_output).await.unwrap_err();
    assert!(matches!(err, LidarError::Configuration(ref msg) if msg.contains("does-not-exist")));

    // Grille D48GK absente du dossier des grilles
    let missing_grid = DownloadRequest::new(
        TileQuery::new(ws.path("area_a.geojson")).projection(SloProjection::D48GK),
        ws.out(),
    );
    let err = downloader.download(&missing_grid).await.unwrap_err();
    assert!(matches!(err, LidarError::Configuration(ref msg) if msg.contains("LIDAR_FISHNET_D48.shp")));

    assert!(server.requests().is_empty());
}

#[test]
fn test_target_path_is_last_segment() {
    let path = slolidado::download::target_path(
        "http://gis.arso.gov.si/lidar/gkot/laz/b_35/D96TM/TM_462_101.laz",
        Path::new("out"),
    )
    .unwrap();
    assert_eq!(path, Path::new("out/TM_462_101.laz"));
}
