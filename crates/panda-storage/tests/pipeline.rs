use std::sync::Arc;

use mockito::{Matcher, ServerGuard};
use uuid::Uuid;

use panda_core::constants::PANDA_ENGINE_TYPE;
use panda_core::models::JobState;
use panda_core::{CommitHooks, Config, PandaSettings};
use panda_db::memory::InMemoryMediaFileRepository;
use panda_db::MediaFileRepository;
use panda_storage::{EngineRegistry, PandaStorage, RemoteUrlStorage};

const SOURCE_URL: &str = "http://cdn.example.com/uploads/Holiday_2011.mov";

struct Fixture {
    server: ServerGuard,
    repository: InMemoryMediaFileRepository,
    registry: EngineRegistry,
    panda: Arc<PandaStorage>,
}

async fn fixture() -> Fixture {
    let server = mockito::Server::new_async().await;
    let config = Config {
        settings: PandaSettings {
            cloud_id: "cloud1".to_string(),
            access_key: "access".to_string(),
            secret_key: "secret".to_string(),
            api_host: Some(server.url()),
            profiles: vec!["h264".to_string(), "iphone_and_ipad".to_string()],
            s3_bucket_name: "videos".to_string(),
            cloudfront_download_uri: Some("d1.cloudfront.net".to_string()),
            cloudfront_streaming_uri: None,
        },
        state_update_url: Some("https://cms.example.com/panda/update/{file_id}".to_string()),
        http_timeout_secs: 5,
        database_url: None,
        environment: "test".to_string(),
    };

    let repository = InMemoryMediaFileRepository::new();
    let panda = Arc::new(PandaStorage::from_config(&config, Arc::new(repository.clone())).unwrap());
    let registry = EngineRegistry::new(Arc::new(repository.clone()));
    registry.register(panda.clone()).await;
    registry.register(Arc::new(RemoteUrlStorage::new())).await;

    Fixture {
        server,
        repository,
        registry,
        panda,
    }
}

async fn mock_profiles(server: &mut ServerGuard) {
    server
        .mock("GET", "/v2/profiles.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"id":"p1","name":"h264"},{"id":"p2","name":"iphone_and_ipad"},{"id":"p3","name":"webm"}]"#)
        .create_async()
        .await;
}

#[tokio::test]
async fn upload_transcode_and_harvest() {
    let mut fx = fixture().await;
    mock_profiles(&mut fx.server).await;

    let media_id = Uuid::new_v4();
    let source = fx.registry.add_media_file(media_id, SOURCE_URL).await.unwrap();
    assert_eq!(source.storage_engine, "RemoteURLStorage");

    let submit = fx
        .server
        .mock("POST", "/v2/videos.json")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("source_url".into(), SOURCE_URL.into()),
            Matcher::UrlEncoded("profiles".into(), "p1,p2".into()),
            Matcher::UrlEncoded(
                "state_update_url".into(),
                format!("https://cms.example.com/panda/update/{}", source.id),
            ),
        ]))
        .with_status(201)
        .with_body(r#"{"id":"v1","status":"processing"}"#)
        .expect(1)
        .create_async()
        .await;

    let mut hooks = CommitHooks::new();
    let accepted = fx.registry.transcode_all(&source, &mut hooks).await.unwrap();
    assert_eq!(accepted, 1);
    // Nothing is sent before the commit.
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks.run().await, 0);
    submit.assert_async().await;
    assert_eq!(
        fx.repository.list_associations(source.id).await.unwrap(),
        vec!["v1"]
    );

    fx.server
        .mock("GET", "/v2/videos/v1.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id":"v1","status":"success","extname":".mov","width":1280,"height":720,"duration":61000}"#)
        .create_async()
        .await;
    fx.server
        .mock("GET", "/v2/encodings.json")
        .match_query(Matcher::UrlEncoded("video_id".into(), "v1".into()))
        .with_status(200)
        .with_body(
            r#"[
                {"id":"e1","video_id":"v1","profile_id":"p1","status":"success","extname":".mp4","audio_bitrate":128,"video_bitrate":500,"duration":61000},
                {"id":"e2","video_id":"v1","profile_id":"p2","status":"success","extname":".ts"}
            ]"#,
        )
        .create_async()
        .await;

    let outcomes = fx
        .panda
        .lifecycle()
        .poll_status(&source, None, &fx.registry)
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].job.state, JobState::Harvested);

    let artifacts = &outcomes[0].artifacts;
    let names: Vec<&str> = artifacts.iter().map(|f| f.display_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "(original) Holiday_2011.mov",
            "(h264) Holiday_2011.mp4",
            "(iphone and ipad) Holiday_2011.m3u8",
        ]
    );
    assert!(artifacts.iter().all(|f| f.storage_engine == PANDA_ENGINE_TYPE));
    assert!(artifacts.iter().all(|f| f.media_id == media_id));

    let h264 = &artifacts[1];
    assert_eq!(h264.unique_id, "e1.mp4");
    assert_eq!(h264.bitrate, Some(628));
    assert_eq!(h264.duration, Some(61.0));
    assert_eq!(
        h264.thumbnail_url.as_deref(),
        Some("http://videos.s3.amazonaws.com/e1_1.jpg")
    );
    let uris = fx.registry.get_uris(h264).await.unwrap();
    assert_eq!(uris.len(), 1);
    assert_eq!(uris[0].url(), "http://d1.cloudfront.net/e1.mp4");

    // Source plus three renditions; the job is no longer associated.
    assert_eq!(fx.repository.file_count(), 4);
    assert!(fx
        .repository
        .list_associations(source.id)
        .await
        .unwrap()
        .is_empty());

    // Renditions hosted by Panda are not sent back for transcoding.
    let mut hooks = CommitHooks::new();
    let accepted = fx.registry.transcode_all(h264, &mut hooks).await.unwrap();
    assert_eq!(accepted, 1);
    assert!(hooks.is_empty());
}

#[tokio::test]
async fn non_video_uploads_are_not_submitted() {
    let mut fx = fixture().await;
    let submit = fx
        .server
        .mock("POST", "/v2/videos.json")
        .expect(0)
        .create_async()
        .await;

    let file = fx
        .registry
        .add_media_file(Uuid::new_v4(), "http://cdn.example.com/song.mp3")
        .await
        .unwrap();
    let mut hooks = CommitHooks::new();
    assert_eq!(fx.registry.transcode_all(&file, &mut hooks).await.unwrap(), 0);
    assert!(hooks.is_empty());
    submit.assert_async().await;
}

#[tokio::test]
async fn invalid_settings_are_rejected_at_construction() {
    let fx = fixture().await;
    let config = Config {
        settings: PandaSettings {
            cloud_id: String::new(),
            ..fx.panda.settings().clone()
        },
        state_update_url: None,
        http_timeout_secs: 5,
        database_url: None,
        environment: "test".to_string(),
    };
    assert!(PandaStorage::from_config(&config, Arc::new(InMemoryMediaFileRepository::new())).is_err());
}
