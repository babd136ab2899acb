//! Provider API domain methods: clouds, presets, profiles, videos and
//! encodings.

use serde::Deserialize;

use panda_core::models::{Cloud, Encoding, Preset, Profile, RemoteStatus, Video};
use panda_core::{TranscodeError, TranscodeResult};

use crate::signing::url_escape;
use crate::ProviderClient;

/// Filters for listing encodings. Unset fields are not sent.
#[derive(Debug, Clone, Default)]
pub struct EncodingFilter {
    pub status: Option<RemoteStatus>,
    pub profile_id: Option<String>,
    pub profile_name: Option<String>,
    pub video_id: Option<String>,
}

impl EncodingFilter {
    pub fn for_video(video_id: impl Into<String>) -> Self {
        Self {
            video_id: Some(video_id.into()),
            ..Default::default()
        }
    }

    fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(status) = self.status.filter(RemoteStatus::is_filterable) {
            params.push(("status".to_string(), status.as_str().to_string()));
        }
        if let Some(id) = &self.profile_id {
            params.push(("profile_id".to_string(), id.clone()));
        }
        if let Some(name) = &self.profile_name {
            params.push(("profile_name".to_string(), name.clone()));
        }
        if let Some(id) = &self.video_id {
            params.push(("video_id".to_string(), id.clone()));
        }
        params
    }
}

/// A profile defined from scratch.
#[derive(Debug, Clone)]
pub struct NewProfile {
    /// Human-readable name (e.g. "MP4 (H.264) Hi")
    pub title: String,
    /// Extension including the leading dot
    pub extname: String,
    pub width: i32,
    pub height: i32,
    /// Encoder command line with the provider's `$input_file$` style
    /// placeholders.
    pub command: String,
    /// Machine-readable name (e.g. "h264.hi"); omitted when empty.
    pub name: Option<String>,
}

impl NewProfile {
    fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("title".to_string(), self.title.clone()),
            ("extname".to_string(), self.extname.clone()),
            ("width".to_string(), self.width.to_string()),
            ("height".to_string(), self.height.to_string()),
            ("command".to_string(), self.command.clone()),
        ];
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            params.push(("name".to_string(), name.to_string()));
        }
        params
    }
}

fn preset_params(
    preset_name: &str,
    name: Option<&str>,
    width: Option<i32>,
    height: Option<i32>,
) -> Vec<(String, String)> {
    let mut params = vec![("preset_name".to_string(), preset_name.to_string())];
    if let Some(name) = name {
        params.push(("name".to_string(), name.to_string()));
    }
    if let Some(width) = width {
        params.push(("width".to_string(), width.to_string()));
    }
    if let Some(height) = height {
        params.push(("height".to_string(), height.to_string()));
    }
    params
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    deleted: bool,
}

impl ProviderClient {
    /// The cloud the credentials belong to.
    pub async fn get_cloud(&self) -> TranscodeResult<Cloud> {
        let path = resource_path("clouds", &self.cloud_id());
        self.get_json(&path, &[]).await
    }

    pub async fn get_presets(&self) -> TranscodeResult<Vec<Preset>> {
        self.get_json("/presets.json", &[]).await
    }

    /// List videos, optionally filtered by status. Statuses the API cannot
    /// filter by are ignored.
    pub async fn get_videos(&self, status: Option<RemoteStatus>) -> TranscodeResult<Vec<Video>> {
        let mut params = Vec::new();
        if let Some(status) = status.filter(RemoteStatus::is_filterable) {
            params.push(("status".to_string(), status.as_str().to_string()));
        }
        self.get_json("/videos.json", &params).await
    }

    pub async fn get_encodings(&self, filter: &EncodingFilter) -> TranscodeResult<Vec<Encoding>> {
        self.get_json("/encodings.json", &filter.params()).await
    }

    pub async fn get_profiles(&self) -> TranscodeResult<Vec<Profile>> {
        self.get_json("/profiles.json", &[]).await
    }

    pub async fn get_video(&self, video_id: &str) -> TranscodeResult<Video> {
        self.get_json(&resource_path("videos", video_id), &[])
            .await
    }

    pub async fn get_encoding(&self, encoding_id: &str) -> TranscodeResult<Encoding> {
        self.get_json(&resource_path("encodings", encoding_id), &[])
            .await
    }

    pub async fn get_profile(&self, profile_id: &str) -> TranscodeResult<Profile> {
        self.get_json(&resource_path("profiles", profile_id), &[])
            .await
    }

    pub async fn add_profile(&self, profile: &NewProfile) -> TranscodeResult<Profile> {
        self.post_json("/profiles.json", &profile.params()).await
    }

    /// Add a profile based on a preset, overriding the given settings.
    pub async fn add_profile_from_preset(
        &self,
        preset_name: &str,
        name: Option<&str>,
        width: Option<i32>,
        height: Option<i32>,
    ) -> TranscodeResult<Profile> {
        let params = preset_params(preset_name, name, width, height);
        self.post_json("/profiles.json", &params).await
    }

    pub async fn delete_encoding(&self, encoding_id: &str) -> TranscodeResult<bool> {
        self.delete(&resource_path("encodings", encoding_id))
            .await
    }

    pub async fn delete_video(&self, video_id: &str) -> TranscodeResult<bool> {
        self.delete(&resource_path("videos", video_id)).await
    }

    pub async fn delete_profile(&self, profile_id: &str) -> TranscodeResult<bool> {
        self.delete(&resource_path("profiles", profile_id))
            .await
    }

    async fn delete(&self, path: &str) -> TranscodeResult<bool> {
        let response: DeleteResponse = self.delete_json(path, &[]).await?;
        Ok(response.deleted)
    }

    /// Submit a source URL for transcoding with the given profiles.
    ///
    /// Arguments are validated before any request is made.
    pub async fn transcode_file(
        &self,
        source_url: &str,
        profile_ids: &[String],
        state_update_url: Option<&str>,
    ) -> TranscodeResult<Video> {
        if profile_ids.is_empty() {
            return Err(TranscodeError::InvalidInput(
                "Must provide at least one profile ID.".to_string(),
            ));
        }
        if source_url.trim().is_empty() {
            return Err(TranscodeError::InvalidInput(
                "Source URL must not be empty.".to_string(),
            ));
        }

        let mut params = vec![
            ("source_url".to_string(), source_url.to_string()),
            ("profiles".to_string(), profile_ids.join(",")),
        ];
        if let Some(url) = state_update_url.filter(|u| !u.is_empty()) {
            params.push(("state_update_url".to_string(), url.to_string()));
        }
        self.post_json("/videos.json", &params).await
    }

    /// Encode an existing video with one more profile.
    pub async fn add_transcode_profile(
        &self,
        video_id: &str,
        profile_id: &str,
    ) -> TranscodeResult<Encoding> {
        let params = vec![
            ("video_id".to_string(), video_id.to_string()),
            ("profile_id".to_string(), profile_id.to_string()),
        ];
        self.post_json("/encodings.json", &params).await
    }
}

/// Path of a single resource. The id is escaped so it stays one segment.
fn resource_path(collection: &str, id: &str) -> String {
    format!("/{}/{}.json", collection, url_escape(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Credentials;
    use mockito::Matcher;
    use std::time::Duration;

    fn client_for(url: &str) -> ProviderClient {
        ProviderClient::new(
            Credentials {
                cloud_id: "cloud1".to_string(),
                access_key: "access".to_string(),
                secret_key: "secret".to_string(),
                api_host: url.to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn signed_query() -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("cloud_id".into(), "cloud1".into()),
            Matcher::UrlEncoded("access_key".into(), "access".into()),
            Matcher::Regex("signature=".into()),
            Matcher::Regex("timestamp=".into()),
        ])
    }

    #[tokio::test]
    async fn get_video_decodes_and_signs() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/videos/v1.json")
            .match_query(signed_query())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"v1","status":"processing","extname":".mp4"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let video = client.get_video("v1").await.unwrap();
        assert_eq!(video.id, "v1");
        assert_eq!(video.status, RemoteStatus::Processing);
        mock.assert_async().await;
    }

    #[test]
    fn resource_ids_are_escaped() {
        assert_eq!(resource_path("videos", "v1"), "/videos/v1.json");
        assert_eq!(
            resource_path("encodings", "../e1?x=1#y"),
            "/encodings/..%2Fe1%3Fx%3D1%23y.json"
        );
    }

    #[tokio::test]
    async fn id_with_separators_stays_in_its_segment() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v2/videos/a%2Fb%3Fc.json")
            .match_query(signed_query())
            .with_status(200)
            .with_body(r#"{"deleted":true}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        assert!(client.delete_video("a/b?c").await.unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn repeated_get_is_served_from_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/profiles.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"id":"p1","name":"h264"}]"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let first = client.get_profiles().await.unwrap();
        let second = client.get_profiles().await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second[0].name, "h264");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn cache_is_dropped_after_credential_change() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/profiles.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[]"#)
            .expect(2)
            .create_async()
            .await;

        let client = client_for(&server.url());
        client.get_profiles().await.unwrap();
        client.update_credentials(Credentials {
            cloud_id: "cloud2".to_string(),
            access_key: "access2".to_string(),
            secret_key: "secret2".to_string(),
            api_host: server.url(),
        });
        client.get_profiles().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn mutation_clears_cache() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", "/v2/encodings.json")
            .match_query(Matcher::UrlEncoded("video_id".into(), "v1".into()))
            .with_status(200)
            .with_body(r#"[]"#)
            .expect(2)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/v2/encodings/e1.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"deleted":true}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let filter = EncodingFilter::for_video("v1");
        client.get_encodings(&filter).await.unwrap();
        assert!(client.delete_encoding("e1").await.unwrap());
        client.get_encodings(&filter).await.unwrap();
        list.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn error_field_becomes_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v2/videos/missing.json")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":"RecordNotFound","message":"Couldn't find Video"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        match client.get_video("missing").await {
            Err(TranscodeError::Provider { code, message }) => {
                assert_eq!(code.as_deref(), Some("RecordNotFound"));
                assert_eq!(message, "Couldn't find Video");
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn error_field_on_delete_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/v2/videos/v1.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error":"Forbidden","message":"nope"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        assert!(client.delete_video("v1").await.unwrap_err().is_provider());
    }

    #[tokio::test]
    async fn delete_reports_flag() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/v2/profiles/p1.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"deleted":false}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        assert!(!client.delete_profile("p1").await.unwrap());
    }

    #[tokio::test]
    async fn transport_failure_is_provider_error_without_code() {
        // Nothing listens on port 1.
        let client = client_for("http://127.0.0.1:1");
        match client.get_profiles().await {
            Err(TranscodeError::Provider { code, .. }) => assert!(code.is_none()),
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_uses_status_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v2/presets.json")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("Service Unavailable")
            .create_async()
            .await;

        let client = client_for(&server.url());
        match client.get_presets().await {
            Err(TranscodeError::Provider { code, message }) => {
                assert_eq!(code.as_deref(), Some("503"));
                assert_eq!(message, "Service Unavailable");
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn transcode_file_validates_before_any_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let err = client
            .transcode_file("http://example.com/a.mp4", &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::InvalidInput(_)));

        let err = client
            .transcode_file("  ", &["p1".to_string()], None)
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::InvalidInput(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn transcode_file_posts_form_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/videos.json")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("source_url".into(), "http://example.com/a b.mp4".into()),
                Matcher::UrlEncoded("profiles".into(), "p1,p2".into()),
                Matcher::UrlEncoded("state_update_url".into(), "http://cms/panda?file_id=7".into()),
                Matcher::UrlEncoded("cloud_id".into(), "cloud1".into()),
            ]))
            .with_status(201)
            .with_body(r#"{"id":"v9","status":"processing"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let video = client
            .transcode_file(
                "http://example.com/a b.mp4",
                &["p1".to_string(), "p2".to_string()],
                Some("http://cms/panda?file_id=7"),
            )
            .await
            .unwrap();
        assert_eq!(video.id, "v9");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn profile_from_preset_omits_absent_options() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/profiles.json")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("preset_name".into(), "h264".into()),
                Matcher::UrlEncoded("name".into(), "h264.16x9".into()),
                Matcher::UrlEncoded("width".into(), "560".into()),
            ]))
            .with_status(201)
            .with_body(r#"{"id":"p5","name":"h264.16x9"}"#)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let profile = client
            .add_profile_from_preset("h264", Some("h264.16x9"), Some(560), None)
            .await
            .unwrap();
        assert_eq!(profile.id, "p5");
        mock.assert_async().await;
    }

    #[test]
    fn encoding_filter_skips_unfilterable_status() {
        let filter = EncodingFilter {
            status: Some(RemoteStatus::Unknown),
            profile_name: Some("h264".to_string()),
            ..Default::default()
        };
        assert_eq!(
            filter.params(),
            vec![("profile_name".to_string(), "h264".to_string())]
        );
    }

    #[test]
    fn preset_params_omit_absent_options() {
        let keys: Vec<String> = preset_params("h264", None, Some(560), None)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["preset_name", "width"]);
    }

    #[test]
    fn new_profile_omits_empty_name() {
        let profile = NewProfile {
            title: "MP4".to_string(),
            extname: ".mp4".to_string(),
            width: 480,
            height: 320,
            command: "ffmpeg -i $input_file$ -y $output_file$".to_string(),
            name: Some(String::new()),
        };
        assert!(profile.params().iter().all(|(k, _)| k != "name"));
    }
}
