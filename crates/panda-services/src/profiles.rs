//! Profile lookups by name and id, and seeding of the custom 16:9 profiles.

use std::collections::HashMap;

use panda_client::ProviderClient;
use panda_core::models::Profile;
use panda_core::TranscodeResult;

/// Ids of the provider profiles whose name is in `names`, in provider order.
pub async fn profile_names_to_ids(
    client: &ProviderClient,
    names: &[String],
) -> TranscodeResult<Vec<String>> {
    let profiles = client.get_profiles().await?;
    Ok(profiles
        .into_iter()
        .filter(|p| names.contains(&p.name))
        .map(|p| p.id)
        .collect())
}

/// Names of the profiles whose id is in `ids`, deduplicated, in provider
/// order.
pub async fn profile_ids_to_names(
    client: &ProviderClient,
    ids: &[String],
) -> TranscodeResult<Vec<String>> {
    let profiles = client.get_profiles().await?;
    let mut names: Vec<String> = Vec::new();
    for profile in profiles {
        if ids.contains(&profile.id) && !names.contains(&profile.name) {
            names.push(profile.name);
        }
    }
    Ok(names)
}

/// Profile id to name.
pub async fn profile_ids_names(client: &ProviderClient) -> TranscodeResult<HashMap<String, String>> {
    let profiles = client.get_profiles().await?;
    Ok(profiles.into_iter().map(|p| (p.id, p.name)).collect())
}

/// A profile derived from a provider preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomProfile {
    pub name: &'static str,
    pub preset_name: &'static str,
    pub width: i32,
    pub height: i32,
}

/// Widescreen variants of the stock web profiles.
pub const CUSTOM_PROFILES: [CustomProfile; 3] = [
    CustomProfile {
        name: "h264.16x9",
        preset_name: "h264",
        width: 560,
        height: 315,
    },
    CustomProfile {
        name: "h264.hi.16x9",
        preset_name: "h264.hi",
        width: 854,
        height: 480,
    },
    CustomProfile {
        name: "webm.16x9",
        preset_name: "webm",
        width: 560,
        height: 315,
    },
];

/// Add the custom profiles the cloud does not have yet. Returns the profiles
/// created.
pub async fn ensure_custom_profiles(client: &ProviderClient) -> TranscodeResult<Vec<Profile>> {
    let existing: Vec<String> = client
        .get_profiles()
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();

    let mut created = Vec::new();
    for custom in CUSTOM_PROFILES.iter() {
        if existing.iter().any(|name| name == custom.name) {
            tracing::debug!(profile = custom.name, "Custom profile already present");
            continue;
        }
        let profile = client
            .add_profile_from_preset(
                custom.preset_name,
                Some(custom.name),
                Some(custom.width),
                Some(custom.height),
            )
            .await?;
        tracing::info!(profile = %profile.name, profile_id = %profile.id, "Custom profile added");
        created.push(profile);
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use panda_client::Credentials;
    use std::time::Duration;

    const PROFILES: &str = r#"[
        {"id":"p1","name":"h264"},
        {"id":"p2","name":"webm"},
        {"id":"p3","name":"h264.hi"},
        {"id":"p4","name":"h264"}
    ]"#;

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

    async fn server_with_profiles() -> mockito::ServerGuard {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v2/profiles.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(PROFILES)
            .create_async()
            .await;
        server
    }

    #[tokio::test]
    async fn names_ids_round_trip() {
        let server = server_with_profiles().await;
        let client = client_for(&server.url());

        let names = vec!["webm".to_string(), "h264".to_string(), "h264".to_string()];
        let ids = profile_names_to_ids(&client, &names).await.unwrap();
        assert_eq!(ids, vec!["p1", "p2", "p4"]);

        let back = profile_ids_to_names(&client, &ids).await.unwrap();
        let mut expected = vec!["h264".to_string(), "webm".to_string()];
        let mut got = back.clone();
        expected.sort();
        got.sort();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn unknown_names_resolve_to_nothing() {
        let server = server_with_profiles().await;
        let client = client_for(&server.url());
        let ids = profile_names_to_ids(&client, &["ogg".to_string()])
            .await
            .unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn id_name_map() {
        let server = server_with_profiles().await;
        let client = client_for(&server.url());
        let map = profile_ids_names(&client).await.unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map["p3"], "h264.hi");
    }

    #[tokio::test]
    async fn custom_profiles_only_added_when_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v2/profiles.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"id":"p1","name":"h264.16x9"}]"#)
            .create_async()
            .await;
        let hi = server
            .mock("POST", "/v2/profiles.json")
            .match_body(Matcher::UrlEncoded("name".into(), "h264.hi.16x9".into()))
            .with_status(201)
            .with_body(r#"{"id":"p2","name":"h264.hi.16x9"}"#)
            .expect(1)
            .create_async()
            .await;
        let webm = server
            .mock("POST", "/v2/profiles.json")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("name".into(), "webm.16x9".into()),
                Matcher::UrlEncoded("preset_name".into(), "webm".into()),
                Matcher::UrlEncoded("width".into(), "560".into()),
                Matcher::UrlEncoded("height".into(), "315".into()),
            ]))
            .with_status(201)
            .with_body(r#"{"id":"p3","name":"webm.16x9"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server.url());
        let created = ensure_custom_profiles(&client).await.unwrap();
        let names: Vec<&str> = created.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["h264.hi.16x9", "webm.16x9"]);
        hi.assert_async().await;
        webm.assert_async().await;
    }
}
