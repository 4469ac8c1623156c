//! Tests d'intégration de la phase d'initialisation du client
//!
//! Le serveur Qobuz est remplacé par un mock HTTP ; la sonde de validation
//! des secrets et le login sont exercés contre des réponses contrôlées.

use mockito::Matcher;
use qbzdl::{QobuzApi, QobuzClient, QobuzConfig, QobuzError, find_active_secret};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn base_config() -> QobuzConfig {
    QobuzConfig {
        app_id: Some("123456789".to_string()),
        app_secret: Some("abcdef0123456789abcdef0123456789".to_string()),
        quality: 6,
        ..QobuzConfig::default()
    }
}

#[tokio::test]
async fn probe_accepts_first_candidate_on_forbidden() -> anyhow::Result<()> {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    // 403 vaut acceptation : le secret signe correctement, seul l'accès au
    // contenu est refusé
    let probe = server
        .mock("GET", "/track/getFileUrl")
        .match_query(Matcher::Any)
        .with_status(403)
        .expect(1)
        .create_async()
        .await;

    let api = QobuzApi::with_base_url("123456789", server.url())?;
    let candidates = vec!["first".to_string(), "second".to_string()];
    let active = find_active_secret(&api, &candidates).await?;

    assert_eq!(active, "first");
    probe.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn probe_does_not_accept_unauthorized() -> anyhow::Result<()> {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    // 401 est ambigu (le token peut être en cause) : loggé, non acceptant,
    // mais chaque candidat est quand même sondé
    let probe = server
        .mock("GET", "/track/getFileUrl")
        .match_query(Matcher::Any)
        .with_status(401)
        .expect(2)
        .create_async()
        .await;

    let api = QobuzApi::with_base_url("123456789", server.url())?;
    let candidates = vec!["first".to_string(), "second".to_string()];
    let result = find_active_secret(&api, &candidates).await;

    assert!(matches!(result, Err(QobuzError::NoValidSecret)));
    probe.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn probe_exhaustion_on_bad_signature() -> anyhow::Result<()> {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let probe = server
        .mock("GET", "/track/getFileUrl")
        .match_query(Matcher::Any)
        .with_status(400)
        .expect(3)
        .create_async()
        .await;

    let api = QobuzApi::with_base_url("123456789", server.url())?;
    let candidates = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let result = find_active_secret(&api, &candidates).await;

    assert!(matches!(result, Err(QobuzError::NoValidSecret)));
    probe.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn connect_skips_probe_when_keys_and_token_provided() -> anyhow::Result<()> {
    init_tracing();
    // Aucun mock enregistré : toute requête ferait échouer le test
    let server = mockito::Server::new_async().await;

    let config = QobuzConfig {
        user_auth_token: Some("tok".to_string()),
        ..base_config()
    };
    let client = QobuzClient::connect_with_base_url(&config, &server.url()).await?;

    assert_eq!(client.api().secret(), config.app_secret.as_deref());
    assert_eq!(client.api().auth_token(), Some("tok"));
    Ok(())
}

#[tokio::test]
async fn connect_anonymous_with_app_keys_skips_probe() -> anyhow::Result<()> {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    // Sans token, la sonde anonyme répondrait 401 ; avec un secret
    // pré-configuré elle ne doit jamais partir
    let probe = server
        .mock("GET", "/track/getFileUrl")
        .match_query(Matcher::Any)
        .with_status(401)
        .expect(0)
        .create_async()
        .await;

    let config = base_config();
    let client = QobuzClient::connect_with_base_url(&config, &server.url()).await?;

    assert_eq!(client.api().secret(), config.app_secret.as_deref());
    assert!(client.api().auth_token().is_none());
    probe.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn connect_logs_in_with_credentials() -> anyhow::Result<()> {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let login = server
        .mock("GET", "/user/login")
        .match_query(Matcher::UrlEncoded(
            "email".into(),
            "user@example.com".into(),
        ))
        .with_status(200)
        .with_body(
            serde_json::json!({
                "user_auth_token": "tok123",
                "user": {
                    "id": 42,
                    "credential": {"parameters": {"short_label": "Studio"}}
                }
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    // Le chemin login valide toujours le secret, même pré-configuré
    let probe = server
        .mock("GET", "/track/getFileUrl")
        .match_query(Matcher::Any)
        .with_status(403)
        .expect(1)
        .create_async()
        .await;

    let config = QobuzConfig {
        email: Some("user@example.com".to_string()),
        password: Some("hunter2".to_string()),
        ..base_config()
    };
    let client = QobuzClient::connect_with_base_url(&config, &server.url()).await?;

    let auth = client.auth_info().expect("auth info");
    assert_eq!(auth.token, "tok123");
    assert_eq!(auth.user_id.as_deref(), Some("42"));
    assert_eq!(auth.subscription_label.as_deref(), Some("Studio"));
    assert_eq!(client.api().auth_token(), Some("tok123"));

    login.assert_async().await;
    probe.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn connect_fails_on_rejected_credentials() -> anyhow::Result<()> {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let login = server
        .mock("GET", "/user/login")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body("{\"message\":\"Invalid credentials\"}")
        .expect(1)
        .create_async()
        .await;

    let config = QobuzConfig {
        email: Some("user@example.com".to_string()),
        password: Some("wrong".to_string()),
        ..base_config()
    };
    let result = QobuzClient::connect_with_base_url(&config, &server.url()).await;

    assert!(matches!(result, Err(QobuzError::Login(_))));
    login.assert_async().await;
    Ok(())
}
