use super::*;
use image::{ImageFormat, Rgb};
use std::io::Cursor;
use tempfile::TempDir;

struct ChannelEncoder;

impl ImageEncoder for ChannelEncoder {
    fn encode_batch(&mut self, images: &[RgbImage]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(images
            .iter()
            .map(|image| {
                let Rgb([r, g, b]) = *image.get_pixel(0, 0);
                vec![f32::from(r), f32::from(g), f32::from(b), 0.5]
            })
            .collect())
    }
}

fn png_bytes(color: [u8; 3]) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    RgbImage::from_pixel(6, 6, Rgb(color))
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("should encode png");
    buffer.into_inner()
}

#[test]
fn path_takes_precedence_over_url() {
    let input = QueryInput::resolve(
        Some(PathBuf::from("query.jpg")),
        Some("https://example.com/query.jpg".to_string()),
    )
    .expect("should resolve");

    assert_eq!(input, Some(QueryInput::Path(PathBuf::from("query.jpg"))));
}

#[test]
fn url_used_when_no_path() {
    let input = QueryInput::resolve(None, Some("https://example.com/a.png".to_string()))
        .expect("should resolve");

    match input {
        Some(QueryInput::Url(url)) => assert_eq!(url.as_str(), "https://example.com/a.png"),
        other => panic!("expected url input, got {:?}", other),
    }
}

#[test]
fn no_flags_resolve_to_none() {
    assert_eq!(QueryInput::resolve(None, None).expect("should resolve"), None);
    assert_eq!(
        QueryInput::resolve(Some(PathBuf::new()), Some(String::new())).expect("should resolve"),
        None
    );
}

#[test]
fn empty_path_falls_through_to_url() {
    let input = QueryInput::resolve(
        Some(PathBuf::new()),
        Some("http://example.com/b.webp".to_string()),
    )
    .expect("should resolve");

    assert!(matches!(input, Some(QueryInput::Url(_))));
}

#[test]
fn invalid_urls_are_rejected() {
    for bad in ["not a url", "ftp://example.com/a.png", "file:///tmp/a.png"] {
        let result = QueryInput::resolve(None, Some(bad.to_string()));
        assert!(
            matches!(result, Err(MatcherError::Network(_))),
            "{} should be rejected",
            bad
        );
    }

    assert!(validate_url("https://example.com/a.png").is_ok());
    assert!(validate_url("http://127.0.0.1:8080/a.png").is_ok());
}

#[test]
fn describe_names_the_source() {
    assert_eq!(
        QueryInput::Path(PathBuf::from("shoes/red.jpg")).describe(),
        "shoes/red.jpg"
    );
    let url = validate_url("https://example.com/x.png").expect("valid url");
    assert_eq!(QueryInput::Url(url).describe(), "https://example.com/x.png");
}

#[test]
fn format_without_embedding_is_empty_array() {
    assert_eq!(format_embedding(None).expect("should format"), "[]");
}

#[test]
fn format_embedding_is_single_line_json() {
    let output = format_embedding(Some([0.6, -0.8].as_slice())).expect("should format");
    assert_eq!(output, "[0.6,-0.8]");

    let parsed: Vec<f32> = serde_json::from_str(&output).expect("output should be json");
    assert_eq!(parsed, vec![0.6, -0.8]);
}

#[test]
fn query_embedding_from_path() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let path = temp_dir.path().join("query.png");
    std::fs::write(&path, png_bytes([30, 60, 90])).expect("should write image");

    let fetcher = ImageFetcher::new(&HttpConfig::default());
    let embedding = query_embedding(&mut ChannelEncoder, &QueryInput::Path(path), &fetcher)
        .expect("should embed");

    let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-5);
    assert!(embedding[2] > embedding[0]);
}

#[test]
fn query_embedding_missing_file_fails() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let fetcher = ImageFetcher::new(&HttpConfig::default());

    let result = query_embedding(
        &mut ChannelEncoder,
        &QueryInput::Path(temp_dir.path().join("missing.jpg")),
        &fetcher,
    );
    assert!(result.is_err());
}

mod http_tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(server)
            .await;
    }

    async fn load_in_background(url: String, config: HttpConfig) -> Result<RgbImage> {
        tokio::task::spawn_blocking(move || {
            let url = validate_url(&url)?;
            let fetcher = ImageFetcher::new(&config);
            load_query_image(&QueryInput::Url(url), &fetcher)
        })
        .await
        .expect("blocking task should complete")
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fetch_and_decode_remote_image() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/products/red.png",
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(png_bytes([200, 0, 0])),
        )
        .await;

        let image = load_in_background(
            format!("{}/products/red.png", server.uri()),
            HttpConfig::default(),
        )
        .await
        .expect("should fetch image");

        assert_eq!(image.dimensions(), (6, 6));
        assert_eq!(image.get_pixel(0, 0), &Rgb([200, 0, 0]));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn http_error_status_is_reported() {
        let server = MockServer::start().await;
        serve(&server, "/missing.png", ResponseTemplate::new(404)).await;

        let result =
            load_in_background(format!("{}/missing.png", server.uri()), HttpConfig::default())
                .await;

        match result {
            Err(MatcherError::Network(message)) => assert!(message.contains("404"), "{}", message),
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn oversized_image_is_rejected() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/large.png",
            ResponseTemplate::new(200).set_body_bytes(vec![0_u8; 4096]),
        )
        .await;

        let config = HttpConfig {
            max_image_bytes: 1024,
            ..HttpConfig::default()
        };
        let result = load_in_background(format!("{}/large.png", server.uri()), config).await;

        match result {
            Err(MatcherError::Network(message)) => {
                assert!(message.contains("limit"), "{}", message);
            }
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn non_image_body_fails_to_decode() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/page.png",
            ResponseTemplate::new(200).set_body_string("<html>not an image</html>"),
        )
        .await;

        let result =
            load_in_background(format!("{}/page.png", server.uri()), HttpConfig::default()).await;

        assert!(matches!(result, Err(MatcherError::Image(_))));
    }
}
