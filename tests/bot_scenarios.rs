//! End-to-end scenarios for the polling loop and elaborator
//!
//! Runs the real `Poller` and `Elaborator` against in-memory fakes of the
//! Mastodon server, the image downloader and the inference service.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_test::assert_ok;

use alttoot::agent::{AgentError, ChatRequest, InferenceProvider};
use alttoot::channels::{
    Account, AccountId, ChannelResult, MediaAttachment, MediaId, MediaKind, SocialClient, Status,
    StatusId, StatusQuery, StatusUpdate,
};
use alttoot::config::{ErrorPolicy, Language};
use alttoot::elaborate::Elaborator;
use alttoot::media::{DescriptionGenerator, DownloadedImage, FetchError, ImageSource, Translator};
use alttoot::poller::{Poller, PollerConfig};

#[derive(Default)]
struct FakeMastodon {
    batches: Mutex<VecDeque<Vec<Status>>>,
    uploads: Mutex<Vec<(String, String)>>,
    updates: Mutex<Vec<(StatusId, StatusUpdate)>>,
}

#[async_trait]
impl SocialClient for FakeMastodon {
    async fn verify_credentials(&self) -> ChannelResult<Account> {
        Ok(Account {
            id: AccountId::new("9"),
            acct: "photographer".to_string(),
        })
    }

    async fn account_statuses(
        &self,
        _account: &AccountId,
        _query: &StatusQuery,
    ) -> ChannelResult<Vec<Status>> {
        Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn upload_media(
        &self,
        image: &DownloadedImage,
        description: &str,
    ) -> ChannelResult<MediaId> {
        let content = String::from_utf8(image.read().await.unwrap()).unwrap();
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((content, description.to_string()));
        Ok(MediaId::new(format!("uploaded-{}", uploads.len())))
    }

    async fn update_status(&self, id: &StatusId, update: &StatusUpdate) -> ChannelResult<()> {
        self.updates.lock().unwrap().push((id.clone(), update.clone()));
        Ok(())
    }
}

/// "Downloads" a URL by writing the URL itself as the file content.
struct UrlEcho;

#[async_trait]
impl ImageSource for UrlEcho {
    async fn download(&self, url: &str) -> Result<DownloadedImage, FetchError> {
        DownloadedImage::from_bytes(url.as_bytes(), Some("image/png".to_string()), "img.png")
    }
}

#[derive(Default)]
struct FakeOllama {
    translations: Mutex<usize>,
}

#[async_trait]
impl InferenceProvider for FakeOllama {
    async fn chat(&self, request: ChatRequest) -> Result<String, AgentError> {
        let message = &request.messages[0];
        match message.images.first() {
            Some(image) => Ok(format!(
                "description of {}",
                String::from_utf8_lossy(image)
            )),
            None => {
                *self.translations.lock().unwrap() += 1;
                Ok(message.content.replace("Translate to italian: ", "IT: "))
            }
        }
    }
}

fn image(id: &str, description: &str) -> MediaAttachment {
    MediaAttachment {
        id: MediaId::new(id),
        kind: MediaKind::Image,
        url: format!("https://files.example/{id}.png"),
        description: description.to_string(),
    }
}

fn status(id: &str, media: Vec<MediaAttachment>) -> Status {
    Status {
        id: StatusId::new(id),
        uri: format!("https://mastodon.example/@photographer/{id}"),
        content: format!("<p>Post <b>{id}</b></p>"),
        media_attachments: media,
    }
}

async fn start(
    mastodon: Arc<FakeMastodon>,
    ollama: Arc<FakeOllama>,
    language: &str,
) -> Poller<Elaborator> {
    let elaborator = Elaborator::new(
        mastodon.clone(),
        Arc::new(UrlEcho),
        DescriptionGenerator::new(ollama.clone()),
        Translator::new(ollama),
        Language::new(language),
    );
    let config = PollerConfig {
        on_error: ErrorPolicy::FailFast,
        ..PollerConfig::default()
    };
    Poller::connect(mastodon, elaborator, config).await.unwrap()
}

#[tokio::test]
async fn test_backlog_updates_only_the_status_that_needs_it() {
    let mastodon = Arc::new(FakeMastodon::default());
    mastodon.batches.lock().unwrap().push_back(vec![
        status("3", vec![image("a", "already described")]),
        status("2", vec![image("b", "")]),
        status("1", vec![]),
    ]);
    let ollama = Arc::new(FakeOllama::default());
    let mut poller = start(mastodon.clone(), ollama, "italian").await;

    let summary = assert_ok!(poller.backlog().await);
    assert_eq!(summary.seen, 3);
    assert_eq!(summary.updated, 1);
    assert_eq!(poller.watermark(), Some(&StatusId::new("3")));

    let updates = mastodon.updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, StatusId::new("2"));
    assert_eq!(updates[0].1.status, "Post 2");
    assert_eq!(updates[0].1.media_ids, vec![MediaId::new("uploaded-1")]);

    let uploads = mastodon.uploads.lock().unwrap();
    assert_eq!(
        *uploads,
        vec![(
            "https://files.example/b.png".to_string(),
            "IT: description of https://files.example/b.png".to_string()
        )]
    );
}

#[tokio::test]
async fn test_new_status_is_elaborated_in_original_order() {
    let mastodon = Arc::new(FakeMastodon::default());
    {
        let mut batches = mastodon.batches.lock().unwrap();
        batches.push_back(vec![status("10", vec![])]);
        batches.push_back(vec![status(
            "11",
            vec![image("x", ""), image("y", "kept"), image("z", "")],
        )]);
    }
    let ollama = Arc::new(FakeOllama::default());
    let mut poller = start(mastodon.clone(), ollama.clone(), "en").await;

    assert_ok!(poller.backlog().await);
    let summary = assert_ok!(poller.poll_once().await);
    assert_eq!(summary.updated, 1);
    assert_eq!(poller.watermark(), Some(&StatusId::new("11")));

    let updates = mastodon.updates.lock().unwrap();
    assert_eq!(
        updates[0].1.media_ids,
        vec![
            MediaId::new("uploaded-1"),
            MediaId::new("y"),
            MediaId::new("uploaded-2"),
        ]
    );
    assert_eq!(*ollama.translations.lock().unwrap(), 0);
}
