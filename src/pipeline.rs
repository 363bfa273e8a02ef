use chrono::{Local, NaiveDate};
use reqwest::Client;
use scraper::Html;
use tracing::{info, warn};

use crate::deadline::Deadline;
use crate::fetch::Fetcher;
use crate::llm::ModelExtractor;
use crate::menu::WeeklyMenu;
use crate::parser::extract::{
    default_extractors, default_locators, MenuExtractor, PageContext, SourceLocator,
};
use crate::render::Renderer;
use crate::settings::{PipelineError, Settings};

/// What the fetched HTML offers before any further network call.
enum Inspection {
    Structured(WeeklyMenu),
    Sources(Vec<String>),
}

/// Cheapest-first cascade from a restaurant URL to a `WeeklyMenu`:
///
/// 1. direct fetch, then structured extractors on the HTML;
/// 2. widget / PDF sources found in the HTML, rendered remotely, then the model;
/// 3. page text (reduced HTML, else remote render), then the model.
///
/// Holds only read-only state, so one instance can serve many concurrent runs.
pub struct Pipeline {
    settings: Settings,
    fetcher: Fetcher,
    renderer: Renderer,
    model: ModelExtractor,
    extractors: Vec<Box<dyn MenuExtractor>>,
    locators: Vec<Box<dyn SourceLocator>>,
}

impl Pipeline {
    /// Fails only on configuration problems, a missing model credential first of all.
    pub fn new(settings: Settings) -> Result<Self, PipelineError> {
        let client = Client::builder().build()?;
        let model = ModelExtractor::new(client.clone(), &settings)?;
        let renderer = Renderer::new(client.clone(), &settings)?;
        let fetcher = Fetcher::new(client, &settings);
        Ok(Self {
            settings,
            fetcher,
            renderer,
            model,
            extractors: default_extractors(),
            locators: default_locators(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run once for `url` under the configured budget.
    pub async fn scrape(&self, url: &str) -> Option<WeeklyMenu> {
        let deadline = Deadline::after(self.settings.budget());
        self.scrape_within(url, Local::now().date_naive(), &deadline).await
    }

    /// `Some` (possibly with no days) when the page was checked, `None` when
    /// no strategy could produce anything this time.
    pub async fn scrape_within(
        &self,
        url: &str,
        today: NaiveDate,
        deadline: &Deadline,
    ) -> Option<WeeklyMenu> {
        let html = deadline
            .run("direct fetch", self.fetcher.fetch_html(url))
            .await
            .flatten();

        let text = match html {
            Some(html) => {
                let ctx = PageContext { base_url: url, today };
                match self.inspect(&html, &ctx) {
                    Inspection::Structured(menu) => return Some(menu),
                    Inspection::Sources(sources) => {
                        for source in sources {
                            if let Some(text) = self.render_usable(&source, deadline).await {
                                return self.ask_model(&text, today, deadline).await;
                            }
                        }
                    }
                }
                match self.fetcher.usable_text(&html) {
                    Some(text) => Some(text),
                    None => self.render_usable(url, deadline).await,
                }
            }
            None => {
                let reduced = deadline
                    .run("reduced text fetch", self.fetcher.fetch_reduced_text(url))
                    .await
                    .flatten();
                match reduced {
                    Some(text) => Some(text),
                    None => self.render_usable(url, deadline).await,
                }
            }
        };

        let Some(text) = text else {
            warn!("Could not obtain usable text for {}", url);
            return None;
        };
        self.ask_model(&text, today, deadline).await
    }

    fn inspect(&self, html: &str, ctx: &PageContext) -> Inspection {
        let doc = Html::parse_document(html);
        for extractor in &self.extractors {
            if let Some(menu) = extractor.attempt(&doc, ctx).filter(|m| !m.is_empty()) {
                info!(
                    "{} layout recognized, {} days without the model",
                    extractor.name(),
                    menu.days.len()
                );
                return Inspection::Structured(menu);
            }
        }
        let sources = self
            .locators
            .iter()
            .filter_map(|locator| {
                let found = locator.locate(&doc, ctx)?;
                info!("{} points to {}", locator.name(), found);
                Some(found)
            })
            .collect();
        Inspection::Sources(sources)
    }

    async fn render_usable(&self, url: &str, deadline: &Deadline) -> Option<String> {
        let text = deadline
            .run("remote render", self.renderer.render(url))
            .await
            .flatten()?;
        let len = text.chars().count();
        if len < self.settings.min_rendered_chars {
            warn!("Rendered text of {} too short ({} chars)", url, len);
            return None;
        }
        Some(text)
    }

    async fn ask_model(&self, text: &str, today: NaiveDate, deadline: &Deadline) -> Option<WeeklyMenu> {
        deadline
            .run("model extraction", self.model.extract(text, today))
            .await
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    const MENU_JSON: &str = r#"{"poledni_nabidka":[{"den":"Pondělí","polevky":["Kulajda"],"hlavni_chody":[{"cislo":1,"nazev":"Hovězí guláš","popis":"","cena_bez_polevky":149,"cena_s_polevkou":0}]}]}"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
    }

    fn pipeline(server: &MockServer) -> Pipeline {
        Pipeline::new(Settings {
            llm_api_key: Some("test-key".into()),
            llm_endpoint: server.url("/llm"),
            reader_template: format!("{}/reader/{{url}}", server.base_url()),
            ..Default::default()
        })
        .unwrap()
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn long_text() -> String {
        "Polední menu Pondělí Kulajda 1. Hovězí guláš, houskový knedlík 149 Kč ".repeat(10)
    }

    async fn model_replying<'a>(server: &'a MockServer, content: &str) -> httpmock::Mock<'a> {
        let body = json!({ "choices": [{ "message": { "content": content } }] });
        server
            .mock_async(|when, then| {
                when.method(POST).path("/llm");
                then.status(200).json_body(body);
            })
            .await
    }

    async fn run(p: &Pipeline, url: &str) -> Option<WeeklyMenu> {
        p.scrape_within(url, today(), &Deadline::unbounded()).await
    }

    #[tokio::test]
    async fn recognized_layout_skips_model() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/denni-menu");
                then.status(200).body(fixture("day_tabs"));
            })
            .await;
        let model = model_replying(&server, MENU_JSON).await;

        let menu = run(&pipeline(&server), &server.url("/denni-menu")).await.unwrap();
        assert_eq!(menu.days.len(), 3);
        model.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn short_text_never_reaches_model() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/menu");
                then.status(200).body("<html><body><p>Menu připravujeme.</p></body></html>");
            })
            .await;
        let reader = server
            .mock_async(|when, then| {
                when.path_contains("/reader/");
                then.status(200).body("Menu připravujeme.");
            })
            .await;
        let model = model_replying(&server, MENU_JSON).await;

        assert_eq!(run(&pipeline(&server), &server.url("/menu")).await, None);
        reader.assert_hits_async(1).await;
        model.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn checked_and_found_nothing_is_empty_not_none() {
        let server = MockServer::start_async().await;
        let page = server
            .mock_async(|when, then| {
                when.method(GET).path("/menu");
                then.status(503);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.path_contains("/reader/");
                then.status(200).body(long_text());
            })
            .await;
        model_replying(&server, r#"{"poledni_nabidka": []}"#).await;

        let menu = run(&pipeline(&server), &server.url("/menu")).await;
        assert_eq!(menu, Some(WeeklyMenu::empty()));
        // html fetch and the reduced-text fetch both tried the page
        page.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn widget_is_rendered_remotely() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/denni-menu");
                then.status(200).body(fixture("widget"));
            })
            .await;
        let reader = server
            .mock_async(|when, then| {
                // protocol-relative data-src takes the page's scheme
                when.path_contains("/reader/http://www.menicka.cz/api/iframe/");
                then.status(200).body(long_text());
            })
            .await;
        let model = server
            .mock_async(|when, then| {
                when.method(POST).path("/llm").body_contains("Hovězí guláš, houskový knedlík");
                then.status(200)
                    .json_body(json!({ "choices": [{ "message": { "content": MENU_JSON } }] }));
            })
            .await;

        let menu = run(&pipeline(&server), &server.url("/denni-menu")).await.unwrap();
        reader.assert_async().await;
        model.assert_async().await;
        assert_eq!(menu.days[0].soups, vec!["Kulajda".to_string()]);
    }

    #[tokio::test]
    async fn pdf_link_is_rendered_remotely() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body(
                    r#"<html><body><a href="/files/vina.pdf">Vína</a>
                       <a href="/files/poledni-menu.pdf">Polední menu</a></body></html>"#,
                );
            })
            .await;
        let reader = server
            .mock_async(|when, then| {
                when.path_contains("/files/poledni-menu.pdf");
                then.status(200).body(long_text());
            })
            .await;
        let model = model_replying(&server, MENU_JSON).await;

        let menu = run(&pipeline(&server), &server.url("/")).await.unwrap();
        reader.assert_async().await;
        model.assert_async().await;
        assert_eq!(menu.days.len(), 1);
    }

    #[tokio::test]
    async fn plain_page_text_goes_to_model_without_render() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/obed");
                then.status(200).body(format!("<html><body><p>{}</p></body></html>", long_text()));
            })
            .await;
        let reader = server
            .mock_async(|when, then| {
                when.path_contains("/reader/");
                then.status(200).body(long_text());
            })
            .await;
        let model = model_replying(&server, MENU_JSON).await;

        assert!(run(&pipeline(&server), &server.url("/obed")).await.is_some());
        reader.assert_hits_async(0).await;
        model.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn upstream_error_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/obed");
                then.status(200).body(format!("<html><body><p>{}</p></body></html>", long_text()));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/llm");
                then.status(401).json_body(json!({ "error": { "message": "Invalid API Key" } }));
            })
            .await;

        assert_eq!(run(&pipeline(&server), &server.url("/obed")).await, None);
    }

    #[tokio::test]
    async fn identical_responses_give_identical_output() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/menu");
                then.status(200).body(fixture("spreadsheet"));
            })
            .await;
        let p = pipeline(&server);
        let first = serde_json::to_string(&run(&p, &server.url("/menu")).await).unwrap();
        let second = serde_json::to_string(&run(&p, &server.url("/menu")).await).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("Kulajda"));
    }

    #[tokio::test]
    async fn spent_budget_starts_nothing() {
        let server = MockServer::start_async().await;
        let page = server
            .mock_async(|when, then| {
                when.any_request();
                then.status(200).body(fixture("day_tabs"));
            })
            .await;

        let deadline = Deadline::after(Duration::ZERO);
        let menu = pipeline(&server)
            .scrape_within(&server.url("/denni-menu"), today(), &deadline)
            .await;
        assert_eq!(menu, None);
        page.assert_hits_async(0).await;
    }

    #[test]
    fn missing_credential_is_surfaced() {
        let result = Pipeline::new(Settings::default());
        assert!(matches!(result, Err(PipelineError::MissingCredential)));
    }
}
