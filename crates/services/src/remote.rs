use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use exam_core::model::{QuestionBank, QuestionRecord};
use storage::repository::{
    ExamListing, ImageRepository, ImageResolver, QuestionBankSource, StorageError, StoredImage,
    normalize_exam_filename,
};

use crate::error::RemoteError;
use crate::library_service::ExamLibraryService;

const DEFAULT_API_URL: &str = "https://api.github.com/repos";
const DEFAULT_OWNER: &str = "piccintann";
const DEFAULT_REPO: &str = "exam-sprinter";
const DEFAULT_BRANCH: &str = "master";
const DEFAULT_EXAMS_DIR: &str = "data/dumps";
const DEFAULT_IMAGES_DIR: &str = "md/images";

const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";
const USER_AGENT_HEADER: &str = "exam-practice";

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];

/// Location of the remote exam repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteConfig {
    pub api_url: String,
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub exams_dir: String,
    pub images_dir: String,
}

impl RemoteConfig {
    /// Read the `EXAM_GITHUB_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NotConfigured` when no token is set.
    pub fn from_env() -> Result<Self, RemoteError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup; blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NotConfigured` when no token is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RemoteError> {
        let var = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };
        let token = var("EXAM_GITHUB_TOKEN", "");
        if token.is_empty() {
            return Err(RemoteError::NotConfigured("EXAM_GITHUB_TOKEN"));
        }
        Ok(Self {
            api_url: var("EXAM_GITHUB_API_URL", DEFAULT_API_URL),
            token,
            owner: var("EXAM_GITHUB_OWNER", DEFAULT_OWNER),
            repo: var("EXAM_GITHUB_REPO", DEFAULT_REPO),
            branch: var("EXAM_GITHUB_BRANCH", DEFAULT_BRANCH),
            exams_dir: var("EXAM_GITHUB_EXAMS_DIR", DEFAULT_EXAMS_DIR),
            images_dir: var("EXAM_GITHUB_IMAGES_DIR", DEFAULT_IMAGES_DIR),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}/contents/{}",
            self.api_url.trim_end_matches('/'),
            self.owner,
            self.repo,
            path.trim_start_matches('/')
        )
    }

    fn repo_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.api_url.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }
}

/// Summary returned by the connection check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoInfo {
    pub full_name: String,
    pub private: bool,
    #[serde(default)]
    pub size: u64,
}

/// A file listed in a remote folder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
}

impl RemoteEntry {
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

#[derive(Debug, Deserialize)]
struct RemoteFile {
    content: Option<String>,
}

/// Read-only client for exam banks and images kept in a remote repository.
///
/// Downloaded images are cached through the image repository.
#[derive(Clone)]
pub struct RemoteBankSource {
    client: Client,
    config: RemoteConfig,
    cache: Arc<dyn ImageRepository>,
}

impl RemoteBankSource {
    #[must_use]
    pub fn new(config: RemoteConfig, cache: Arc<dyn ImageRepository>) -> Self {
        Self {
            client: Client::new(),
            config,
            cache,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Verify the token and repository.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::HttpStatus` for a non-success response or
    /// `RemoteError::Http` if the request fails.
    pub async fn check(&self) -> Result<RepoInfo, RemoteError> {
        let response = self.get(self.config.repo_url()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::HttpStatus {
                path: self.config.repo.clone(),
                status,
            });
        }
        let info: RepoInfo = response.json().await?;
        log::info!("connected to {} (private: {})", info.full_name, info.private);
        Ok(info)
    }

    /// Exam files in the exams folder. A missing folder yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the request fails.
    pub async fn list_exams(&self) -> Result<Vec<RemoteEntry>, RemoteError> {
        let entries = self.list_dir(&self.config.exams_dir).await?;
        Ok(entries.into_iter().filter(is_exam_file).collect())
    }

    /// Download and validate one exam file.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NotAnArray` for content that is not a JSON array,
    /// `RemoteError::Bank` for invalid records, or request and decoding failures.
    pub async fn fetch_bank(&self, filename: &str) -> Result<QuestionBank, RemoteError> {
        let filename = normalize_exam_filename(filename);
        let path = format!("{}/{filename}", self.config.exams_dir.trim_end_matches('/'));
        let bytes = self.fetch_file(&path).await?;
        let bank = parse_bank(&String::from_utf8(bytes)?)?;
        log::info!("loaded {} questions from remote {filename}", bank.len());
        Ok(bank)
    }

    /// Download an exam file and store it in the local library.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the download fails or `RemoteError::Library` if
    /// the import fails.
    pub async fn import(
        &self,
        filename: &str,
        library: &ExamLibraryService,
    ) -> Result<ExamListing, RemoteError> {
        let bank = self.fetch_bank(filename).await?;
        Ok(library.import_bank(filename, &bank).await?)
    }

    /// Image files kept for `exam_name`. A missing folder yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the request fails.
    pub async fn list_images(&self, exam_name: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let dir = self.images_dir(exam_name);
        let entries = self.list_dir(&dir).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.is_file() && is_image_name(&entry.name))
            .collect())
    }

    /// Data URL of an image, served from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the download or the cache write fails.
    pub async fn load_image_data_url(
        &self,
        exam_name: &str,
        image_name: &str,
    ) -> Result<String, RemoteError> {
        match self.cache.get_image(exam_name, image_name).await {
            Ok(image) => return Ok(image.data_url()),
            Err(StorageError::NotFound) => {}
            Err(e) => log::warn!("image cache lookup failed for {image_name}: {e}"),
        }
        let path = format!("{}/{image_name}", self.images_dir(exam_name));
        let image = StoredImage::new(image_name, self.fetch_file(&path).await?);
        self.cache.save_image(exam_name, image_name, &image).await?;
        log::debug!("cached remote image {image_name} for {exam_name}");
        Ok(image.data_url())
    }

    fn images_dir(&self, exam_name: &str) -> String {
        format!("{}/{exam_name}", self.config.images_dir.trim_end_matches('/'))
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(AUTHORIZATION, format!("token {}", self.config.token))
            .header(ACCEPT, ACCEPT_HEADER)
            .header(USER_AGENT, USER_AGENT_HEADER)
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let response = self
            .get(self.config.contents_url(path))
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            log::debug!("remote folder {path} does not exist");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(RemoteError::HttpStatus {
                path: path.to_owned(),
                status,
            });
        }
        let body: serde_json::Value = response.json().await?;
        parse_listing(body)
    }

    async fn fetch_file(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let response = self
            .get(self.config.contents_url(path))
            .query(&[("ref", self.config.branch.as_str())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::HttpStatus {
                path: path.to_owned(),
                status,
            });
        }
        let file: RemoteFile = response.json().await?;
        let content = file
            .content
            .ok_or_else(|| RemoteError::MissingContent(path.to_owned()))?;
        decode_content(&content)
    }
}

#[async_trait]
impl QuestionBankSource for RemoteBankSource {
    async fn load_bank(&self, filename: &str) -> Result<QuestionBank, StorageError> {
        self.fetch_bank(filename).await.map_err(storage_error)
    }
}

#[async_trait]
impl ImageResolver for RemoteBankSource {
    async fn resolve_image(
        &self,
        exam_name: &str,
        image_name: &str,
    ) -> Result<Option<String>, StorageError> {
        match self.load_image_data_url(exam_name, image_name).await {
            Ok(url) => Ok(Some(url)),
            Err(RemoteError::HttpStatus {
                status: StatusCode::NOT_FOUND,
                ..
            }) => Ok(None),
            Err(e) => Err(storage_error(e)),
        }
    }
}

fn storage_error(err: RemoteError) -> StorageError {
    match err {
        RemoteError::HttpStatus {
            status: StatusCode::NOT_FOUND,
            ..
        } => StorageError::NotFound,
        RemoteError::Http(e) => StorageError::Connection(e.to_string()),
        RemoteError::Storage(e) => e,
        other => StorageError::Serialization(other.to_string()),
    }
}

fn is_exam_file(entry: &RemoteEntry) -> bool {
    entry.is_file() && entry.name.ends_with(".json")
}

fn is_image_name(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(_, ext)| {
        IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

/// Folder listings that are not arrays (a file path, say) count as empty.
fn parse_listing(body: serde_json::Value) -> Result<Vec<RemoteEntry>, RemoteError> {
    if !body.is_array() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(body)?)
}

/// Decode base64 file content; the API wraps it across lines.
fn decode_content(content: &str) -> Result<Vec<u8>, RemoteError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

fn parse_bank(raw: &str) -> Result<QuestionBank, RemoteError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if !value.is_array() {
        return Err(RemoteError::NotAnArray);
    }
    let questions: Vec<QuestionRecord> = serde_json::from_value(value)?;
    Ok(QuestionBank::new(questions)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry(name: &str, kind: &str) -> RemoteEntry {
        RemoteEntry {
            name: name.into(),
            path: String::new(),
            kind: kind.into(),
            size: 0,
        }
    }

    #[test]
    fn config_requires_token_and_fills_defaults() {
        let err = RemoteConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, RemoteError::NotConfigured("EXAM_GITHUB_TOKEN")));

        let vars = HashMap::from([
            ("EXAM_GITHUB_TOKEN", "abc"),
            ("EXAM_GITHUB_OWNER", "someone"),
            ("EXAM_GITHUB_BRANCH", "  "),
        ]);
        let config =
            RemoteConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned())).unwrap();
        assert_eq!(config.token, "abc");
        assert_eq!(config.owner, "someone");
        assert_eq!(config.branch, "master");
        assert_eq!(
            config.contents_url("data/dumps"),
            "https://api.github.com/repos/someone/exam-sprinter/contents/data/dumps"
        );
    }

    #[test]
    fn exam_listing_keeps_json_files_only() {
        let body = serde_json::json!([
            {"name": "az-900.json", "type": "file"},
            {"name": "README.md", "type": "file"},
            {"name": "old.json", "type": "dir"}
        ]);
        let exams: Vec<_> = parse_listing(body)
            .unwrap()
            .into_iter()
            .filter(is_exam_file)
            .collect();
        assert_eq!(exams, vec![entry("az-900.json", "file")]);

        let not_a_folder = serde_json::json!({"name": "az-900.json", "type": "file"});
        assert!(parse_listing(not_a_folder).unwrap().is_empty());
    }

    #[test]
    fn image_names_match_known_extensions() {
        assert!(is_image_name("diagram.PNG"));
        assert!(is_image_name("photo.jpeg"));
        assert!(is_image_name("icon.svg"));
        assert!(!is_image_name("notes.txt"));
        assert!(!is_image_name("png"));
    }

    #[test]
    fn content_decodes_across_line_breaks() {
        assert_eq!(decode_content("aGVs\nbG8=\n").unwrap(), b"hello");
        assert!(matches!(
            decode_content("not base64!"),
            Err(RemoteError::Decode(_))
        ));
    }

    #[test]
    fn bank_content_must_be_an_array() {
        assert!(matches!(
            parse_bank(r#"{"question": "x"}"#),
            Err(RemoteError::NotAnArray)
        ));
        let bank = parse_bank(
            r#"[{"question": "q", "answers": ["a", "b"], "answer_labels": ["A", "B"],
                 "answer_checks": [false, true]}]"#,
        )
        .unwrap();
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn missing_remote_file_maps_to_not_found() {
        let err = storage_error(RemoteError::HttpStatus {
            path: "x".into(),
            status: StatusCode::NOT_FOUND,
        });
        assert!(matches!(err, StorageError::NotFound));
        assert!(matches!(
            storage_error(RemoteError::NotAnArray),
            StorageError::Serialization(_)
        ));
    }
}
