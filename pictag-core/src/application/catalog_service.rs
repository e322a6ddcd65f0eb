use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use crate::database::ports::CatalogRepository;
use crate::domain::{
    CatalogEntry, EntryId, EntrySummary, ImageSource, NewCatalogEntry,
    UploadReceipt, UploadRequest, UploadedFile, is_allowed_extension,
    secure_filename,
};
use crate::error::{CatalogError, Result, ValidationError};
use crate::providers::LabelClient;

/// Catalog use-cases: browse, search, add, inspect and remove images.
#[derive(Clone)]
pub struct CatalogService {
    repository: Arc<dyn CatalogRepository>,
    labels: LabelClient,
    upload_dir: PathBuf,
}

impl fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogService")
            .field("repository", &Arc::strong_count(&self.repository))
            .field("labels", &self.labels)
            .field("upload_dir", &self.upload_dir)
            .finish()
    }
}

/// Validated origin of an upload, before anything touches disk.
enum Origin<'a> {
    Remote { raw: &'a str, url: Url },
    Local { file: &'a UploadedFile, filename: String },
}

impl CatalogService {
    pub fn new(
        repository: Arc<dyn CatalogRepository>,
        labels: LabelClient,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repository,
            labels,
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &PathBuf {
        &self.upload_dir
    }

    pub fn label_client(&self) -> &LabelClient {
        &self.labels
    }

    /// All entries in insertion order, or those whose labels contain
    /// `search` when it is non-blank.
    pub async fn list(&self, search: Option<&str>) -> Result<Vec<EntrySummary>> {
        let filter = search.map(str::trim).filter(|term| !term.is_empty());
        Ok(self.repository.list(filter).await?)
    }

    pub async fn upload(&self, request: UploadRequest) -> Result<UploadReceipt> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName.into());
        }

        let origin = Self::validate_origin(&request)?;

        let (location, source) = match origin {
            Origin::Remote { raw, url } => (raw.to_string(), ImageSource::Remote(url)),
            Origin::Local { file, filename } => {
                if !self.labels.capabilities().supports_local_files {
                    return Err(ValidationError::LocalUploadUnsupported.into());
                }

                let path = self.upload_dir.join(&filename);
                tokio::fs::create_dir_all(&self.upload_dir).await?;
                tokio::fs::write(&path, &file.bytes).await?;

                (path.to_string_lossy().into_owned(), ImageSource::Local(path))
            }
        };

        let labels = self.labels.acquire(&source).await?;

        let entry = NewCatalogEntry {
            name: name.to_string(),
            location: location.clone(),
            labels,
        };
        let outcome = self.repository.insert(&entry).await?;

        match outcome.inserted_id() {
            Some(id) => info!(
                id = %id,
                location = %location,
                labels = %entry.labels,
                "image added to collection"
            ),
            None => warn!(location = %location, "image already in collection, keeping first entry"),
        }

        Ok(UploadReceipt {
            location,
            labels: entry.labels.into_inner(),
            outcome,
        })
    }

    pub async fn detail(&self, id: EntryId) -> Result<CatalogEntry> {
        self.repository
            .get(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    pub async fn delete(&self, id: EntryId) -> Result<()> {
        if !self.repository.delete(id).await? {
            return Err(CatalogError::NotFound(id));
        }
        info!(id = %id, "image removed from collection");
        Ok(())
    }

    fn validate_origin(request: &UploadRequest) -> Result<Origin<'_>> {
        let image_url = request
            .image_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty());

        match (image_url, request.upload.as_ref()) {
            (Some(raw), None) => {
                let url = Url::parse(raw)
                    .ok()
                    .filter(|url| matches!(url.scheme(), "http" | "https"))
                    .ok_or(ValidationError::MissingSource)?;
                if !is_allowed_extension(raw) {
                    return Err(CatalogError::UnsupportedExtension(raw.to_string()));
                }
                Ok(Origin::Remote { raw, url })
            }
            (None, Some(file)) => {
                let filename = secure_filename(&file.filename);
                if filename.is_empty() {
                    return Err(ValidationError::NoImageSelected.into());
                }
                if !is_allowed_extension(&filename) {
                    return Err(CatalogError::UnsupportedExtension(filename));
                }
                Ok(Origin::Local { file, filename })
            }
            _ => Err(ValidationError::MissingSource.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::infrastructure::sqlite::SqliteCatalogRepository;
    use crate::domain::InsertOutcome;
    use crate::providers::{MockLabelProvider, ProviderCapabilities, ProviderError};
    use std::path::Path;

    fn provider(supports_local_files: bool) -> MockLabelProvider {
        let mut provider = MockLabelProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_capabilities()
            .return_const(ProviderCapabilities { supports_local_files });
        provider
    }

    fn answering(labels: &'static [&'static str]) -> MockLabelProvider {
        let mut provider = provider(true);
        provider
            .expect_fetch_labels()
            .returning(move |_| Ok(labels.iter().map(|l| l.to_string()).collect()));
        provider
    }

    async fn service(provider: MockLabelProvider, upload_dir: &Path) -> CatalogService {
        let repo = SqliteCatalogRepository::connect("sqlite::memory:")
            .await
            .unwrap();
        repo.ensure_schema().await.unwrap();
        CatalogService::new(
            Arc::new(repo),
            LabelClient::new(Arc::new(provider)),
            upload_dir,
        )
    }

    fn file(name: &str) -> UploadedFile {
        UploadedFile {
            filename: name.to_string(),
            bytes: b"\x89PNG fake".to_vec(),
        }
    }

    fn validation(err: CatalogError) -> ValidationError {
        match err {
            CatalogError::Validation(v) => v,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn url_upload_stores_joined_labels() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(answering(&["chicken", "food"]), dir.path()).await;

        let receipt = svc
            .upload(UploadRequest::from_url("Dinner", "http://x/y.jpg"))
            .await
            .unwrap();

        assert_eq!(receipt.location, "http://x/y.jpg");
        assert_eq!(receipt.labels, "chicken, food");
        let id = receipt.outcome.inserted_id().unwrap();

        let entry = svc.detail(id).await.unwrap();
        assert_eq!(entry.name, "Dinner");
        assert_eq!(entry.labels, "chicken, food");
        assert_eq!(svc.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_name_is_rejected_first() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(provider(true), dir.path()).await;

        let err = svc
            .upload(UploadRequest::from_url("   ", "http://x/y.gif"))
            .await
            .unwrap_err();
        assert_eq!(validation(err), ValidationError::MissingName);
        assert!(svc.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn neither_or_both_sources_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(provider(true), dir.path()).await;

        let neither = UploadRequest {
            name: "a".into(),
            image_url: Some("  ".into()),
            upload: None,
        };
        let both = UploadRequest {
            name: "a".into(),
            image_url: Some("http://x/y.jpg".into()),
            upload: Some(file("y.jpg")),
        };

        for request in [neither, both] {
            let err = svc.upload(request).await.unwrap_err();
            assert_eq!(validation(err), ValidationError::MissingSource);
        }
    }

    #[tokio::test]
    async fn non_web_urls_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(provider(true), dir.path()).await;

        for url in ["y.jpg", "ftp://x/y.jpg", "file:///tmp/y.jpg"] {
            let err = svc
                .upload(UploadRequest::from_url("a", url))
                .await
                .unwrap_err();
            assert_eq!(validation(err), ValidationError::MissingSource, "{url}");
        }
    }

    #[tokio::test]
    async fn unsupported_extension_never_reaches_the_provider() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(provider(true), dir.path()).await;

        let err = svc
            .upload(UploadRequest::from_url("a", "http://x/y.gif"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedExtension(_)));

        let err = svc
            .upload(UploadRequest::from_file("a", file("notes.txt")))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedExtension(_)));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn no_labels_means_nothing_is_stored() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(answering(&[]), dir.path()).await;

        let err = svc
            .upload(UploadRequest::from_url("a", "http://x/y.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::LabelAcquisition(_)));
        assert!(svc.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_a_label_acquisition_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut mock = provider(true);
        mock.expect_fetch_labels()
            .returning(|_| Err(ProviderError::ApiError("boom".into())));
        let svc = service(mock, dir.path()).await;

        let err = svc
            .upload(UploadRequest::from_url("a", "https://x/y.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::LabelAcquisition(_)));
    }

    #[tokio::test]
    async fn duplicate_location_keeps_first_entry() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(answering(&["cat"]), dir.path()).await;

        let first = svc
            .upload(UploadRequest::from_url("first", "http://x/cat.jpg"))
            .await
            .unwrap();
        let second = svc
            .upload(UploadRequest::from_url("second", "http://x/cat.jpg"))
            .await
            .unwrap();

        assert!(matches!(first.outcome, InsertOutcome::Inserted(_)));
        assert_eq!(second.outcome, InsertOutcome::Duplicate);

        let all = svc.list(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "first");
    }

    #[tokio::test]
    async fn local_upload_is_written_under_a_safe_name() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("static").join("images");
        let expected = upload_dir.join("my_cat.png");

        let mut mock = provider(true);
        let wanted = ImageSource::Local(expected.clone());
        mock.expect_fetch_labels()
            .withf(move |source| *source == wanted)
            .times(1)
            .returning(|_| Ok(vec!["cat".into(), "pet".into()]));
        let svc = service(mock, &upload_dir).await;

        let receipt = svc
            .upload(UploadRequest::from_file("Kitty", file("../my cat.png")))
            .await
            .unwrap();

        assert_eq!(receipt.location, expected.to_string_lossy());
        assert_eq!(receipt.labels, "cat, pet");
        assert_eq!(std::fs::read(&expected).unwrap(), b"\x89PNG fake");
    }

    #[tokio::test]
    async fn local_upload_needs_provider_support() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(provider(false), dir.path()).await;

        let err = svc
            .upload(UploadRequest::from_file("a", file("cat.jpg")))
            .await
            .unwrap_err();
        assert_eq!(validation(err), ValidationError::LocalUploadUnsupported);
        assert!(!dir.path().join("cat.jpg").exists());
    }

    #[tokio::test]
    async fn empty_filename_means_no_image_selected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(provider(true), dir.path()).await;

        for name in ["", "../..", "\u{1f431}"] {
            let err = svc
                .upload(UploadRequest::from_file("a", file(name)))
                .await
                .unwrap_err();
            assert_eq!(validation(err), ValidationError::NoImageSelected);
        }
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_blank_means_all() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(answering(&["chicken", "food", "frying"]), dir.path()).await;
        svc.upload(UploadRequest::from_url("a", "http://x/a.jpg"))
            .await
            .unwrap();

        assert_eq!(svc.list(Some("CHICK")).await.unwrap().len(), 1);
        assert!(svc.list(Some("xyz")).await.unwrap().is_empty());
        assert_eq!(svc.list(Some("   ")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn detail_of_missing_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(provider(true), dir.path()).await;

        let err = svc.detail(EntryId(42)).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(EntryId(42))));
    }

    #[tokio::test]
    async fn delete_removes_once() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(answering(&["cat"]), dir.path()).await;
        let id = svc
            .upload(UploadRequest::from_url("a", "http://x/a.jpg"))
            .await
            .unwrap()
            .outcome
            .inserted_id()
            .unwrap();

        svc.delete(id).await.unwrap();
        assert!(matches!(
            svc.delete(id).await.unwrap_err(),
            CatalogError::NotFound(_)
        ));
        assert!(svc.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn url_location_is_stored_as_submitted() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(answering(&["cat"]), dir.path()).await;

        let receipt = svc
            .upload(UploadRequest::from_url("a", "  HTTP://Example.COM/a b.jpg "))
            .await
            .unwrap();
        assert_eq!(receipt.location, "HTTP://Example.COM/a b.jpg");
        let id = receipt.outcome.inserted_id().unwrap();
        assert_eq!(
            svc.detail(id).await.unwrap().location,
            "HTTP://Example.COM/a b.jpg"
        );

        let other = svc
            .upload(UploadRequest::from_url(
                "b",
                "http://example.com/./x/../a%20b.jpg",
            ))
            .await
            .unwrap();
        assert!(other.outcome.inserted_id().is_some());
        assert_eq!(svc.list(None).await.unwrap().len(), 2);
    }
}
