//! Skip-if-present acquisition of a single resource
//!
//! If the destination already exists nothing is fetched and the file is left
//! untouched, which makes re-running a download a no-op. Otherwise the
//! resource is fetched, transformed when it is an extracted resource, and
//! written through the [`ContentStore`] only after every step succeeded.

use crate::fetch::Fetcher;
use crate::progress::DownloadProgress;
use crate::resources::{Acquisition, Resource};
use crate::store::ContentStore;
use dlp_common::Result;
use tracing::info;

/// What a download did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    /// Destination existed; no network access happened
    AlreadyPresent,
    /// Fetched and stored this many bytes
    Fetched { bytes: usize },
}

/// Acquire `resource` unless its artifact is already stored
pub async fn download(
    resource: &Resource,
    store: &ContentStore,
    fetcher: &dyn Fetcher,
) -> Result<DownloadStatus> {
    let descriptor = &resource.descriptor;

    if store.exists(&descriptor.local_path).await {
        info!(resource = %descriptor.key, "already have {}", descriptor.label);
        return Ok(DownloadStatus::AlreadyPresent);
    }

    let progress = DownloadProgress::start(&descriptor.label);

    let body = match acquire(resource, fetcher).await {
        Ok(body) => body,
        Err(e) => {
            progress.fail(&e);
            return Err(e);
        },
    };

    if let Err(e) = store.write(&descriptor.local_path, &body).await {
        progress.fail(&e);
        return Err(e);
    }

    progress.succeed(body.len());
    Ok(DownloadStatus::Fetched { bytes: body.len() })
}

async fn acquire(resource: &Resource, fetcher: &dyn Fetcher) -> Result<Vec<u8>> {
    let url = &resource.descriptor.source_url;

    match &resource.acquisition {
        Acquisition::Raw => fetcher.fetch_bytes(url).await,
        Acquisition::Extracted(extractor) => {
            let document = fetcher.fetch_document(url).await?;
            let table = extractor.extract(&document)?;
            info!(
                resource = %resource.descriptor.key,
                extractor = extractor.name(),
                rows = table.len(),
                "Extracted table"
            );
            table.to_csv()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{HttpFetcher, HttpOptions};
    use crate::resources::{dog_licenses, zip_borough_crosswalk};
    use crate::ZipBoroughExtractor;
    use dlp_common::{DlpError, ResourceDescriptor};
    use std::sync::Arc;
    use tempfile::TempDir;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn pointed_at(server: &MockServer, descriptor: ResourceDescriptor, route: &str) -> ResourceDescriptor {
        ResourceDescriptor {
            source_url: format!("{}{}", server.uri(), route),
            ..descriptor
        }
    }

    #[tokio::test]
    async fn test_existing_artifact_is_not_refetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
            .expect(0)
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let resource = Resource::raw(pointed_at(&server, dog_licenses(tmp.path()), "/rows.csv"));
        std::fs::write(&resource.descriptor.local_path, b"stale but present").unwrap();

        let fetcher = HttpFetcher::new(HttpOptions::default()).unwrap();
        let status = download(&resource, &ContentStore::new(), &fetcher).await.unwrap();

        assert_eq!(status, DownloadStatus::AlreadyPresent);
        assert_eq!(
            std::fs::read(&resource.descriptor.local_path).unwrap(),
            b"stale but present"
        );
    }

    #[tokio::test]
    async fn test_raw_download_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rows.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("dog_name,breed\nRex,Beagle\n"))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let resource = Resource::raw(pointed_at(&server, dog_licenses(tmp.path()), "/rows.csv"));

        let fetcher = HttpFetcher::new(HttpOptions::default()).unwrap();
        let status = download(&resource, &ContentStore::new(), &fetcher).await.unwrap();

        assert_eq!(status, DownloadStatus::Fetched { bytes: 26 });
        assert_eq!(
            std::fs::read_to_string(&resource.descriptor.local_path).unwrap(),
            "dog_name,breed\nRex,Beagle\n"
        );
    }

    #[tokio::test]
    async fn test_extracted_download_writes_table() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/zips.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<table><tr><td>10001</td><td>Manhattan</td><td></td>\
                 <td>10002</td><td>Brooklyn</td></tr>\
                 <tr><td>10003</td><td>Queens</td></tr></table>",
            ))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let resource = Resource::extracted(
            pointed_at(&server, zip_borough_crosswalk(tmp.path()), "/zips.php"),
            Arc::new(ZipBoroughExtractor::new()),
        );

        let fetcher = HttpFetcher::new(HttpOptions::default()).unwrap();
        download(&resource, &ContentStore::new(), &fetcher).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&resource.descriptor.local_path).unwrap(),
            "zip,boro\n10001,Manhattan\n10002,Brooklyn\n10003,Queens\n"
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_nothing_behind() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let tmp = TempDir::new().unwrap();
        let resource = Resource::extracted(
            pointed_at(&server, zip_borough_crosswalk(tmp.path()), "/zips.php"),
            Arc::new(ZipBoroughExtractor::new()),
        );

        let fetcher = HttpFetcher::new(HttpOptions::default()).unwrap();
        let result = download(&resource, &ContentStore::new(), &fetcher).await;

        assert!(matches!(result, Err(DlpError::Network { .. })));
        assert!(!resource.descriptor.local_path.exists());
    }
}
