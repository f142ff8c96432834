fn main() {
    println!("Run `cargo test -p flow` to execute the end-to-end flow tests.");
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use async_trait::async_trait;

    use updrift_catalog::{VersionCatalog, VersionProbe};
    use updrift_depot::{ArtifactLocks, ChunkMerger, ChunkReceiver};
    use updrift_protocol::FilePayload;
    use updrift_protocol::manifest::{FileEntry, ReleaseKind, ReleaseManifest};
    use updrift_transfer::{
        ByteSource, ResumableDownloader, SourceResponse, TransferError, checksum_file,
    };

    /// Serves files straight off a server root, honoring range offsets and
    /// carrying the whole-file checksum, the way the HTTP layer would.
    struct FsSource {
        root: PathBuf,
    }

    #[async_trait]
    impl ByteSource for FsSource {
        async fn open(
            &self,
            file_name: &str,
            offset: u64,
        ) -> Result<SourceResponse, TransferError> {
            let path = self.root.join(file_name);
            let data = tokio::fs::read(&path).await?;
            let checksum = checksum_file(&path)?;
            let start = (offset as usize).min(data.len());
            Ok(SourceResponse {
                declared_total: Some(data.len() as u64),
                range_honored: true,
                checksum: Some(checksum),
                body: Box::new(std::io::Cursor::new(data[start..].to_vec())),
            })
        }
    }

    /// Serves a truncated body that dies mid-stream, to interrupt a
    /// download partway through.
    struct InterruptedSource {
        root: PathBuf,
        serve: usize,
    }

    #[async_trait]
    impl ByteSource for InterruptedSource {
        async fn open(
            &self,
            file_name: &str,
            offset: u64,
        ) -> Result<SourceResponse, TransferError> {
            let data = tokio::fs::read(self.root.join(file_name)).await?;
            let end = self.serve.min(data.len());
            let chunk = bytes::Bytes::copy_from_slice(&data[offset as usize..end]);
            let stream = futures_util::stream::iter(vec![
                Ok(chunk),
                Err(std::io::Error::other("connection reset")),
            ]);
            Ok(SourceResponse {
                declared_total: Some(data.len() as u64),
                range_honored: true,
                checksum: None,
                body: Box::new(tokio_util::io::StreamReader::new(stream)),
            })
        }
    }

    fn release(version: &str, kind: ReleaseKind, files: &[&str], changelog: &str) -> ReleaseManifest {
        let mut manifest = ReleaseManifest::new(version.parse().unwrap(), kind);
        manifest.files = files
            .iter()
            .map(|path| FileEntry {
                name: path.rsplit('/').next().unwrap_or(path).to_string(),
                relative_path: path.to_string(),
                length: 1,
                checksum: String::new(),
            })
            .collect();
        manifest.changelog = changelog.into();
        manifest
    }

    fn server_components(root: &Path) -> (ChunkReceiver, ChunkMerger, VersionCatalog) {
        let locks = Arc::new(ArtifactLocks::new());
        (
            ChunkReceiver::new(root, Arc::clone(&locks)),
            ChunkMerger::new(root, locks),
            VersionCatalog::new(root),
        )
    }

    #[tokio::test]
    async fn chunked_upload_merge_and_release_flow() {
        let server = tempfile::tempdir().unwrap();
        let (receiver, merger, catalog) = server_components(server.path());

        // The client ships one artifact in out-of-order chunks plus a small
        // whole file, then records the release.
        let artifact: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
        let mut uploads: Vec<FilePayload> = artifact
            .chunks(4096)
            .enumerate()
            .map(|(index, piece)| FilePayload::chunk("app.bin", index as u32, piece.to_vec()))
            .collect();
        uploads.reverse();
        uploads.push(FilePayload::whole("readme.txt", b"hello".to_vec()));

        let outcome = receiver.receive_all(&uploads, Some("1.1.0")).await;
        assert!(outcome.is_ok(), "{}", outcome.message);

        let merged = merger.merge("1.1.0/app.bin").await;
        assert!(merged.is_ok(), "{}", merged.message);
        assert_eq!(
            tokio::fs::read(server.path().join("1.1.0/app.bin"))
                .await
                .unwrap(),
            artifact
        );

        let created = catalog.create_version(&release(
            "1.1.0",
            ReleaseKind::Optional,
            &["app.bin", "readme.txt"],
            "initial release",
        ));
        assert!(created.is_ok(), "{}", created.message);
        assert!(catalog.upgradeable("1.0.0"));
        assert!(!catalog.upgradeable("1.1.0"));
    }

    #[tokio::test]
    async fn offering_spans_every_pending_release() {
        let server = tempfile::tempdir().unwrap();
        let (_, _, catalog) = server_components(server.path());

        catalog.create_version(&release("1.1.0", ReleaseKind::Optional, &["a.txt"], "fix A"));
        catalog.create_version(&release("1.2.0", ReleaseKind::Mandatory, &["b.txt"], "fix B"));

        let offering = catalog.check_version("1.0.0").unwrap();
        assert_eq!(offering.version.to_string(), "1.2.0");
        assert_eq!(offering.kind, ReleaseKind::Mandatory);
        assert!(
            offering.changelog.find("fix A").unwrap() < offering.changelog.find("fix B").unwrap()
        );

        // A client already on 1.1.0 only sees the mandatory tail.
        let tail = catalog.check_version("1.1.0").unwrap();
        assert!(!tail.changelog.contains("fix A"));
    }

    /// Each persisted manifest absorbs the previous one's file list. The
    /// behavior is deliberate, if surprising; this test pins it down.
    #[tokio::test]
    async fn manifests_accumulate_prior_file_lists() {
        let server = tempfile::tempdir().unwrap();
        let (_, _, catalog) = server_components(server.path());

        catalog.create_version(&release("1.1.0", ReleaseKind::Optional, &["a.txt"], ""));
        catalog.create_version(&release("1.2.0", ReleaseKind::Optional, &["b.txt"], ""));
        catalog.create_version(&release("1.3.0", ReleaseKind::Optional, &["c.txt"], ""));

        let latest = catalog.check_version("1.0.0").unwrap();
        let mut paths: Vec<&str> = latest
            .files
            .iter()
            .map(|f| f.relative_path.as_str())
            .collect();
        paths.sort_unstable();
        assert_eq!(paths, ["a.txt", "b.txt", "c.txt"]);
    }

    /// A failed merge discards every staged chunk. The full re-upload this
    /// forces is the accepted price of a guaranteed-clean staging area.
    #[tokio::test]
    async fn failed_merge_forces_full_reupload() {
        let server = tempfile::tempdir().unwrap();
        let (receiver, merger, _) = server_components(server.path());

        for index in [0u32, 1, 3] {
            receiver
                .receive(&FilePayload::chunk("app.bin", index, vec![index as u8]), None)
                .await;
        }
        let failed = merger.merge("app.bin").await;
        assert!(!failed.is_ok());
        assert!(!server.path().join("app.bin.staging").exists());

        // Re-uploading only the missing chunk cannot help now.
        receiver
            .receive(&FilePayload::chunk("app.bin", 2, vec![2]), None)
            .await;
        let still_failed = merger.merge("app.bin").await;
        assert!(!still_failed.is_ok(), "staged set restarted from scratch");

        // The full set merges cleanly.
        for index in [0u32, 1, 2, 3] {
            receiver
                .receive(&FilePayload::chunk("app.bin", index, vec![index as u8]), None)
                .await;
        }
        assert!(merger.merge("app.bin").await.is_ok());
        assert_eq!(
            tokio::fs::read(server.path().join("app.bin")).await.unwrap(),
            [0u8, 1, 2, 3]
        );
    }

    #[tokio::test]
    async fn interrupted_download_resumes_to_a_verified_file() {
        let server = tempfile::tempdir().unwrap();
        let client = tempfile::tempdir().unwrap();
        let (receiver, merger, _) = server_components(server.path());

        // Publish an artifact through the upload path.
        let artifact: Vec<u8> = (0..100_000u32).map(|i| (i % 241) as u8).collect();
        for (index, piece) in artifact.chunks(8192).enumerate() {
            receiver
                .receive(
                    &FilePayload::chunk("app.bin", index as u32, piece.to_vec()),
                    None,
                )
                .await;
        }
        assert!(merger.merge("app.bin").await.is_ok());

        let dest = client.path().join("app.bin");

        // First attempt dies mid-stream; the partial file stays behind.
        let flaky = ResumableDownloader::new(Arc::new(InterruptedSource {
            root: server.path().to_path_buf(),
            serve: 30_000,
        }));
        assert!(!flaky.start_or_resume("app.bin", &dest).await);
        let part = client.path().join("app.bin.part");
        assert_eq!(
            tokio::fs::metadata(&part).await.unwrap().len(),
            30_000,
            "flushed bytes survive the failure"
        );

        // Second attempt resumes from the partial and verifies the checksum.
        let steady = ResumableDownloader::new(Arc::new(FsSource {
            root: server.path().to_path_buf(),
        }));
        assert!(steady.start_or_resume("app.bin", &dest).await);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), artifact);
        assert!(!part.exists());
    }

    struct ManifestNameProbe;

    impl VersionProbe for ManifestNameProbe {
        fn product_version(&self, path: &Path) -> Option<String> {
            // Stand-in for a real metadata reader: version from a sidecar.
            std::fs::read_to_string(path.with_extension("version")).ok()
        }
    }

    #[tokio::test]
    async fn file_version_round_trip() {
        let server = tempfile::tempdir().unwrap();
        let (receiver, _, catalog) = server_components(server.path());

        receiver
            .receive(&FilePayload::whole("updater.exe", b"binary".to_vec()), None)
            .await;
        std::fs::write(server.path().join("updater.version"), "2.4.0").unwrap();

        let outcome = catalog.file_version("updater.exe", &ManifestNameProbe);
        assert!(outcome.is_ok());
        assert_eq!(outcome.message, "2.4.0");

        let missing = catalog.file_version("absent.exe", &ManifestNameProbe);
        assert!(!missing.is_ok());
    }
}
