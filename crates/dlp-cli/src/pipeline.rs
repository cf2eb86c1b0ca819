//! The dog-license pipeline
//!
//! ```text
//! default = sequence(setup, download, check, analyze)
//! download = sequence(download-dogs, download-xwalk)
//! check    = group(check-dogs, check-xwalk)
//! clean    (never part of default)
//! ```
//!
//! Each named target can also be run on its own. Running a single target
//! does not run the targets it follows in `default`.

use crate::analysis::{AnalysisCommand, AnalysisInvoker, ProcessInvoker};
use crate::config::Config;
use crate::stage::{Completion, Outcome, Stage};
use dlp_common::{DlpError, Result};
use dlp_ingest::download::{download, DownloadStatus};
use dlp_ingest::{ContentStore, Fetcher, HttpFetcher, IntegrityChecker, Resource, ResourceSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Named entry points of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Setup,
    Download,
    Check,
    Analyze,
    Clean,
    Default,
}

impl Target {
    pub fn name(&self) -> &'static str {
        match self {
            Target::Setup => "setup",
            Target::Download => "download",
            Target::Check => "check",
            Target::Analyze => "analyze",
            Target::Clean => "clean",
            Target::Default => "default",
        }
    }
}

/// Everything the stages need, shared by all of them
pub struct PipelineContext {
    pub data_dir: PathBuf,
    pub target_dir: PathBuf,
    pub resources: ResourceSet,
    pub store: ContentStore,
    pub fetcher: Arc<dyn Fetcher>,
    pub invoker: Arc<dyn AnalysisInvoker>,
    pub analysis: AnalysisCommand,
    /// Treat a non-zero analysis exit as a stage failure
    pub fail_on_nonzero: bool,
}

impl PipelineContext {
    /// Wire up the real HTTP fetcher and process invoker
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            data_dir: config.paths.data_dir.clone(),
            target_dir: config.paths.target_dir.clone(),
            resources: config.resource_set()?,
            store: ContentStore::new(),
            fetcher: Arc::new(HttpFetcher::new(config.http_options())?),
            invoker: Arc::new(ProcessInvoker),
            analysis: config.analysis_command(),
            fail_on_nonzero: config.analysis.fail_on_nonzero,
        })
    }
}

pub struct Pipeline {
    ctx: Arc<PipelineContext>,
}

impl Pipeline {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub async fn run(&self, target: Target) -> Outcome {
        let stage = self.stage(target);
        info!(stage = target.name(), "Running");
        let outcome = stage.run().await;
        info!(stage = target.name(), outcome = outcome.label(), "Done");
        outcome
    }

    pub async fn run_default(&self) -> Outcome {
        self.run(Target::Default).await
    }

    /// Build the stage graph for `target`
    pub fn stage(&self, target: Target) -> Stage {
        match target {
            Target::Setup => self.setup(),
            Target::Download => self.download(),
            Target::Check => self.check(),
            Target::Analyze => self.analyze(),
            Target::Clean => self.clean(),
            Target::Default => Stage::sequence(
                "default",
                vec![self.setup(), self.download(), self.check(), self.analyze()],
            ),
        }
    }

    fn setup(&self) -> Stage {
        let ctx = Arc::clone(&self.ctx);
        Stage::leaf("setup", move || {
            let ctx = Arc::clone(&ctx);
            async move { setup_dirs(&ctx).await }
        })
    }

    fn download(&self) -> Stage {
        let steps = self
            .ctx
            .resources
            .iter()
            .map(|resource| {
                let ctx = Arc::clone(&self.ctx);
                let resource = resource.clone();
                Stage::leaf(format!("download-{}", resource.key()), move || {
                    let ctx = Arc::clone(&ctx);
                    let resource = resource.clone();
                    async move { download_resource(&ctx, &resource).await }
                })
            })
            .collect();

        Stage::sequence("download", steps)
    }

    fn check(&self) -> Stage {
        let steps = self
            .ctx
            .resources
            .iter()
            .map(|resource| {
                let ctx = Arc::clone(&self.ctx);
                let resource = resource.clone();
                Stage::leaf(format!("check-{}", resource.key()), move || {
                    let ctx = Arc::clone(&ctx);
                    let resource = resource.clone();
                    async move { check_resource(&ctx, &resource).await }
                })
            })
            .collect();

        Stage::group("check", steps)
    }

    fn analyze(&self) -> Stage {
        let ctx = Arc::clone(&self.ctx);
        Stage::leaf("analyze", move || {
            let ctx = Arc::clone(&ctx);
            async move { run_analysis(&ctx).await }
        })
    }

    fn clean(&self) -> Stage {
        let ctx = Arc::clone(&self.ctx);
        Stage::leaf("clean", move || {
            let ctx = Arc::clone(&ctx);
            async move { remove_generated(&ctx).await }
        })
    }
}

async fn setup_dirs(ctx: &PipelineContext) -> Result<Completion> {
    let dirs = [&ctx.data_dir, &ctx.target_dir];
    let present = ctx.store.exists(&ctx.data_dir).await && ctx.store.exists(&ctx.target_dir).await;

    ctx.store.ensure_directories(&dirs).await?;

    if present {
        Ok(Completion::Skipped)
    } else {
        Ok(Completion::Succeeded)
    }
}

async fn download_resource(ctx: &PipelineContext, resource: &Resource) -> Result<Completion> {
    match download(resource, &ctx.store, ctx.fetcher.as_ref()).await? {
        DownloadStatus::AlreadyPresent => Ok(Completion::Skipped),
        DownloadStatus::Fetched { .. } => Ok(Completion::Succeeded),
    }
}

async fn check_resource(ctx: &PipelineContext, resource: &Resource) -> Result<Completion> {
    IntegrityChecker::new(ctx.store)
        .verify(&resource.descriptor)
        .await?;
    Ok(Completion::Succeeded)
}

async fn run_analysis(ctx: &PipelineContext) -> Result<Completion> {
    let report = ctx.invoker.invoke(&ctx.analysis).await?;
    if report.success() {
        return Ok(Completion::Succeeded);
    }

    let status = match report.exit_code {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    };
    error!(command = %ctx.analysis, exit_code = ?report.exit_code, "Analysis ended with {}", status);

    if ctx.fail_on_nonzero {
        Err(DlpError::analysis(format!("'{}' ended with {}", ctx.analysis, status)))
    } else {
        warn!("Continuing; set analysis.fail_on_nonzero to make this fatal");
        Ok(Completion::Succeeded)
    }
}

async fn remove_generated(ctx: &PipelineContext) -> Result<Completion> {
    let dirs = [&ctx.data_dir, &ctx.target_dir];
    for dir in dirs {
        refuse_unsafe_removal(dir)?;
    }

    let mut removed = false;
    for dir in dirs {
        if ctx.store.exists(dir).await {
            ctx.store.remove_tree(dir).await?;
            info!(path = %dir.display(), "Removed");
            removed = true;
        }
    }

    if removed {
        Ok(Completion::Succeeded)
    } else {
        Ok(Completion::Skipped)
    }
}

/// Reject paths naming no directory of their own (such as "", "." or "/")
/// and any path that climbs with ".."
fn refuse_unsafe_removal(path: &Path) -> Result<()> {
    let names_a_directory = path
        .components()
        .any(|c| matches!(c, Component::Normal(_)));
    let climbs = path
        .components()
        .any(|c| matches!(c, Component::ParentDir));

    if names_a_directory && !climbs {
        Ok(())
    } else {
        Err(DlpError::config(format!(
            "refusing to remove '{}'",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisReport;
    use async_trait::async_trait;
    use dlp_common::checksum::compute_checksum;
    use dlp_common::{ChecksumAlgorithm, ResourceDescriptor};
    use dlp_ingest::resources::{dog_licenses, zip_borough_crosswalk, XWALK_LABEL};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const DOGS_BODY: &[u8] = b"AnimalName,Breed,ZipCode\nRex,Beagle,10001\n";
    const XWALK_HTML: &str = "<table><tr><td>10001</td><td>Manhattan</td><td></td>\
                              <td>10002</td><td>Brooklyn</td></tr>\
                              <tr><td>10003</td><td>Queens</td></tr></table>";
    const XWALK_CSV: &[u8] = b"zip,boro\n10001,Manhattan\n10002,Brooklyn\n10003,Queens\n";

    type Journal = Arc<Mutex<Vec<String>>>;

    /// Log sink for asserting on what stages reported
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            let sink = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || sink.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::INFO)
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    struct RecordingFetcher {
        routes: HashMap<String, Vec<u8>>,
        journal: Journal,
    }

    #[async_trait]
    impl Fetcher for RecordingFetcher {
        async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
            self.journal.lock().unwrap().push(format!("start {}", url));
            tokio::task::yield_now().await;
            self.journal.lock().unwrap().push(format!("end {}", url));
            self.routes
                .get(url)
                .cloned()
                .ok_or_else(|| DlpError::network(url, "HTTP 404 Not Found"))
        }
    }

    struct RecordingInvoker {
        exit_code: Option<i32>,
        journal: Journal,
    }

    #[async_trait]
    impl AnalysisInvoker for RecordingInvoker {
        async fn invoke(&self, command: &AnalysisCommand) -> Result<AnalysisReport> {
            self.journal.lock().unwrap().push(format!("analyze {}", command));
            Ok(AnalysisReport {
                exit_code: self.exit_code,
            })
        }
    }

    struct Fixture {
        tmp: TempDir,
        journal: Journal,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tmp: TempDir::new().unwrap(),
                journal: Journal::default(),
            }
        }

        fn data_dir(&self) -> PathBuf {
            self.tmp.path().join("data")
        }

        fn target_dir(&self) -> PathBuf {
            self.tmp.path().join("target")
        }

        fn resources(&self) -> ResourceSet {
            let dogs = ResourceDescriptor {
                source_url: "mock://dogs".to_string(),
                expected_checksum: compute_checksum(DOGS_BODY, ChecksumAlgorithm::Md5),
                ..dog_licenses(self.data_dir())
            };
            let xwalk = ResourceDescriptor {
                source_url: "mock://xwalk".to_string(),
                expected_checksum: compute_checksum(XWALK_CSV, ChecksumAlgorithm::Md5),
                ..zip_borough_crosswalk(self.data_dir())
            };
            ResourceSet::from_descriptors(dogs, xwalk).unwrap()
        }

        fn pipeline(&self, exit_code: Option<i32>, fail_on_nonzero: bool) -> Pipeline {
            Pipeline::new(self.context(exit_code, fail_on_nonzero))
        }

        fn context(&self, exit_code: Option<i32>, fail_on_nonzero: bool) -> PipelineContext {
            let routes = [
                ("mock://dogs".to_string(), DOGS_BODY.to_vec()),
                ("mock://xwalk".to_string(), XWALK_HTML.as_bytes().to_vec()),
            ]
            .into_iter()
            .collect();

            PipelineContext {
                data_dir: self.data_dir(),
                target_dir: self.target_dir(),
                resources: self.resources(),
                store: ContentStore::new(),
                fetcher: Arc::new(RecordingFetcher {
                    routes,
                    journal: Arc::clone(&self.journal),
                }),
                invoker: Arc::new(RecordingInvoker {
                    exit_code,
                    journal: Arc::clone(&self.journal),
                }),
                analysis: AnalysisCommand::default(),
                fail_on_nonzero,
            }
        }

        fn entries(&self) -> Vec<String> {
            self.journal.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_default_graph_shape() {
        let fixture = Fixture::new();
        let stage = fixture.pipeline(Some(0), false).stage(Target::Default);

        let Stage::Sequence { steps, .. } = stage else {
            panic!("default must be a sequence");
        };
        let names: Vec<&str> = steps.iter().map(Stage::name).collect();
        assert_eq!(names, vec!["setup", "download", "check", "analyze"]);
        assert!(matches!(steps[1], Stage::Sequence { .. }));
        assert!(matches!(steps[2], Stage::Group { .. }));
    }

    #[tokio::test]
    async fn test_default_run_end_to_end() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline(Some(0), false);

        let outcome = pipeline.run_default().await;
        assert!(matches!(outcome, Outcome::Succeeded), "{:?}", outcome);

        assert!(fixture.target_dir().is_dir());
        assert_eq!(std::fs::read(fixture.data_dir().join("dogs.csv")).unwrap(), DOGS_BODY);
        assert_eq!(
            std::fs::read(fixture.data_dir().join("zip-boro-xwalk.csv")).unwrap(),
            XWALK_CSV
        );
        assert_eq!(
            fixture.entries().last().map(String::as_str),
            Some("analyze Rscript ./analyze-dog-data.R")
        );
    }

    #[tokio::test]
    async fn test_downloads_are_strictly_ordered() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline(Some(0), false);
        std::fs::create_dir_all(fixture.data_dir()).unwrap();

        assert!(matches!(pipeline.run(Target::Download).await, Outcome::Succeeded));
        assert_eq!(
            fixture.entries(),
            vec!["start mock://dogs", "end mock://dogs", "start mock://xwalk", "end mock://xwalk"]
        );
    }

    #[tokio::test]
    async fn test_rerun_is_skipped() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline(Some(0), false);

        assert!(!pipeline.run(Target::Setup).await.is_failure());
        assert!(!pipeline.run(Target::Download).await.is_failure());
        fixture.journal.lock().unwrap().clear();

        assert!(matches!(pipeline.run(Target::Setup).await, Outcome::Skipped));
        assert!(matches!(pipeline.run(Target::Download).await, Outcome::Skipped));
        assert!(fixture.entries().is_empty());
    }

    #[tokio::test]
    async fn test_check_group_reports_failure_and_finishes_sibling() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline(Some(0), false);
        std::fs::create_dir_all(fixture.data_dir()).unwrap();
        std::fs::write(fixture.data_dir().join("dogs.csv"), b"tampered").unwrap();
        std::fs::write(fixture.data_dir().join("zip-boro-xwalk.csv"), XWALK_CSV).unwrap();

        let logs = CapturedLogs::default();
        let _guard = logs.install();

        let outcome = pipeline.run(Target::Check).await;
        let failures = outcome.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].stage, "check-dogs");
        assert!(matches!(failures[0].error, DlpError::Integrity { .. }));

        let lines = logs.lines();
        assert!(
            lines.iter().any(|l| l.contains(&format!("hash of {} is as expected", XWALK_LABEL))),
            "{:#?}",
            lines
        );
        assert!(lines
            .iter()
            .any(|l| l.contains("check-xwalk") && l.contains("Finished")));
    }

    #[tokio::test]
    async fn test_check_collects_every_failure() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline(Some(0), false);

        let outcome = pipeline.run(Target::Check).await;
        let failed: Vec<&str> = outcome.failures().iter().map(|f| f.stage.as_str()).collect();
        assert_eq!(failed, vec!["check-dogs", "check-xwalk"]);
    }

    #[tokio::test]
    async fn test_setup_failure_stops_everything() {
        let fixture = Fixture::new();
        std::fs::write(fixture.data_dir(), b"a file where a directory belongs").unwrap();
        let pipeline = fixture.pipeline(Some(0), false);

        let outcome = pipeline.run_default().await;
        assert_eq!(outcome.failures().len(), 1);
        assert_eq!(outcome.failures()[0].stage, "setup");
        assert!(fixture.entries().is_empty());
    }

    #[tokio::test]
    async fn test_integrity_failure_prevents_analysis() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline(Some(0), false);
        std::fs::create_dir_all(fixture.data_dir()).unwrap();
        std::fs::write(fixture.data_dir().join("dogs.csv"), b"old snapshot").unwrap();

        let outcome = pipeline.run_default().await;
        assert!(outcome.is_failure());
        assert!(!fixture.entries().iter().any(|e| e.starts_with("analyze")));
    }

    #[tokio::test]
    async fn test_nonzero_analysis_exit_is_lenient_by_default() {
        let fixture = Fixture::new();
        let outcome = fixture.pipeline(Some(2), false).run(Target::Analyze).await;
        assert!(matches!(outcome, Outcome::Succeeded));
    }

    #[tokio::test]
    async fn test_nonzero_analysis_exit_fails_when_strict() {
        let fixture = Fixture::new();
        let outcome = fixture.pipeline(Some(2), true).run(Target::Analyze).await;
        assert_eq!(outcome.failures().len(), 1);
        assert!(matches!(outcome.failures()[0].error, DlpError::Analysis(_)));
    }

    #[tokio::test]
    async fn test_clean_without_directories_succeeds() {
        let fixture = Fixture::new();
        let outcome = fixture.pipeline(Some(0), false).run(Target::Clean).await;
        assert!(matches!(outcome, Outcome::Skipped));
    }

    #[tokio::test]
    async fn test_clean_removes_generated_directories() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline(Some(0), false);
        assert!(!pipeline.run_default().await.is_failure());

        assert!(matches!(pipeline.run(Target::Clean).await, Outcome::Succeeded));
        assert!(!fixture.data_dir().exists());
        assert!(!fixture.target_dir().exists());
        assert!(fixture.tmp.path().exists());
    }

    #[tokio::test]
    async fn test_clean_refuses_parent_relative_dir() {
        let fixture = Fixture::new();
        std::fs::create_dir_all(fixture.data_dir()).unwrap();
        let ctx = PipelineContext {
            data_dir: fixture.data_dir().join(".."),
            ..fixture.context(Some(0), false)
        };

        let outcome = Pipeline::new(ctx).run(Target::Clean).await;
        assert_eq!(outcome.failures().len(), 1);
        assert!(matches!(outcome.failures()[0].error, DlpError::Config(_)));
        assert!(fixture.data_dir().is_dir());
    }

    #[test]
    fn test_refuses_to_remove_roots() {
        for path in ["", ".", "..", "/", "./..", "data/..", "a/../..", "data/../../etc"] {
            assert!(refuse_unsafe_removal(Path::new(path)).is_err(), "{:?}", path);
        }
        assert!(refuse_unsafe_removal(Path::new("data")).is_ok());
        assert!(refuse_unsafe_removal(Path::new("/srv/dlp/target")).is_ok());
    }
}
