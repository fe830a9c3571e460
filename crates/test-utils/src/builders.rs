#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sitepipe::config::{ConfigFile, RawConfigFile, WatchBindingConfig};
use sitepipe::engine::RuntimeEvent;
use sitepipe::fs::{FileSystem, RealFileSystem};
use sitepipe::pipeline::TaskId;
use sitepipe::server::{DevServer, ServerSettings};
use sitepipe::tasks::{ProjectPaths, TaskContext};
use sitepipe::types::TriggerWhileRunningBehaviour;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    /// Starts from the built-in configuration.
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn queue(mut self, behaviour: TriggerWhileRunningBehaviour, length: usize) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self.config.config.queue_length = length;
        self
    }

    /// Bind the dev server to an ephemeral port on localhost.
    pub fn ephemeral_port(mut self) -> Self {
        self.config.server.port = 0;
        self
    }

    pub fn without_watch(mut self) -> Self {
        self.config.watch.clear();
        self
    }

    pub fn watch(mut self, patterns: &[&str], tasks: &[TaskId], reload: bool) -> Self {
        self.config.watch.push(WatchBindingConfig {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            exclude: vec![],
            tasks: tasks.to_vec(),
            reload,
        });
        self
    }

    pub fn webp_quality(mut self, quality: u8) -> Self {
        self.config.images.webp_quality = quality;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A throwaway project directory with the default `docs/` + `build/` layout.
pub struct SiteFixture {
    dir: TempDir,
}

impl SiteFixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file below the source directory (`docs/`).
    pub fn source(&self, rel: &str, contents: impl AsRef<[u8]>) -> &Self {
        let path = self.root().join("docs").join(rel);
        RealFileSystem
            .write(&path, contents.as_ref())
            .expect("write fixture file");
        self
    }

    pub fn build_path(&self, rel: &str) -> PathBuf {
        self.root().join("build").join(rel)
    }

    pub fn read_build(&self, rel: &str) -> String {
        std::fs::read_to_string(self.build_path(rel))
            .unwrap_or_else(|e| panic!("reading build/{rel}: {e}"))
    }

    /// Task context over the real filesystem, rooted at this fixture.
    ///
    /// The returned receiver gets the watcher's triggers.
    pub fn context(&self, config: ConfigFile) -> (Arc<TaskContext>, mpsc::Receiver<RuntimeEvent>) {
        let paths = ProjectPaths::resolve(self.root(), &config);
        let server = Arc::new(DevServer::new(ServerSettings::from_config(
            &config,
            paths.build.clone(),
        )));
        let (tx, rx) = mpsc::channel(64);
        let ctx = TaskContext::new(config, paths, Arc::new(RealFileSystem), server, tx);
        (Arc::new(ctx), rx)
    }
}

impl Default for SiteFixture {
    fn default() -> Self {
        Self::new()
    }
}
