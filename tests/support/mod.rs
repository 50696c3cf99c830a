#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use ontology_pipeline::PipelineConfig;
use ontology_pipeline::config::DEFAULT_MODULES;
use tempfile::{TempDir, tempdir};

pub const PREFIXES: &str = r#"@prefix ex: <http://example.org/> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
"#;

/// A throwaway repository laid out like the real one.
pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Write `contents` to `name` under the root, creating directories.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dir");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    /// Write a Turtle file with the shared prefixes prepended.
    pub fn turtle(&self, name: &str, body: &str) -> PathBuf {
        self.write(name, &format!("{PREFIXES}{body}"))
    }

    /// One small, valid file per default core module.
    pub fn with_core_modules(self) -> Self {
        for (i, module) in DEFAULT_MODULES.iter().enumerate() {
            self.turtle(
                &format!("ontology/{module}.ttl"),
                &format!("ex:Module{i} a owl:Class ; rdfs:label \"{module}\" .\n"),
            );
        }
        self
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig::for_root(&self.root)
    }

    pub fn config_with<F>(&self, configure: F) -> PipelineConfig
    where
        F: FnOnce(&mut PipelineConfig),
    {
        let mut config = self.config();
        configure(&mut config);
        config
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).expect("read file")
    }
}
