//! The bootstrap pipeline.
//!
//! Installer fallback, then locate, then install the graph, then relax
//! visibility, then commit the layer, then finalize properties, then resolve
//! the entry point and delegate. Each phase consumes the arguments it
//! understands so nothing is interpreted twice.

use crate::arguments::ArgumentList;
use crate::capability::CapabilityGrantor;
use crate::config::BootstrapConfig;
use crate::descriptor::locate;
use crate::entry::{self, EntryPoints, ResolvedEntry};
use crate::error::{BootstrapError, LaunchError, Result};
use crate::graph::{self, GraphLayer, PathFinder, RuntimeRoot};
use crate::installer::{InstallOutcome, Installer};
use crate::visibility::{self, Relaxation};
use bootshim_api::{ComponentRef, EntryContext, Platform, Relation};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

const MODULE_PATH_FLAGS: &[&str] = &["-p", "--module-path"];
const CLASS_PATH_FLAGS: &[&str] = &["-cp", "-classpath", "--class-path"];
const ADD_MODULES_FLAG: &str = "--add-modules";
const ADD_OPENS_FLAG: &str = "--add-opens";
const ADD_EXPORTS_FLAG: &str = "--add-exports";

pub const MODULE_PATH_PROPERTY: &str = "jdk.module.path";
pub const CLASS_PATH_PROPERTY: &str = "java.class.path";

/// Everything decided before control is handed over.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchPlan {
    pub platform: Platform,
    pub script: PathBuf,
    pub install: InstallOutcome,
    pub installed_version: Option<String>,
    pub argument_files: Vec<PathBuf>,
    pub module_path: Vec<PathBuf>,
    /// Components of the activated layer.
    pub components: Vec<ComponentRef>,
    pub relaxations: Vec<Relaxation>,
    pub properties: IndexMap<String, String>,
    pub entry_point: String,
    pub entry_component: String,
    pub arguments: Vec<String>,
}

/// A plan together with the entry point it delegates to.
#[derive(Debug)]
pub struct PreparedLaunch {
    pub plan: LaunchPlan,
    entry: ResolvedEntry,
    working_dir: PathBuf,
}

impl PreparedLaunch {
    pub fn entry(&self) -> &ResolvedEntry {
        &self.entry
    }

    pub fn context(&self) -> EntryContext {
        EntryContext {
            args: self.plan.arguments.clone(),
            properties: self.plan.properties.clone(),
            working_dir: self.working_dir.clone(),
        }
    }
}

pub struct Bootstrap {
    config: BootstrapConfig,
    entries: EntryPoints,
    grantor: &'static CapabilityGrantor,
    root: RuntimeRoot,
}

impl Bootstrap {
    pub fn new(config: BootstrapConfig, entries: EntryPoints) -> Self {
        Self {
            config,
            entries,
            grantor: CapabilityGrantor::attach(),
            root: RuntimeRoot::new(GraphLayer::boot()),
        }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    pub fn entries_mut(&mut self) -> &mut EntryPoints {
        &mut self.entries
    }

    /// Handle on the active root; changes only when a launch is prepared.
    pub fn root(&self) -> &RuntimeRoot {
        &self.root
    }

    /// Runs every phase up to, but not including, delegation.
    ///
    /// `passthrough` are the caller's own arguments, appended after the ones
    /// from the launch script.
    pub fn prepare(&mut self, passthrough: Vec<String>) -> Result<PreparedLaunch> {
        let platform = self.config.platform();
        let base_dir = self.config.base_dir.clone();

        let install = Installer::new(&base_dir, platform, &self.entries, self.grantor)
            .with_template(self.config.download_template.as_str())
            .with_flag(self.config.installer_flag.as_str())
            .ensure_launch_artifacts(self.config.installer.as_deref(), self.config.reconcile)?;
        debug!("Launch artifacts: {:?}", install);

        let script = self.config.script_path();
        let descriptor = locate(&script, platform)?;
        let mut args = ArgumentList::from(descriptor.arguments.clone());

        let module_path = args
            .take_value_any(MODULE_PATH_FLAGS)
            .ok_or_else(|| BootstrapError::MissingModulePath {
                script: script.clone(),
            })?;
        let finder = PathFinder::from_path_list(&module_path, platform, &base_dir);
        let staged = graph::install(&self.root, &finder)?;

        let opens = visibility::parse_requests(&args.take_values(ADD_OPENS_FLAG), Relation::Open)?;
        let exports =
            visibility::parse_requests(&args.take_values(ADD_EXPORTS_FLAG), Relation::Export)?;
        visibility::relax(staged.layer(), &opens, self.grantor)?;
        visibility::relax(staged.layer(), &exports, self.grantor)?;

        let layer = self.root.commit(staged, self.grantor)?;

        let mut properties = args.take_properties();
        if let Some(class_path) = args.take_value_any(CLASS_PATH_FLAGS) {
            properties.insert(CLASS_PATH_PROPERTY.to_string(), class_path);
        }
        properties.insert(MODULE_PATH_PROPERTY.to_string(), module_path);
        // the launch script asks for ALL-MODULE-PATH, which the layer already is
        args.take_value(ADD_MODULES_FLAG);

        let entry_point = args
            .take_first()
            .ok_or_else(|| BootstrapError::MissingEntryPoint {
                script: script.clone(),
            })?;
        let resolved = entry::resolve(&self.entries, &entry_point, &layer, self.grantor)?;
        args.extend(passthrough);

        let plan = LaunchPlan {
            platform,
            installed_version: descriptor.installed_version(platform),
            script,
            install,
            argument_files: descriptor.argument_files,
            module_path: finder.locations().to_vec(),
            components: layer.components().cloned().collect(),
            relaxations: layer.relaxations().iter().cloned().collect(),
            properties,
            entry_point,
            entry_component: resolved.component.clone(),
            arguments: args.into_vec(),
        };
        info!(
            "Prepared launch of {} with {} components",
            plan.entry_point,
            plan.components.len()
        );

        Ok(PreparedLaunch {
            plan,
            entry: resolved,
            working_dir: base_dir,
        })
    }

    /// Prepares the launch and hands control to the entry point.
    pub fn run(&mut self, passthrough: Vec<String>) -> std::result::Result<(), LaunchError> {
        let prepared = self.prepare(passthrough)?;
        entry::delegate(prepared.entry(), prepared.context()).map_err(LaunchError::Target)
    }
}
